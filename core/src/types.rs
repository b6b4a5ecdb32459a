//! Shared primitive types used across the entire synthesizer.

use serde::{Deserialize, Serialize};

/// Roster identifier of a customer.
pub type CustomerId = u64;

/// First and last calendar year a purchase may be dated in.
pub const FIRST_YEAR: i32 = 2022;
pub const LAST_YEAR: i32 = 2024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall   => "Fall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

/// Demographic age bucket. Ages outside 18–70 fall into the youngest bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "18-26")]
    Age18To26,
    #[serde(rename = "27-35")]
    Age27To35,
    #[serde(rename = "36-44")]
    Age36To44,
    #[serde(rename = "45-53")]
    Age45To53,
    #[serde(rename = "54-62")]
    Age54To62,
    #[serde(rename = "63-70")]
    Age63To70,
}

impl AgeGroup {
    pub fn from_age(age: u32) -> Self {
        match age {
            27..=35 => Self::Age27To35,
            36..=44 => Self::Age36To44,
            45..=53 => Self::Age45To53,
            54..=62 => Self::Age54To62,
            63..=70 => Self::Age63To70,
            _       => Self::Age18To26,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Age18To26 => "18-26",
            Self::Age27To35 => "27-35",
            Self::Age36To44 => "36-44",
            Self::Age45To53 => "45-53",
            Self::Age54To62 => "54-62",
            Self::Age63To70 => "63-70",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Climate {
    Cold,
    Temperate,
    Hot,
    Tropical,
    Varied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Size {
    S,
    M,
    L,
    XL,
}

impl Size {
    pub const ALL: [Size; 4] = [Size::S, Size::M, Size::L, Size::XL];
}
