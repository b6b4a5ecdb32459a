use crate::types::{AgeGroup, CustomerId, Gender};
use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// One roster row. Columns the generator does not read are kept verbatim
/// in `extra` and written back out with every purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RosterRow")]
pub struct Customer {
    #[serde(rename = "Customer ID")]
    pub id: CustomerId,
    /// Parsed gender. None when the roster value is blank or unrecognized.
    #[serde(skip)]
    pub gender: Option<Gender>,
    /// Gender exactly as the roster wrote it.
    #[serde(rename = "Gender")]
    pub gender_label: Option<String>,
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Subscription Status", serialize_with = "flag_as_int")]
    pub subscribed: bool,
    #[serde(rename = "Previous Purchases")]
    pub previous_purchases: u32,
    #[serde(rename = "Frequency of Purchases")]
    pub frequency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape of a roster row.
#[derive(Deserialize)]
struct RosterRow {
    #[serde(rename = "Customer ID")]
    id: CustomerId,
    #[serde(rename = "Gender", default)]
    gender: Option<String>,
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Subscription Status", deserialize_with = "flag")]
    subscribed: bool,
    #[serde(rename = "Previous Purchases")]
    previous_purchases: u32,
    #[serde(rename = "Frequency of Purchases", default)]
    frequency: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RosterRow> for Customer {
    fn from(row: RosterRow) -> Self {
        Self {
            id: row.id,
            gender: parse_gender(row.gender.as_deref()),
            gender_label: row.gender,
            age: row.age,
            subscribed: row.subscribed,
            previous_purchases: row.previous_purchases,
            frequency: row.frequency,
            extra: row.extra,
        }
    }
}

impl Customer {
    pub fn new(id: CustomerId, gender: Option<Gender>, age: u32, subscribed: bool, previous_purchases: u32) -> Self {
        Self {
            id,
            gender,
            gender_label: gender.map(|g| g.name().to_string()),
            age,
            subscribed,
            previous_purchases,
            frequency: None,
            extra: Map::new(),
        }
    }

    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::from_age(self.age)
    }
}

/// Unknown or blank gender values read as "not known".
fn parse_gender(raw: Option<&str>) -> Option<Gender> {
    match raw.map(str::trim) {
        Some("Male") => Some(Gender::Male),
        Some("Female") => Some(Gender::Female),
        _ => None,
    }
}

/// Accepts 0/1, true/false, and "Yes"/"No".
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(de::Error::invalid_value(Unexpected::Other("number"), &"0 or 1")),
        },
        Value::String(s) => match s.trim() {
            "Yes" | "yes" | "1" | "true" => Ok(true),
            "No" | "no" | "0" | "false" => Ok(false),
            other => Err(de::Error::invalid_value(Unexpected::Str(other), &"Yes or No")),
        },
        _ => Err(de::Error::custom("expected a 0/1 flag")),
    }
}

pub(crate) fn flag_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}
