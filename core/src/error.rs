use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No candidates to sample for {what}")]
    EmptyCandidates { what: String },

    #[error("Month {month} is not mapped to any season")]
    UnmappedMonth { month: u32 },

    #[error("Category '{name}' not found in catalog")]
    UnknownCategory { name: String },

    #[error("Invalid calendar date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl SynthError {
    pub fn empty(what: impl Into<String>) -> Self {
        Self::EmptyCandidates { what: what.into() }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }
}

pub type SynthResult<T> = Result<T, SynthError>;
