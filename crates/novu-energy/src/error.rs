//! Error types for consumption resolution

use thiserror::Error;

use crate::TimeZoneError;

/// Result type for resolution operations
pub type EnergyResult<T> = Result<T, EnergyError>;

/// Errors that abort the resolution of one entity
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnergyError {
    /// The entity has no current state
    #[error("entity '{0}' not found")]
    EntityNotFound(String),

    /// Neither end of the period has a usable sample within the lookback window
    #[error("no historical data for '{entity_id}' in the requested period")]
    NoHistory { entity_id: String },
}

/// Errors in period selection; these abort the whole request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PeriodError {
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("invalid month {month}: expected 1-12")]
    InvalidMonth { month: u32 },

    #[error("year {year} is out of range")]
    InvalidYear { year: i32 },

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("{field} is required when {other} is given")]
    MissingField {
        field: &'static str,
        other: &'static str,
    },

    #[error(transparent)]
    TimeZone(#[from] TimeZoneError),
}
