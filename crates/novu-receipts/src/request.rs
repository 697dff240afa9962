//! Service payloads

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use novu_core::EntityTarget;
use novu_energy::{Period, PeriodError};
use serde::Deserialize;

/// Payload of `generate_pdf`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateRequest {
    /// One meter or a list of meters
    #[serde(alias = "total_energy_entity_id")]
    pub entity_id: EntityTarget,

    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,

    /// Inclusive `YYYY-MM-DD` range, an alternative to month and year
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,

    #[serde(default)]
    pub fixed_charge: Option<f64>,
    #[serde(default)]
    pub rate: Option<f64>,
}

impl GenerateRequest {
    /// The billing period requested
    ///
    /// An explicit date range wins over month and year; with neither, the
    /// current month in `tz` is used. Each pair must be given complete.
    pub fn period(&self, tz: Tz, now: DateTime<Utc>) -> Result<Period, PeriodError> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => return Period::from_dates(start, end, tz),
            (Some(_), None) => {
                return Err(PeriodError::MissingField {
                    field: "end_date",
                    other: "start_date",
                })
            }
            (None, Some(_)) => {
                return Err(PeriodError::MissingField {
                    field: "start_date",
                    other: "end_date",
                })
            }
            (None, None) => {}
        }

        match (self.month, self.year) {
            (Some(month), Some(year)) => Period::month(year, month, tz),
            (Some(_), None) => Err(PeriodError::MissingField {
                field: "year",
                other: "month",
            }),
            (None, Some(_)) => Err(PeriodError::MissingField {
                field: "month",
                other: "year",
            }),
            (None, None) => Period::current_month(now, tz),
        }
    }

    /// Requested entity ids, trimmed, without empties and duplicates, in order
    pub fn entity_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for id in self.entity_id.clone().into_vec() {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Reject tariff overrides that are not finite non-negative numbers
    pub fn validate_tariff(&self) -> Result<(), String> {
        for (name, value) in [("fixed_charge", self.fixed_charge), ("rate", self.rate)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!("{name} must be a non-negative number, got {v}"));
                }
            }
        }
        Ok(())
    }
}

/// Payload of `delete_pdf`
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRequest {
    pub filename: String,
}
