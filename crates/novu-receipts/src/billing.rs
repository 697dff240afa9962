//! Tariffs and the receipt handed to renderers

use chrono::{DateTime, FixedOffset};
use novu_energy::{DeltaResult, Period};
use serde::{Deserialize, Serialize};

/// Price of consumption: a flat charge plus a per-unit rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub fixed_charge: f64,
    pub rate: f64,
}

impl Tariff {
    /// Replace the configured values with those given in a request
    pub fn with_overrides(self, fixed_charge: Option<f64>, rate: Option<f64>) -> Self {
        Self {
            fixed_charge: fixed_charge.unwrap_or(self.fixed_charge),
            rate: rate.unwrap_or(self.rate),
        }
    }

    /// `fixed_charge + used * rate`
    pub fn cost(&self, used: f64) -> f64 {
        self.fixed_charge + used * self.rate
    }
}

/// Everything printed on one receipt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub report_id: String,
    /// Generation time in the hub's time zone
    pub generated_at: DateTime<FixedOffset>,
    pub period: Period,
    pub site_name: String,
    pub entity_id: String,
    pub entity_label: String,
    pub unit: String,
    pub currency: String,
    /// Meter reading at the start of the period
    pub start_value: f64,
    /// Meter reading at the end of the period
    pub total_value: f64,
    pub used_value: f64,
    pub fixed_charge: f64,
    pub rate: f64,
    pub total_cost: f64,
}

/// Fields of a receipt that do not depend on the meter
#[derive(Debug, Clone)]
pub struct ReceiptHeader {
    pub generated_at: DateTime<FixedOffset>,
    pub period: Period,
    pub site_name: String,
    pub currency: String,
    pub tariff: Tariff,
}

impl Receipt {
    pub fn build(
        header: &ReceiptHeader,
        entity_id: impl Into<String>,
        entity_label: impl Into<String>,
        unit: impl Into<String>,
        delta: &DeltaResult,
    ) -> Self {
        Self {
            report_id: new_report_id(&header.period),
            generated_at: header.generated_at,
            period: header.period,
            site_name: header.site_name.clone(),
            entity_id: entity_id.into(),
            entity_label: entity_label.into(),
            unit: unit.into(),
            currency: header.currency.clone(),
            start_value: delta.start,
            total_value: delta.end,
            used_value: delta.used,
            fixed_charge: header.tariff.fixed_charge,
            rate: header.tariff.rate,
            total_cost: header.tariff.cost(delta.used),
        }
    }
}

/// `RCPT-<YYYYMM>-<8 random chars>`, the month taken from the period start
pub fn new_report_id(period: &Period) -> String {
    let ulid = ulid::Ulid::new().to_string();
    // The last characters of a ULID are random; the first ones encode time
    let suffix = &ulid[ulid.len() - 8..];
    format!("RCPT-{}-{}", period.start_date.format("%Y%m"), suffix)
}

/// Format an amount with two decimals
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}
