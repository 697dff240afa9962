//! Consumption resolution over recorded meter history
//!
//! Cumulative meters (kWh counters, water totals) only report their running
//! total. To bill a period we need the reading at the start and at the end
//! of it, and the difference between the two:
//!
//! - [`EnergyResolver::resolve_at`] reconstructs a reading at an arbitrary
//!   instant from the last recorded sample at or before it
//! - [`EnergyResolver::resolve_delta`] differences two such readings, filling
//!   missing sides with a [`FallbackStrategy`] and clamping meter resets to 0
//! - [`Period`] turns a month or a pair of `YYYY-MM-DD` dates into instants in
//!   the hub's time zone, looked up through a process-wide cache
//! - [`BatchOutcome`] collects per-entity results so one broken meter never
//!   aborts a multi-meter request

mod batch;
mod error;
mod period;
mod resolver;
mod timezone;

pub use batch::{BatchFailure, BatchOutcome};
pub use error::{EnergyError, EnergyResult, PeriodError};
pub use period::{last_day_of_month, parse_date, Period};
pub use resolver::{
    clamp_delta, select_at, DeltaResult, EnergyResolver, FallbackStrategy, ResolverConfig,
    DEFAULT_HEURISTIC_FACTOR, DEFAULT_LOOKBACK_DAYS,
};
pub use timezone::{get_time_zone, TimeZoneError};
