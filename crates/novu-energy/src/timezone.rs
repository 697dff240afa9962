//! Process-wide time zone lookup cache
//!
//! Zone names are immutable identifiers, so a parsed zone stays valid for
//! the whole process. The cache is created on first use and never
//! invalidated.

use chrono_tz::Tz;
use dashmap::DashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

static TIME_ZONES: OnceLock<DashMap<String, Tz>> = OnceLock::new();

/// Unknown time zone name
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown time zone '{0}'")]
pub struct TimeZoneError(pub String);

/// Resolve an IANA zone name (e.g., "Asia/Riyadh"), memoized per name
pub fn get_time_zone(name: &str) -> Result<Tz, TimeZoneError> {
    let cache = TIME_ZONES.get_or_init(DashMap::new);
    if let Some(tz) = cache.get(name) {
        return Ok(*tz);
    }

    let tz: Tz = name
        .parse()
        .map_err(|_| TimeZoneError(name.to_string()))?;
    debug!(time_zone = %name, "Caching time zone");
    cache.insert(name.to_string(), tz);
    Ok(tz)
}
