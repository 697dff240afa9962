//! Recorder configuration from the `recorder:` section

use serde::Deserialize;
use std::path::PathBuf;

/// Recorder settings
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// SQLite database file; samples stay in memory when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Days of history to keep; older samples are purged
    #[serde(default = "default_keep_days")]
    pub keep_days: u32,
}

fn default_keep_days() -> u32 {
    400
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            keep_days: default_keep_days(),
        }
    }
}
