//! Settings from the `sensor_pdf_generator:` section

use novu_energy::{
    FallbackStrategy, ResolverConfig, DEFAULT_HEURISTIC_FACTOR, DEFAULT_LOOKBACK_DAYS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::billing::Tariff;
use crate::{ReceiptError, ReceiptResult};

/// Upper bound for `lookback_days`, about ten years
pub const MAX_LOOKBACK_DAYS: u32 = 3660;

/// Receipt generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptsConfig {
    /// Directory under the media root where reports are written
    pub output_subdir: String,

    /// First part of every report file name
    pub file_prefix: String,

    /// Days searched backwards for a reading
    pub lookback_days: u32,

    /// Missing reading policy: "zero" or "heuristic"
    pub fallback: String,

    /// Share of the current reading used for a missing start reading
    pub heuristic_factor: f64,

    /// Default fixed charge per receipt
    pub fixed_charge: f64,

    /// Default price per unit consumed
    pub rate: f64,

    /// Directory holding the fonts; relative paths are under the config dir
    pub font_dir: PathBuf,

    /// Font files that must exist in `font_dir`
    pub fonts: Vec<String>,

    /// Typst executable, looked up on PATH unless absolute
    pub typst_binary: PathBuf,
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            output_subdir: "sensor_pdf_generator".to_string(),
            file_prefix: "receipt".to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            fallback: "zero".to_string(),
            heuristic_factor: DEFAULT_HEURISTIC_FACTOR,
            fixed_charge: 0.0,
            rate: 0.0,
            font_dir: PathBuf::from("fonts"),
            fonts: vec![
                "NotoSans-Regular.ttf".to_string(),
                "NotoSans-Bold.ttf".to_string(),
                "NotoNaskhArabic-Regular.ttf".to_string(),
            ],
            typst_binary: PathBuf::from("typst"),
        }
    }
}

impl ReceiptsConfig {
    /// Check values that serde cannot
    pub fn validate(&self) -> ReceiptResult<()> {
        self.fallback_strategy()?;
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(ReceiptError::Config {
                key: "lookback_days",
                reason: format!(
                    "must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                    self.lookback_days
                ),
            });
        }
        if !self.heuristic_factor.is_finite() || self.heuristic_factor < 0.0 {
            return Err(ReceiptError::Config {
                key: "heuristic_factor",
                reason: format!("must be a non-negative number, got {}", self.heuristic_factor),
            });
        }
        let subdir = Path::new(&self.output_subdir);
        if self.output_subdir.trim().is_empty()
            || subdir.is_absolute()
            || self.output_subdir.contains("..")
        {
            return Err(ReceiptError::Config {
                key: "output_subdir",
                reason: format!("'{}' must be a relative directory name", self.output_subdir),
            });
        }
        Ok(())
    }

    pub fn fallback_strategy(&self) -> ReceiptResult<FallbackStrategy> {
        FallbackStrategy::from_name(&self.fallback, self.heuristic_factor).ok_or_else(|| {
            ReceiptError::Config {
                key: "fallback",
                reason: format!("unknown strategy '{}', expected zero or heuristic", self.fallback),
            }
        })
    }

    pub fn resolver_config(&self) -> ReceiptResult<ResolverConfig> {
        Ok(ResolverConfig::new(
            self.lookback_days,
            self.fallback_strategy()?,
        ))
    }

    pub fn tariff(&self) -> Tariff {
        Tariff {
            fixed_charge: self.fixed_charge,
            rate: self.rate,
        }
    }

    /// Output directory for reports under `media_dir`
    pub fn output_dir(&self, media_dir: &Path) -> PathBuf {
        media_dir.join(&self.output_subdir)
    }

    /// Font directory, resolved against `config_dir` when relative
    pub fn font_dir(&self, config_dir: &Path) -> PathBuf {
        if self.font_dir.is_absolute() {
            self.font_dir.clone()
        } else {
            config_dir.join(&self.font_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReceiptsConfig::default();
        config.validate().unwrap();
        assert_eq!(config.resolver_config().unwrap(), ResolverConfig::default());
        assert_eq!(
            config.output_dir(Path::new("/config/www")),
            PathBuf::from("/config/www/sensor_pdf_generator")
        );
        assert_eq!(
            config.font_dir(Path::new("/config")),
            PathBuf::from("/config/fonts")
        );
    }

    #[test]
    fn test_heuristic_fallback() {
        let config = ReceiptsConfig {
            fallback: "heuristic".to_string(),
            heuristic_factor: 0.25,
            ..Default::default()
        };
        assert_eq!(
            config.fallback_strategy().unwrap(),
            FallbackStrategy::Heuristic { factor: 0.25 }
        );
    }

    #[test]
    fn test_invalid_values() {
        let unknown = ReceiptsConfig {
            fallback: "average".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            unknown.validate(),
            Err(ReceiptError::Config { key: "fallback", .. })
        ));

        let escaping = ReceiptsConfig {
            output_subdir: "../secrets".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            escaping.validate(),
            Err(ReceiptError::Config { key: "output_subdir", .. })
        ));

        let no_lookback = ReceiptsConfig {
            lookback_days: 0,
            ..Default::default()
        };
        assert!(no_lookback.validate().is_err());

        let huge_lookback = ReceiptsConfig {
            lookback_days: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            huge_lookback.validate(),
            Err(ReceiptError::Config { key: "lookback_days", .. })
        ));

        let longest = ReceiptsConfig {
            lookback_days: MAX_LOOKBACK_DAYS,
            ..Default::default()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ReceiptsConfig =
            serde_json::from_value(serde_json::json!({"rate": 0.18, "fixed_charge": 25.0}))
                .unwrap();
        assert_eq!(config.tariff(), Tariff { fixed_charge: 25.0, rate: 0.18 });
        assert_eq!(config.file_prefix, "receipt");
    }
}
