//! Point-in-time and period resolution of cumulative meter readings

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use novu_core::{CurrentStateProvider, EntityId, HistoryProvider, Sample};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{EnergyError, EnergyResult};

/// Days of history searched backwards from a target instant
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Share of the current reading assumed for a missing start reading
pub const DEFAULT_HEURISTIC_FACTOR: f64 = 0.1;

/// How to fill a reading that has no usable sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FallbackStrategy {
    /// Missing readings count as 0
    #[default]
    Zero,

    /// Missing end takes the current value; missing start takes
    /// `current * factor`. Without a current value both fall back to 0.
    Heuristic { factor: f64 },
}

impl FallbackStrategy {
    /// Build a strategy from its configured name ("zero" or "heuristic")
    pub fn from_name(name: &str, factor: f64) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "zero" => Some(Self::Zero),
            "heuristic" => Some(Self::Heuristic { factor }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::Heuristic { .. } => "heuristic",
        }
    }

    fn fill_start(&self, current: Option<f64>) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Heuristic { factor } => current.map(|c| c * factor).unwrap_or(0.0),
        }
    }

    fn fill_end(&self, current: Option<f64>) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::Heuristic { .. } => current.unwrap_or(0.0),
        }
    }

    fn needs_current(&self) -> bool {
        matches!(self, Self::Heuristic { .. })
    }
}

/// Resolver settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Window searched backwards from each target instant
    pub lookback: Duration,
    pub fallback: FallbackStrategy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookback: Duration::days(i64::from(DEFAULT_LOOKBACK_DAYS)),
            fallback: FallbackStrategy::default(),
        }
    }
}

impl ResolverConfig {
    pub fn new(lookback_days: u32, fallback: FallbackStrategy) -> Self {
        Self {
            lookback: Duration::days(i64::from(lookback_days)),
            fallback,
        }
    }
}

/// Readings at both ends of a period and the consumption between them
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeltaResult {
    /// Reading resolved from history at the period start
    pub start_value: Option<f64>,
    /// Reading resolved from history at the period end
    pub end_value: Option<f64>,
    /// Start reading after the fallback strategy was applied
    pub start: f64,
    /// End reading after the fallback strategy was applied
    pub end: f64,
    /// `max(end - start, 0)`
    pub used: f64,
}

impl DeltaResult {
    /// True when neither end came from recorded history
    pub fn is_empty(&self) -> bool {
        self.start_value.is_none() && self.end_value.is_none()
    }
}

/// Consumption between two readings; meter resets count as no consumption
pub fn clamp_delta(start: f64, end: f64) -> f64 {
    (end - start).max(0.0)
}

/// The latest sample at or before `target`
///
/// `samples` must be ascending by timestamp. The scan stops at the first
/// sample later than `target`.
pub fn select_at(samples: &[Sample], target: DateTime<Utc>) -> Option<&Sample> {
    let mut selected = None;
    for sample in samples {
        if sample.timestamp > target {
            break;
        }
        selected = Some(sample);
    }
    selected
}

/// Resolves meter readings from recorded history
///
/// Every call reads a fresh snapshot from the history provider; nothing is
/// cached between calls.
#[derive(Clone)]
pub struct EnergyResolver {
    history: Arc<dyn HistoryProvider>,
    current: Arc<dyn CurrentStateProvider>,
    config: ResolverConfig,
}

impl EnergyResolver {
    pub fn new(
        history: Arc<dyn HistoryProvider>,
        current: Arc<dyn CurrentStateProvider>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            history,
            current,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Reading of `entity_id` at `target`
    ///
    /// Returns None when the lookback window holds no sample at or before
    /// `target`, when the selected sample is not numeric, or when the
    /// history backend fails. A window reaching past the earliest
    /// representable instant starts there.
    #[instrument(skip(self), fields(entity_id = %entity_id))]
    pub async fn resolve_at(&self, entity_id: &EntityId, target: DateTime<Utc>) -> Option<f64> {
        let from = target
            .checked_sub_signed(self.config.lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let samples = match self.history.fetch_samples(entity_id, from, target).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!(error = %e, "History lookup failed");
                return None;
            }
        };

        let Some(sample) = select_at(&samples, target) else {
            debug!(count = samples.len(), "No sample at or before target");
            return None;
        };

        let value = sample.value();
        if value.is_none() {
            debug!(state = %sample.state, "Selected sample is not numeric");
        }
        value
    }

    /// Readings at `start` and `end` and the clamped consumption between them
    #[instrument(skip(self), fields(entity_id = %entity_id, fallback = self.config.fallback.name()))]
    pub async fn resolve_delta(
        &self,
        entity_id: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DeltaResult {
        let start_value = self.resolve_at(entity_id, start).await;
        let end_value = self.resolve_at(entity_id, end).await;

        let fallback = self.config.fallback;
        let current = if fallback.needs_current() && (start_value.is_none() || end_value.is_none())
        {
            self.current_reading(entity_id)
        } else {
            None
        };

        let start_eff = start_value.unwrap_or_else(|| fallback.fill_start(current));
        let end_eff = end_value.unwrap_or_else(|| fallback.fill_end(current));
        let used = clamp_delta(start_eff, end_eff);

        debug!(?start_value, ?end_value, used, "Resolved period consumption");

        DeltaResult {
            start_value,
            end_value,
            start: start_eff,
            end: end_eff,
            used,
        }
    }

    /// Numeric value of the entity's current state
    fn current_reading(&self, entity_id: &EntityId) -> Option<f64> {
        self.current
            .current_value(entity_id)
            .and_then(|raw| Sample::new(Utc::now(), raw).value())
    }

    /// Like [`resolve_delta`](Self::resolve_delta), but an entity with no
    /// current state is an error, and so is an entity with no history at
    /// either end unless the heuristic fallback can fill both sides from a
    /// numeric current value
    pub async fn try_delta(
        &self,
        entity_id: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EnergyResult<DeltaResult> {
        if self.current.current_state(entity_id).is_none() {
            return Err(EnergyError::EntityNotFound(entity_id.to_string()));
        }

        let delta = self.resolve_delta(entity_id, start, end).await;
        if delta.is_empty()
            && !(self.config.fallback.needs_current() && self.current_reading(entity_id).is_some())
        {
            return Err(EnergyError::NoHistory {
                entity_id: entity_id.to_string(),
            });
        }
        Ok(delta)
    }
}
