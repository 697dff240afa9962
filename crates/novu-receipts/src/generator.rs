//! Receipt generation for one or more meters

use chrono::Utc;
use chrono_tz::Tz;
use novu_core::{Context, CurrentStateProvider, EntityId, HistoryProvider};
use novu_energy::{BatchFailure, BatchOutcome, EnergyError, EnergyResolver};
use novu_event_bus::EventBus;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::billing::{Receipt, ReceiptHeader};
use crate::config::ReceiptsConfig;
use crate::discovery::{discover_meters, entity_label, Meter};
use crate::events::PdfGeneratorCompleteData;
use crate::naming::report_filename;
use crate::render::ReceiptRenderer;
use crate::request::GenerateRequest;
use crate::store::ReportStore;
use crate::{ReceiptError, ReceiptResult};

/// Unit printed when a meter does not report one
const DEFAULT_UNIT: &str = "kWh";

/// Site details printed on every receipt
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub name: String,
    pub currency: String,
    pub time_zone: Tz,
}

/// One receipt written to the report store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedReport {
    pub entity_id: String,
    pub filename: String,
    pub report_id: String,
    pub used: f64,
    pub total_cost: f64,
}

/// Response of `generate_pdf`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateResponse {
    pub generated: Vec<GeneratedReport>,
    pub failed: Vec<BatchFailure>,
}

impl From<BatchOutcome<GeneratedReport>> for GenerateResponse {
    fn from(outcome: BatchOutcome<GeneratedReport>) -> Self {
        Self {
            generated: outcome.successes,
            failed: outcome.failures,
        }
    }
}

/// Builds, renders and stores receipts
pub struct ReceiptGenerator {
    config: ReceiptsConfig,
    site: SiteInfo,
    resolver: EnergyResolver,
    states: Arc<dyn CurrentStateProvider>,
    renderer: Arc<dyn ReceiptRenderer>,
    store: ReportStore,
    bus: Arc<EventBus>,
}

impl ReceiptGenerator {
    pub fn new(
        config: ReceiptsConfig,
        site: SiteInfo,
        history: Arc<dyn HistoryProvider>,
        states: Arc<dyn CurrentStateProvider>,
        renderer: Arc<dyn ReceiptRenderer>,
        store: ReportStore,
        bus: Arc<EventBus>,
    ) -> ReceiptResult<Self> {
        config.validate()?;
        let resolver = EnergyResolver::new(history, states.clone(), config.resolver_config()?);
        Ok(Self {
            config,
            site,
            resolver,
            states,
            renderer,
            store,
            bus,
        })
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Generate one receipt per requested entity
    ///
    /// Request-level problems (payload, dates, missing fonts) fail the whole
    /// call. Problems with a single entity are reported in `failed` and the
    /// remaining entities are still processed.
    #[instrument(skip_all, fields(context_id = %context.id))]
    pub async fn generate(
        &self,
        request: GenerateRequest,
        context: &Context,
    ) -> ReceiptResult<GenerateResponse> {
        request.validate_tariff().map_err(ReceiptError::Request)?;
        let entity_ids = request.entity_ids();
        if entity_ids.is_empty() {
            return Err(ReceiptError::NoEntities);
        }

        let period = request.period(self.site.time_zone, Utc::now())?;
        self.renderer.preflight().await?;
        self.store.ensure_dir().await?;

        let header = ReceiptHeader {
            generated_at: Utc::now().with_timezone(&self.site.time_zone).fixed_offset(),
            period,
            site_name: self.site.name.clone(),
            currency: self.site.currency.clone(),
            tariff: self
                .config
                .tariff()
                .with_overrides(request.fixed_charge, request.rate),
        };

        info!(
            entities = entity_ids.len(),
            start = %period.start_date,
            end = %period.end_date,
            "Generating receipts"
        );

        let mut outcome = BatchOutcome::new();
        for entity_id in &entity_ids {
            let result = self.generate_one(entity_id, &header).await;
            let event = match &result {
                Ok(report) => PdfGeneratorCompleteData::generated(entity_id, &report.filename),
                Err(e) => {
                    warn!(entity_id = %entity_id, error = %e, "Receipt generation failed");
                    PdfGeneratorCompleteData::failed(entity_id, e)
                }
            };
            self.bus.fire_typed(event, context.child());
            outcome.record(entity_id.clone(), result);
        }

        info!(
            generated = outcome.successes.len(),
            failed = outcome.failures.len(),
            "Receipt batch finished"
        );
        Ok(outcome.into())
    }

    async fn generate_one(
        &self,
        entity_id: &str,
        header: &ReceiptHeader,
    ) -> ReceiptResult<GeneratedReport> {
        let not_found = || EnergyError::EntityNotFound(entity_id.to_string());
        let id = EntityId::new(entity_id).map_err(|_| not_found())?;
        let state = self.states.current_state(&id).ok_or_else(not_found)?;

        let delta = self
            .resolver
            .try_delta(&id, header.period.start, header.period.end)
            .await?;

        let label = entity_label(entity_id, Some(&state));
        let unit = state.unit().unwrap_or(DEFAULT_UNIT);
        let receipt = Receipt::build(header, entity_id, label.as_str(), unit, &delta);

        let filename = report_filename(&self.config.file_prefix, &label, &header.period);
        let path = self.store.path_for(&filename)?;
        self.renderer.render(&receipt, &path).await?;

        info!(
            entity_id = %entity_id,
            filename = %filename,
            used = receipt.used_value,
            "Receipt written"
        );

        Ok(GeneratedReport {
            entity_id: entity_id.to_string(),
            filename,
            report_id: receipt.report_id,
            used: receipt.used_value,
            total_cost: receipt.total_cost,
        })
    }

    /// Stored report names, sorted
    pub async fn list_pdfs(&self) -> ReceiptResult<Vec<String>> {
        self.store.list().await
    }

    pub async fn delete_pdf(&self, filename: &str) -> ReceiptResult<()> {
        self.store.delete(filename).await
    }

    /// Meters found among the current sensor states
    pub fn list_meters(&self) -> Vec<Meter> {
        discover_meters(&self.states.all_states())
    }
}
