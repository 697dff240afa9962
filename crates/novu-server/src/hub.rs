//! The running hub: shared components and the integrations wired to them

use anyhow::{Context as _, Result};
use chrono::Utc;
use novu_config::{CoreConfig, HttpConfig, HubConfig};
use novu_energy::get_time_zone;
use novu_event_bus::EventBus;
use novu_receipts::{
    register_services, unregister_services, ReceiptGenerator, ReceiptsConfig, ReportStore,
    SiteInfo, TypstRenderer, DOMAIN,
};
use novu_recorder::{spawn_state_listener, RecorderBackend, RecorderConfig, SampleSink};
use novu_service_registry::ServiceRegistry;
use novu_state_store::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How often old samples are purged
const PURGE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// The central hub instance
pub struct Hub {
    /// Event bus for pub/sub communication
    pub bus: Arc<EventBus>,
    /// Current entity states
    pub states: Arc<StateStore>,
    /// Service registry for service calls
    pub services: Arc<ServiceRegistry>,
    pub recorder: RecorderBackend,
    pub core: CoreConfig,
    pub http: HttpConfig,
    tasks: Vec<JoinHandle<()>>,
}

impl Hub {
    /// Create the components, start the recorder and set up integrations
    pub async fn start(config: &HubConfig) -> Result<Self> {
        let core = config.core().context("invalid homeassistant section")?;
        let http = config.http().context("invalid http section")?;

        let mut recorder_config: RecorderConfig =
            config.section("recorder").context("invalid recorder section")?;
        if let Some(path) = recorder_config.db_path.take() {
            recorder_config.db_path = Some(config.config_dir().join(path));
        }

        let bus = Arc::new(EventBus::new());
        let states = Arc::new(StateStore::new(bus.clone()));
        let services = Arc::new(ServiceRegistry::new());
        let recorder = RecorderBackend::open(&recorder_config)?;

        let mut tasks = vec![spawn_state_listener(&bus, recorder.sink())];
        if recorder_config.keep_days > 0 {
            tasks.push(spawn_purge_task(recorder.sink(), recorder_config.keep_days));
        }

        let hub = Self {
            bus,
            states,
            services,
            recorder,
            core,
            http,
            tasks,
        };

        hub.setup_receipts(config)?;

        info!(
            name = %hub.core.name,
            time_zone = %hub.core.time_zone,
            services = hub.services.service_count(),
            "Hub started"
        );
        Ok(hub)
    }

    /// Set up the sensor_pdf_generator integration
    fn setup_receipts(&self, config: &HubConfig) -> Result<()> {
        let receipts: ReceiptsConfig = config
            .section(DOMAIN)
            .with_context(|| format!("invalid {DOMAIN} section"))?;
        let time_zone = get_time_zone(&self.core.time_zone)?;

        let renderer = Arc::new(TypstRenderer::new(
            receipts.typst_binary.clone(),
            receipts.font_dir(config.config_dir()),
            receipts.fonts.clone(),
        ));
        let store = ReportStore::new(receipts.output_dir(&self.core.media_dir));
        info!(output_dir = %store.dir().display(), "Receipts will be written to the media directory");

        let generator = ReceiptGenerator::new(
            receipts,
            SiteInfo {
                name: self.core.name.clone(),
                currency: self.core.currency.clone(),
                time_zone,
            },
            self.recorder.history(),
            self.states.clone(),
            renderer,
            store,
            self.bus.clone(),
        )?;
        register_services(&self.services, Arc::new(generator));
        Ok(())
    }

    /// Unload integrations and stop background tasks
    pub fn stop(self) {
        unregister_services(&self.services);
        for task in &self.tasks {
            task.abort();
        }
        info!("Hub stopped");
    }
}

/// Purge samples older than `keep_days`, once at startup and then daily
fn spawn_purge_task(sink: Arc<dyn SampleSink>, keep_days: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(i64::from(keep_days));
            match sink.purge_before(cutoff).await {
                Ok(removed) => info!(removed, keep_days, "Purged old samples"),
                Err(e) => warn!(error = %e, "Failed to purge old samples"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use novu_core::{Context, EntityId};
    use serde_json::json;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_registers_receipt_services() {
        let dir = TempDir::new().unwrap();
        let config = HubConfig::parse(
            dir.path(),
            "homeassistant:\n  name: Building A\n  time_zone: Asia/Riyadh\n  currency: SAR\n",
        )
        .unwrap();

        let hub = Hub::start(&config).await.unwrap();
        assert_eq!(hub.core.currency, "SAR");
        assert_eq!(hub.services.domain_services(DOMAIN).len(), 4);
        assert!(matches!(hub.recorder, RecorderBackend::Memory(_)));

        let response = hub
            .services
            .call(DOMAIN, "list_pdfs", json!({}), Context::new(), true)
            .await
            .unwrap();
        assert_eq!(response, Some(json!({"pdf_files": []})));

        let services = hub.services.clone();
        hub.stop();
        assert_eq!(services.service_count(), 0);
    }

    #[tokio::test]
    async fn test_states_reach_the_recorder() {
        let dir = TempDir::new().unwrap();
        let config = HubConfig::parse(
            dir.path(),
            "recorder:\n  db_path: history.db\n",
        )
        .unwrap();

        let hub = Hub::start(&config).await.unwrap();
        assert!(matches!(hub.recorder, RecorderBackend::Sqlite(_)));
        assert!(dir.path().join("history.db").exists());

        let id = EntityId::new("sensor.unit_1_total_energy").unwrap();
        hub.states
            .set(id.clone(), "12.5", HashMap::new(), Context::new());

        let history = hub.recorder.history();
        let from = Utc::now() - chrono::Duration::hours(1);
        let mut samples = Vec::new();
        for _ in 0..50 {
            samples = history
                .fetch_samples(&id, from, Utc::now())
                .await
                .unwrap();
            if !samples.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value(), Some(12.5));
        hub.stop();
    }

    #[tokio::test]
    async fn test_unknown_time_zone_fails_startup() {
        let dir = TempDir::new().unwrap();
        let config =
            HubConfig::parse(dir.path(), "homeassistant:\n  time_zone: Mars/Olympus\n").unwrap();

        let err = Hub::start(&config).await.err().unwrap();
        assert!(err.to_string().contains("Mars/Olympus"));
    }
}
