//! REST API
//!
//! A subset of the Home Assistant REST API, enough to feed meter states,
//! call the receipt services and inspect recorded history.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use novu_config::CoreConfig;
use novu_core::{Context, EntityId, HistoryProvider, Sample};
use novu_service_registry::{ServiceDescription, ServiceError, ServiceRegistry};
use novu_state_store::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::hub::Hub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub states: Arc<StateStore>,
    pub services: Arc<ServiceRegistry>,
    pub history: Arc<dyn HistoryProvider>,
    pub config: Arc<CoreConfig>,
}

impl AppState {
    pub fn from_hub(hub: &Hub) -> Self {
        Self {
            states: hub.states.clone(),
            services: hub.services.clone(),
            history: hub.recorder.history(),
            config: Arc::new(hub.core.clone()),
        }
    }
}

/// API status response
#[derive(Serialize)]
struct ApiStatus {
    message: &'static str,
}

#[derive(Serialize)]
struct ConfigResponse {
    location_name: String,
    time_zone: String,
    currency: String,
    language: String,
    version: &'static str,
}

/// Request to set entity state
#[derive(Deserialize)]
pub struct SetStateRequest {
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

/// Services of one domain
#[derive(Serialize)]
pub struct ServiceResponse {
    pub domain: String,
    pub services: BTreeMap<String, ServiceDescription>,
}

/// Response of a service call made with `?return_response`
#[derive(Serialize)]
pub struct ServiceCallResponse {
    pub changed_states: Vec<novu_core::State>,
    pub service_response: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
        }),
    )
}

fn parse_entity_id(entity_id: &str) -> Result<EntityId, ApiError> {
    EntityId::new(entity_id).map_err(|e| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid entity_id {entity_id}: {e}"),
        )
    })
}

/// CORS for the configured origins; no origins allows any
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Create the API router
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/", get(api_status))
        .route("/api/config", get(get_config))
        .route("/api/states", get(get_states))
        .route("/api/states/:entity_id", get(get_state).post(set_state))
        .route("/api/services", get(get_services))
        .route("/api/services/:domain/:service", post(call_service))
        .route("/api/history/:entity_id", get(get_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn start_server(
    router: Router,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

// ==================== Handlers ====================

/// GET /api/
async fn api_status() -> Json<ApiStatus> {
    Json(ApiStatus {
        message: "API running.",
    })
}

/// GET /api/config
async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let config = &state.config;
    Json(ConfigResponse {
        location_name: config.name.clone(),
        time_zone: config.time_zone.clone(),
        currency: config.currency.clone(),
        language: config.language.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/states
async fn get_states(State(state): State<AppState>) -> Json<Vec<novu_core::State>> {
    let mut states = state.states.all();
    states.sort_by(|a, b| a.entity_id.as_str().cmp(b.entity_id.as_str()));
    Json(states)
}

/// GET /api/states/{entity_id}
async fn get_state(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> Result<Json<novu_core::State>, ApiError> {
    let id = parse_entity_id(&entity_id)?;
    state
        .states
        .get(&id)
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Entity not found: {entity_id}")))
}

/// POST /api/states/{entity_id}
async fn set_state(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Json(request): Json<SetStateRequest>,
) -> Result<Json<novu_core::State>, ApiError> {
    let id = parse_entity_id(&entity_id)?;
    let new_state = state
        .states
        .set(id, request.state, request.attributes, Context::new());
    Ok(Json(new_state))
}

/// GET /api/services
async fn get_services(State(state): State<AppState>) -> Json<Vec<ServiceResponse>> {
    let responses = state
        .services
        .all_services()
        .into_iter()
        .map(|(domain, descriptions)| ServiceResponse {
            domain,
            services: descriptions
                .into_iter()
                .map(|desc| (desc.service.clone(), desc))
                .collect(),
        })
        .collect();
    Json(responses)
}

/// POST /api/services/{domain}/{service}[?return_response]
///
/// An empty body is an empty payload. Without `return_response` the reply is
/// an empty list of changed states.
async fn call_service(
    State(state): State<AppState>,
    Path((domain, service)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let service_data = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::json!({})
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
        })?
    };
    let return_response = params.contains_key("return_response");

    let response = state
        .services
        .call(&domain, &service, service_data, Context::new(), return_response)
        .await
        .map_err(|e| {
            let status = match e {
                ServiceError::CallFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            api_error(status, e.to_string())
        })?;

    if return_response {
        let body = ServiceCallResponse {
            changed_states: Vec::new(),
            service_response: response,
        };
        serde_json::to_value(body)
            .map(Json)
            .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    } else {
        Ok(Json(serde_json::json!([])))
    }
}

/// GET /api/history/{entity_id}?start=&end=
///
/// Defaults to the last 24 hours.
async fn get_history(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Sample>>, ApiError> {
    let id = parse_entity_id(&entity_id)?;
    let end = query.end.unwrap_or_else(Utc::now);
    let start = query.start.unwrap_or_else(|| {
        end.checked_sub_signed(Duration::days(1))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    });
    if end < start {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "end must not be before start",
        ));
    }

    state
        .history
        .fetch_samples(&id, start, end)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::TimeZone;
    use novu_core::{ServiceCall, SupportsResponse};
    use novu_event_bus::EventBus;
    use novu_recorder::MemoryRecorder;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn create_test_state() -> (AppState, Arc<MemoryRecorder>) {
        let bus = Arc::new(EventBus::new());
        let recorder = Arc::new(MemoryRecorder::new());
        let services = Arc::new(ServiceRegistry::new());
        services.register(
            ServiceDescription::new("sensor_pdf_generator", "list_pdfs")
                .with_response(SupportsResponse::Only),
            |_: ServiceCall| async move { Ok(Some(json!({"pdf_files": ["a.pdf"]}))) },
        );
        services.register(
            ServiceDescription::new("sensor_pdf_generator", "delete_pdf"),
            |call: ServiceCall| async move {
                match call.get::<String>("filename") {
                    Some(_) => Ok(None),
                    None => Err(ServiceError::invalid("filename is required")),
                }
            },
        );

        let state = AppState {
            states: Arc::new(StateStore::new(bus)),
            services,
            history: recorder.clone(),
            config: Arc::new(CoreConfig::default()),
        };
        (state, recorder)
    }

    fn app() -> (Router, AppState, Arc<MemoryRecorder>) {
        let (state, recorder) = create_test_state();
        (create_router(state.clone(), cors_layer(&[])), state, recorder)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_api_status() {
        let (app, _, _) = app();
        let response = app.oneshot(get_request("/api/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"message": "API running."}));
    }

    #[tokio::test]
    async fn test_set_and_get_state() {
        let (app, state, _) = app();

        let response = app
            .clone()
            .oneshot(post(
                "/api/states/sensor.unit_1_total_energy",
                r#"{"state": "1523.75", "attributes": {"unit_of_measurement": "kWh"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_request("/api/states/sensor.unit_1_total_energy"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["state"], "1523.75");
        assert_eq!(body["attributes"]["unit_of_measurement"], "kWh");
        assert_eq!(state.states.entity_count(), 1);

        let response = app
            .clone()
            .oneshot(get_request("/api/states/sensor.missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get_request("/api/states/not-an-entity"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_services() {
        let (app, _, _) = app();
        let response = app.oneshot(get_request("/api/services")).await.unwrap();

        let body = body_json(response).await;
        assert_eq!(body[0]["domain"], "sensor_pdf_generator");
        assert_eq!(
            body[0]["services"]["list_pdfs"]["supports_response"],
            "only"
        );
        assert!(body[0]["services"]["delete_pdf"].is_object());
    }

    #[tokio::test]
    async fn test_call_service_with_response() {
        let (app, _, _) = app();

        let response = app
            .clone()
            .oneshot(post(
                "/api/services/sensor_pdf_generator/list_pdfs?return_response",
                "",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"changed_states": [], "service_response": {"pdf_files": ["a.pdf"]}})
        );

        let response = app
            .oneshot(post("/api/services/sensor_pdf_generator/list_pdfs", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_call_service_errors() {
        let (app, _, _) = app();

        let response = app
            .clone()
            .oneshot(post(
                "/api/services/sensor_pdf_generator/delete_pdf",
                r#"{"filename": "a.pdf"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));

        let response = app
            .clone()
            .oneshot(post("/api/services/sensor_pdf_generator/delete_pdf", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["message"]
            .as_str()
            .unwrap()
            .contains("filename is required"));

        let response = app
            .clone()
            .oneshot(post("/api/services/sensor_pdf_generator/missing", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post("/api/services/sensor_pdf_generator/delete_pdf", "{"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history() {
        let (app, _, recorder) = app();
        let id = EntityId::new("sensor.unit_1_total_energy").unwrap();
        for (day, value) in [(1, "100"), (2, "110"), (5, "140")] {
            let ts = Utc.with_ymd_and_hms(2025, 8, day, 0, 0, 0).unwrap();
            recorder.insert(&id, Sample::new(ts, value));
        }

        let response = app
            .clone()
            .oneshot(get_request(
                "/api/history/sensor.unit_1_total_energy?start=2025-08-01T00:00:00Z&end=2025-08-03T00:00:00Z",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let states: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["state"].as_str().unwrap())
            .collect();
        assert_eq!(states, vec!["100", "110"]);

        let response = app
            .oneshot(get_request(
                "/api/history/sensor.unit_1_total_energy?start=2025-08-03T00:00:00Z&end=2025-08-01T00:00:00Z",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_history_default_start_at_earliest_instant() {
        let (app, _, _) = app();

        let response = app
            .oneshot(get_request(
                "/api/history/sensor.unit_1_total_energy?end=-262143-01-01T00:00:00Z",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }
}
