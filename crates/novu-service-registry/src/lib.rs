//! Request/response dispatcher for named hub services
//!
//! Integrations register async handlers under a `domain.service` name and
//! callers (the REST API, automations, tests) dispatch [`ServiceCall`]s to
//! them. A handler may return a JSON response body; callers must ask for it
//! and the service must declare that it produces one.

use dashmap::DashMap;
use novu_core::{Context, ServiceCall, SupportsResponse};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Result type for service calls
pub type ServiceResult = Result<Option<serde_json::Value>, ServiceError>;

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

/// Errors that can occur when working with services
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    /// The payload was rejected before any work was done
    #[error("invalid service data: {0}")]
    InvalidData(String),

    /// The handler ran and failed
    #[error("service call failed: {0}")]
    CallFailed(String),

    #[error("service {0} does not return a response")]
    ResponseNotSupported(String),

    #[error("service {0} only returns a response; call it with return_response")]
    ResponseRequired(String),
}

impl ServiceError {
    /// Shorthand for handlers turning a payload error into InvalidData
    pub fn invalid(error: impl ToString) -> Self {
        Self::InvalidData(error.to_string())
    }

    /// Shorthand for handlers turning a processing error into CallFailed
    pub fn failed(error: impl ToString) -> Self {
        Self::CallFailed(error.to_string())
    }
}

/// One documented field of a service payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceField {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

/// Information about a registered service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescription {
    /// Domain the service belongs to
    pub domain: String,
    /// Service name
    pub service: String,
    /// Human-readable name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description of what the service does
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Payload fields, for documentation only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ServiceField>,
    /// Whether this service supports returning a response
    pub supports_response: SupportsResponse,
}

impl ServiceDescription {
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            name: None,
            description: None,
            fields: Vec::new(),
            supports_response: SupportsResponse::None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
        example: Option<serde_json::Value>,
    ) -> Self {
        self.fields.push(ServiceField {
            name: name.into(),
            description: description.into(),
            required,
            example,
        });
        self
    }

    pub fn with_response(mut self, supports_response: SupportsResponse) -> Self {
        self.supports_response = supports_response;
        self
    }

    fn key(&self) -> ServiceKey {
        ServiceKey::new(&self.domain, &self.service)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ServiceKey {
    domain: String,
    service: String,
}

impl ServiceKey {
    fn new(domain: &str, service: &str) -> Self {
        Self {
            domain: domain.to_string(),
            service: service.to_string(),
        }
    }
}

struct RegisteredService {
    handler: ServiceHandler,
    description: ServiceDescription,
}

/// Registry of all services known to the hub
pub struct ServiceRegistry {
    services: DashMap<ServiceKey, RegisteredService>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Register a service, replacing any previous handler under the same name
    #[instrument(skip_all, fields(domain = %description.domain, service = %description.service))]
    pub fn register<F, Fut>(&self, description: ServiceDescription, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);

        let replaced = self
            .services
            .insert(
                description.key(),
                RegisteredService {
                    handler,
                    description,
                },
            )
            .is_some();

        if replaced {
            warn!("Replaced existing service handler");
        } else {
            debug!("Registered service");
        }
    }

    /// Dispatch a call to its handler
    ///
    /// The handler's response is passed back only when `return_response` is
    /// set; asking for a response from a service that declares none fails
    /// before the handler runs.
    #[instrument(skip(self, service_data, context))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
        return_response: bool,
    ) -> ServiceResult {
        let (handler, supports_response) = {
            let registered = self
                .services
                .get(&ServiceKey::new(domain, service))
                .ok_or_else(|| {
                    warn!("Service not found");
                    ServiceError::NotFound {
                        domain: domain.to_string(),
                        service: service.to_string(),
                    }
                })?;
            (
                registered.handler.clone(),
                registered.description.supports_response,
            )
        };

        match supports_response {
            SupportsResponse::None if return_response => {
                return Err(ServiceError::ResponseNotSupported(format!(
                    "{}.{}",
                    domain, service
                )));
            }
            SupportsResponse::Only if !return_response => {
                return Err(ServiceError::ResponseRequired(format!(
                    "{}.{}",
                    domain, service
                )));
            }
            _ => {}
        }

        let call = ServiceCall::new(domain, service, service_data, context);
        debug!(context_id = %call.context.id, "Calling service");

        let response = handler(call).await.map_err(|e| {
            warn!(error = %e, "Service call failed");
            e
        })?;

        if return_response {
            Ok(response)
        } else {
            Ok(None)
        }
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services
            .contains_key(&ServiceKey::new(domain, service))
    }

    pub fn get_service(&self, domain: &str, service: &str) -> Option<ServiceDescription> {
        self.services
            .get(&ServiceKey::new(domain, service))
            .map(|s| s.description.clone())
    }

    /// Services of one domain, sorted by name
    pub fn domain_services(&self, domain: &str) -> Vec<ServiceDescription> {
        let mut services: Vec<_> = self
            .services
            .iter()
            .filter(|s| s.key().domain == domain)
            .map(|s| s.description.clone())
            .collect();
        services.sort_by(|a, b| a.service.cmp(&b.service));
        services
    }

    /// All services grouped by domain, both levels sorted
    pub fn all_services(&self) -> BTreeMap<String, Vec<ServiceDescription>> {
        let mut result: BTreeMap<String, Vec<ServiceDescription>> = BTreeMap::new();
        for entry in self.services.iter() {
            result
                .entry(entry.key().domain.clone())
                .or_default()
                .push(entry.description.clone());
        }
        for services in result.values_mut() {
            services.sort_by(|a, b| a.service.cmp(&b.service));
        }
        result
    }

    #[instrument(skip(self))]
    pub fn unregister(&self, domain: &str, service: &str) -> bool {
        let removed = self
            .services
            .remove(&ServiceKey::new(domain, service))
            .is_some();
        if removed {
            debug!("Unregistered service");
        }
        removed
    }

    /// Remove every service of a domain, returning how many were removed
    #[instrument(skip(self))]
    pub fn unregister_domain(&self, domain: &str) -> usize {
        let before = self.services.len();
        self.services.retain(|key, _| key.domain != domain);
        let count = before.saturating_sub(self.services.len());
        info!(count, "Unregistered domain services");
        count
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for ServiceRegistry
pub type SharedServiceRegistry = Arc<ServiceRegistry>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOMAIN: &str = "sensor_pdf_generator";

    fn echo(registry: &ServiceRegistry, service: &str, supports_response: SupportsResponse) {
        registry.register(
            ServiceDescription::new(DOMAIN, service).with_response(supports_response),
            |call: ServiceCall| async move { Ok(Some(call.service_data)) },
        );
    }

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = ServiceRegistry::new();
        echo(&registry, "list_pdfs", SupportsResponse::Only);

        let result = registry
            .call(DOMAIN, "list_pdfs", json!({"a": 1}), Context::new(), true)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"a": 1})));

        assert_eq!(
            registry
                .call(DOMAIN, "list_pdfs", json!({}), Context::new(), false)
                .await
                .unwrap_err(),
            ServiceError::ResponseRequired("sensor_pdf_generator.list_pdfs".to_string())
        );
    }

    #[tokio::test]
    async fn test_optional_response_dropped_unless_asked() {
        let registry = ServiceRegistry::new();
        echo(&registry, "generate_pdf", SupportsResponse::Optional);

        let result = registry
            .call(DOMAIN, "generate_pdf", json!({"a": 1}), Context::new(), false)
            .await
            .unwrap();
        assert_eq!(result, None);

        let result = registry
            .call(DOMAIN, "generate_pdf", json!({"a": 1}), Context::new(), true)
            .await
            .unwrap();
        assert_eq!(result, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_service_not_found() {
        let registry = ServiceRegistry::new();

        let result = registry
            .call(DOMAIN, "missing", json!({}), Context::new(), false)
            .await;
        assert_eq!(
            result.unwrap_err(),
            ServiceError::NotFound {
                domain: DOMAIN.to_string(),
                service: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_response_not_supported() {
        let registry = ServiceRegistry::new();
        echo(&registry, "delete_pdf", SupportsResponse::None);

        assert!(registry
            .call(DOMAIN, "delete_pdf", json!({}), Context::new(), false)
            .await
            .is_ok());
        assert_eq!(
            registry
                .call(DOMAIN, "delete_pdf", json!({}), Context::new(), true)
                .await
                .unwrap_err(),
            ServiceError::ResponseNotSupported("sensor_pdf_generator.delete_pdf".to_string())
        );
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let registry = ServiceRegistry::new();
        registry.register(
            ServiceDescription::new(DOMAIN, "generate_pdf"),
            |_: ServiceCall| async move { Err(ServiceError::invalid("bad month")) },
        );

        let result = registry
            .call(DOMAIN, "generate_pdf", json!({}), Context::new(), false)
            .await;
        assert_eq!(
            result.unwrap_err(),
            ServiceError::InvalidData("bad month".to_string())
        );
    }

    #[test]
    fn test_descriptions_are_sorted() {
        let registry = ServiceRegistry::new();
        echo(&registry, "list_pdfs", SupportsResponse::Only);
        echo(&registry, "delete_pdf", SupportsResponse::None);
        echo(&registry, "generate_pdf", SupportsResponse::Optional);
        registry.register(ServiceDescription::new("recorder", "purge"), |_| async {
            Ok(None)
        });

        let names: Vec<_> = registry
            .domain_services(DOMAIN)
            .into_iter()
            .map(|d| d.service)
            .collect();
        assert_eq!(names, vec!["delete_pdf", "generate_pdf", "list_pdfs"]);

        let all = registry.all_services();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["recorder", DOMAIN]);
    }

    #[test]
    fn test_description_builder() {
        let description = ServiceDescription::new(DOMAIN, "delete_pdf")
            .with_name("Delete PDF")
            .with_field("filename", "Report to delete", true, Some(json!("a.pdf")));

        let value = serde_json::to_value(&description).unwrap();
        assert_eq!(value["name"], "Delete PDF");
        assert_eq!(value["fields"][0]["name"], "filename");
        assert_eq!(value["supports_response"], "none");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn test_unregister() {
        let registry = ServiceRegistry::new();
        echo(&registry, "list_pdfs", SupportsResponse::Only);

        assert!(registry.has_service(DOMAIN, "list_pdfs"));
        assert!(registry.unregister(DOMAIN, "list_pdfs"));
        assert!(!registry.has_service(DOMAIN, "list_pdfs"));
        assert!(!registry.unregister(DOMAIN, "list_pdfs"));
    }

    #[test]
    fn test_unregister_domain() {
        let registry = ServiceRegistry::new();
        echo(&registry, "list_pdfs", SupportsResponse::Only);
        echo(&registry, "delete_pdf", SupportsResponse::None);
        registry.register(ServiceDescription::new("recorder", "purge"), |_| async {
            Ok(None)
        });

        assert_eq!(registry.unregister_domain(DOMAIN), 2);
        assert!(!registry.has_service(DOMAIN, "list_pdfs"));
        assert!(registry.has_service("recorder", "purge"));
        assert_eq!(registry.service_count(), 1);
    }
}
