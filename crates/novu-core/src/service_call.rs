//! Service call type and payload helpers

use crate::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A request to run a named service
///
/// Services are addressed by `domain.service` and receive free-form JSON
/// data. Handlers turn `service_data` into a typed request with
/// [`ServiceCall::parse_data`] before doing any work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    /// The domain the service belongs to (e.g., "sensor_pdf_generator")
    pub domain: String,

    /// The service name (e.g., "generate_pdf")
    pub service: String,

    /// Data passed to the service
    pub service_data: serde_json::Value,

    /// Context tracking who initiated this call
    pub context: Context,
}

impl ServiceCall {
    /// Create a new service call
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
        context: Context,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
            context,
        }
    }

    /// Full service identifier (domain.service)
    pub fn service_id(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Get a single value from service_data
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.service_data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Deserialize the whole payload into a typed request
    ///
    /// A null payload is treated as an empty object so requests made of
    /// optional fields parse from a bare call.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.service_data {
            serde_json::Value::Null => serde_json::from_value(serde_json::json!({})),
            data => serde_json::from_value(data.clone()),
        }
    }
}

/// One entity id or a list of them, as accepted in service payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityTarget {
    One(String),
    Many(Vec<String>),
}

impl EntityTarget {
    /// Normalize to a list, trimming entries and dropping empty ones
    pub fn into_vec(self) -> Vec<String> {
        let ids = match self {
            EntityTarget::One(id) => vec![id],
            EntityTarget::Many(ids) => ids,
        };
        ids.into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

/// Whether a service returns a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportsResponse {
    /// Service never returns a response
    #[default]
    None,
    /// Service may optionally return a response
    Optional,
    /// Service always returns a response
    Only,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Payload {
        entity_id: EntityTarget,
        #[serde(default)]
        month: Option<u32>,
    }

    #[test]
    fn test_service_id() {
        let call = ServiceCall::new("sensor_pdf_generator", "list_pdfs", json!({}), Context::new());
        assert_eq!(call.service_id(), "sensor_pdf_generator.list_pdfs");
    }

    #[test]
    fn test_get_service_data() {
        let call = ServiceCall::new(
            "sensor_pdf_generator",
            "generate_pdf",
            json!({"month": 8, "rate": 0.18}),
            Context::new(),
        );

        assert_eq!(call.get::<u32>("month"), Some(8));
        assert_eq!(call.get::<f64>("rate"), Some(0.18));
        assert_eq!(call.get::<String>("missing"), None);
    }

    #[test]
    fn test_entity_target_single() {
        let call = ServiceCall::new(
            "sensor_pdf_generator",
            "generate_pdf",
            json!({"entity_id": "sensor.unit_1_total_energy"}),
            Context::new(),
        );

        let payload: Payload = call.parse_data().unwrap();
        assert_eq!(
            payload.entity_id.into_vec(),
            vec!["sensor.unit_1_total_energy"]
        );
        assert_eq!(payload.month, None);
    }

    #[test]
    fn test_entity_target_list() {
        let target: EntityTarget =
            serde_json::from_value(json!(["sensor.a", " ", "sensor.b "])).unwrap();
        assert_eq!(target.into_vec(), vec!["sensor.a", "sensor.b"]);
    }

    #[test]
    fn test_parse_null_payload() {
        #[derive(Deserialize)]
        struct Empty {
            #[serde(default)]
            filename: Option<String>,
        }

        let call = ServiceCall::new("d", "s", serde_json::Value::Null, Context::new());
        let parsed: Empty = call.parse_data().unwrap();
        assert!(parsed.filename.is_none());
    }

    #[test]
    fn test_supports_response_default() {
        assert_eq!(SupportsResponse::default(), SupportsResponse::None);
    }
}
