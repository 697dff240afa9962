//! Events fired by the receipts integration

use novu_core::EventData;
use serde::{Deserialize, Serialize};

/// Fired once per entity after a generate_pdf attempt
pub const PDF_GENERATOR_COMPLETE: &str = "pdf_generator_complete";

/// Data for PDF_GENERATOR_COMPLETE events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfGeneratorCompleteData {
    pub success: bool,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PdfGeneratorCompleteData {
    pub fn generated(entity_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            success: true,
            entity_id: entity_id.into(),
            filename: Some(filename.into()),
            error: None,
        }
    }

    pub fn failed(entity_id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            success: false,
            entity_id: entity_id.into(),
            filename: None,
            error: Some(error.to_string()),
        }
    }
}

impl EventData for PdfGeneratorCompleteData {
    fn event_type() -> &'static str {
        PDF_GENERATOR_COMPLETE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let ok = PdfGeneratorCompleteData::generated("sensor.a", "r.pdf");
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "entity_id": "sensor.a", "filename": "r.pdf"})
        );

        let failed = PdfGeneratorCompleteData::failed("sensor.b", "no data");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"success": false, "entity_id": "sensor.b", "error": "no data"})
        );
    }
}
