//! Service registration for the `sensor_pdf_generator` domain

use novu_core::{ServiceCall, SupportsResponse};
use novu_service_registry::{ServiceDescription, ServiceError, ServiceRegistry};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::generator::ReceiptGenerator;
use crate::request::{DeleteRequest, GenerateRequest};
use crate::DOMAIN;

pub const SERVICE_GENERATE_PDF: &str = "generate_pdf";
pub const SERVICE_LIST_PDFS: &str = "list_pdfs";
pub const SERVICE_DELETE_PDF: &str = "delete_pdf";
pub const SERVICE_LIST_METERS: &str = "list_meters";

/// Register every service of the domain
pub fn register_services(services: &ServiceRegistry, generator: Arc<ReceiptGenerator>) {
    let handle = generator.clone();
    services.register(
        ServiceDescription::new(DOMAIN, SERVICE_GENERATE_PDF)
            .with_name("Generate PDF receipts")
            .with_description("Render a consumption receipt for each meter over a billing period")
            .with_field(
                "entity_id",
                "Total energy sensor, or a list of them",
                true,
                Some(json!("sensor.unit_1_total_energy")),
            )
            .with_field("month", "Billing month (1-12), together with year", false, Some(json!(8)))
            .with_field("year", "Billing year, together with month", false, Some(json!(2025)))
            .with_field("start_date", "First day, YYYY-MM-DD", false, Some(json!("2025-08-01")))
            .with_field("end_date", "Last day, YYYY-MM-DD", false, Some(json!("2025-08-31")))
            .with_field("fixed_charge", "Fixed charge override", false, None)
            .with_field("rate", "Price per unit override", false, None)
            .with_response(SupportsResponse::Optional),
        move |call: ServiceCall| {
            let generator = handle.clone();
            async move {
                let request: GenerateRequest = call.parse_data().map_err(ServiceError::invalid)?;
                let response = generator.generate(request, &call.context).await?;
                let body = serde_json::to_value(response).map_err(ServiceError::failed)?;
                Ok::<_, ServiceError>(Some(body))
            }
        },
    );

    let handle = generator.clone();
    services.register(
        ServiceDescription::new(DOMAIN, SERVICE_LIST_PDFS)
            .with_name("List PDF receipts")
            .with_description("List the stored receipt files")
            .with_response(SupportsResponse::Only),
        move |_call: ServiceCall| {
            let generator = handle.clone();
            async move {
                let names = generator.list_pdfs().await?;
                Ok::<_, ServiceError>(Some(json!({ "pdf_files": names })))
            }
        },
    );

    let handle = generator.clone();
    services.register(
        ServiceDescription::new(DOMAIN, SERVICE_DELETE_PDF)
            .with_name("Delete PDF receipt")
            .with_description("Delete one stored receipt file")
            .with_field("filename", "Receipt file name", true, Some(json!("receipt.pdf"))),
        move |call: ServiceCall| {
            let generator = handle.clone();
            async move {
                let request: DeleteRequest = call.parse_data().map_err(ServiceError::invalid)?;
                generator.delete_pdf(&request.filename).await?;
                Ok::<_, ServiceError>(None)
            }
        },
    );

    let handle = generator;
    services.register(
        ServiceDescription::new(DOMAIN, SERVICE_LIST_METERS)
            .with_name("List meters")
            .with_description("List meters found among the sensor entities")
            .with_response(SupportsResponse::Only),
        move |_call: ServiceCall| {
            let generator = handle.clone();
            async move {
                let meters = generator.list_meters();
                Ok(Some(json!({ "meters": meters })))
            }
        },
    );

    info!(domain = DOMAIN, "Receipt services registered");
}

/// Remove every service of the domain
pub fn unregister_services(services: &ServiceRegistry) -> usize {
    let count = services.unregister_domain(DOMAIN);
    info!(domain = DOMAIN, count, "Receipt services unregistered");
    count
}
