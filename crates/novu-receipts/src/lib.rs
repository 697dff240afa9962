//! Sensor PDF receipts for the Novu hub
//!
//! The `sensor_pdf_generator` integration bills cumulative energy meters.
//! For each requested meter it resolves the readings at both ends of a
//! billing period from recorded history, prices the consumption with a
//! [`Tariff`], and renders a bilingual (English and Arabic) PDF receipt into
//! the report directory under the media root.
//!
//! ## Services
//! - `sensor_pdf_generator.generate_pdf`: render receipts for one or more meters
//! - `sensor_pdf_generator.list_pdfs`: list stored receipts
//! - `sensor_pdf_generator.delete_pdf`: delete a stored receipt
//! - `sensor_pdf_generator.list_meters`: list meters found among sensor entities
//!
//! ## Events
//! - `pdf_generator_complete`: fired once per meter after each generate_pdf attempt

mod billing;
mod config;
mod discovery;
mod error;
mod events;
mod generator;
mod labels;
mod naming;
mod render;
mod request;
mod services;
mod store;

/// Domain of the integration's services and configuration section
pub const DOMAIN: &str = "sensor_pdf_generator";

pub use billing::{format_amount, new_report_id, Receipt, ReceiptHeader, Tariff};
pub use config::{ReceiptsConfig, MAX_LOOKBACK_DAYS};
pub use discovery::{clean_display_name, discover_meters, entity_label, Meter, METER_KINDS};
pub use error::{ReceiptError, ReceiptResult};
pub use events::{PdfGeneratorCompleteData, PDF_GENERATOR_COMPLETE};
pub use generator::{GenerateResponse, GeneratedReport, ReceiptGenerator, SiteInfo};
pub use labels::{to_arabic_digits, Labels, ARABIC, ENGLISH};
pub use naming::{report_filename, sanitize_label, validate_pdf_name};
pub use render::{typst_document, ReceiptRenderer, RenderError, TypstRenderer};
pub use request::{DeleteRequest, GenerateRequest};
pub use services::{
    register_services, unregister_services, SERVICE_DELETE_PDF, SERVICE_GENERATE_PDF,
    SERVICE_LIST_METERS, SERVICE_LIST_PDFS,
};
pub use store::ReportStore;
