//! Report file names

use novu_energy::Period;

use crate::{ReceiptError, ReceiptResult};

/// Label used when nothing of the original survives sanitizing
const EMPTY_LABEL: &str = "meter";

/// Make a label safe for a file name
///
/// Keeps alphanumerics, spaces, hyphens and underscores, trims the result
/// and replaces spaces with underscores.
pub fn sanitize_label(label: &str) -> String {
    let kept: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let sanitized = kept.trim().replace(' ', "_");
    if sanitized.is_empty() {
        EMPTY_LABEL.to_string()
    } else {
        sanitized
    }
}

/// `{prefix}_{sanitized_label}_{YYYYMMDD}_{YYYYMMDD}.pdf`
pub fn report_filename(prefix: &str, label: &str, period: &Period) -> String {
    format!(
        "{}_{}_{}_{}.pdf",
        prefix,
        sanitize_label(label),
        period.start_stamp(),
        period.end_stamp()
    )
}

/// Accept only a bare `.pdf` file name inside the report directory
pub fn validate_pdf_name(name: &str) -> ReceiptResult<&str> {
    let invalid = |reason| ReceiptError::InvalidFilename {
        name: name.to_string(),
        reason,
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(invalid("path separators are not allowed"));
    }
    if name.contains("..") {
        return Err(invalid("'..' is not allowed"));
    }
    if !name.to_ascii_lowercase().ends_with(".pdf") || name.len() == ".pdf".len() {
        return Err(invalid("only .pdf files can be managed"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Meter #1 (kWh)"), "Meter_1_kWh");
        assert_eq!(sanitize_label("Unit 4"), "Unit_4");
        assert_eq!(sanitize_label("flat-2_b"), "flat-2_b");
        assert_eq!(sanitize_label("  spaced  out "), "spaced__out");
        assert_eq!(sanitize_label("عداد 3"), "عداد_3");
        assert_eq!(sanitize_label("#()"), "meter");
    }

    #[test]
    fn test_report_filename() {
        let period = Period::month(2025, 8, Tz::UTC).unwrap();
        assert_eq!(
            report_filename("receipt", "Meter #1 (kWh)", &period),
            "receipt_Meter_1_kWh_20250801_20250831.pdf"
        );
    }

    #[test]
    fn test_validate_pdf_name() {
        assert_eq!(validate_pdf_name("receipt_a.pdf").unwrap(), "receipt_a.pdf");
        assert_eq!(validate_pdf_name("REPORT.PDF").unwrap(), "REPORT.PDF");

        for bad in ["", "../x.pdf", "a/b.pdf", "a\\b.pdf", "x..pdf", "notes.txt", ".pdf"] {
            assert!(
                matches!(validate_pdf_name(bad), Err(ReceiptError::InvalidFilename { .. })),
                "{bad} should be rejected"
            );
        }
    }
}
