//! Receipt captions in English and Arabic

/// Captions for one language section of a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    pub title: &'static str,
    pub site: &'static str,
    pub report_id: &'static str,
    pub generated_at: &'static str,
    pub meter: &'static str,
    pub period: &'static str,
    pub period_to: &'static str,
    pub previous_reading: &'static str,
    pub current_reading: &'static str,
    pub consumption: &'static str,
    pub fixed_charge: &'static str,
    pub rate: &'static str,
    pub total: &'static str,
}

pub const ENGLISH: Labels = Labels {
    title: "Electricity Consumption Receipt",
    site: "Site",
    report_id: "Receipt No.",
    generated_at: "Issued",
    meter: "Meter",
    period: "Billing period",
    period_to: "to",
    previous_reading: "Previous reading",
    current_reading: "Current reading",
    consumption: "Consumption",
    fixed_charge: "Fixed charge",
    rate: "Rate per unit",
    total: "Total due",
};

pub const ARABIC: Labels = Labels {
    title: "إيصال استهلاك الكهرباء",
    site: "الموقع",
    report_id: "رقم الإيصال",
    generated_at: "تاريخ الإصدار",
    meter: "العداد",
    period: "فترة الفاتورة",
    period_to: "إلى",
    previous_reading: "القراءة السابقة",
    current_reading: "القراءة الحالية",
    consumption: "الاستهلاك",
    fixed_charge: "الرسوم الثابتة",
    rate: "سعر الوحدة",
    total: "المبلغ المستحق",
};

/// Replace ASCII digits with Eastern Arabic digits and the decimal point
/// with the Arabic decimal separator
pub fn to_arabic_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '0'..='9' => char::from_u32('\u{0660}' as u32 + (c as u32 - '0' as u32)).unwrap_or(c),
            '.' => '\u{066B}',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arabic_digits() {
        assert_eq!(to_arabic_digits("2025-08-31"), "٢٠٢٥-٠٨-٣١");
        assert_eq!(to_arabic_digits("150.75"), "١٥٠٫٧٥");
        assert_eq!(to_arabic_digits("RCPT-202508"), "RCPT-٢٠٢٥٠٨");
    }
}
