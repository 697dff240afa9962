//! Receipt rendering
//!
//! [`TypstRenderer`] writes the receipt as a Typst document (an English
//! section followed by a right-to-left Arabic section) into a temporary
//! directory and compiles it with the `typst` CLI. Fonts are loaded only
//! from the configured font directory, so they are checked up front by
//! [`ReceiptRenderer::preflight`].

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::billing::{format_amount, Receipt};
use crate::labels::{to_arabic_digits, Labels, ARABIC, ENGLISH};

/// Errors that can occur while rendering a receipt
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(
        "font file {} is missing; copy '{file}' into {} or point sensor_pdf_generator.font_dir at a directory that has it",
        path.display(),
        font_dir.display()
    )]
    MissingFont {
        file: String,
        path: PathBuf,
        font_dir: PathBuf,
    },

    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("failed to write Typst source: {0}")]
    WriteTypst(#[source] std::io::Error),

    #[error(
        "typst executable '{}' not found; install Typst or set sensor_pdf_generator.typst_binary",
        binary.display()
    )]
    TypstNotFound { binary: PathBuf },

    #[error("Typst CLI execution failed: {0}")]
    TypstIo(#[source] std::io::Error),

    #[error("Typst CLI exited with status {code:?}: {stderr}")]
    TypstExit { code: Option<i32>, stderr: String },

    #[error("failed to write PDF to {}: {source}", path.display())]
    WritePdf {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a receipt into a PDF file
#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    /// Check external assets once before a batch; errors abort the whole request
    async fn preflight(&self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Render `receipt` into a PDF at `output`
    async fn render(&self, receipt: &Receipt, output: &Path) -> Result<(), RenderError>;
}

/// Renders receipts with the Typst CLI
#[derive(Debug, Clone)]
pub struct TypstRenderer {
    binary: PathBuf,
    font_dir: PathBuf,
    fonts: Vec<String>,
}

impl TypstRenderer {
    pub fn new(binary: impl Into<PathBuf>, font_dir: impl Into<PathBuf>, fonts: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            font_dir: font_dir.into(),
            fonts,
        }
    }

    pub fn font_dir(&self) -> &Path {
        &self.font_dir
    }
}

#[async_trait]
impl ReceiptRenderer for TypstRenderer {
    async fn preflight(&self) -> Result<(), RenderError> {
        for file in &self.fonts {
            let path = self.font_dir.join(file);
            let present = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !present {
                return Err(RenderError::MissingFont {
                    file: file.clone(),
                    path,
                    font_dir: self.font_dir.clone(),
                });
            }
        }
        Ok(())
    }

    #[instrument(skip(self, receipt), fields(report_id = %receipt.report_id))]
    async fn render(&self, receipt: &Receipt, output: &Path) -> Result<(), RenderError> {
        let workdir = tempfile::tempdir().map_err(RenderError::TempDir)?;
        let source = workdir.path().join("receipt.typ");
        let pdf = workdir.path().join("receipt.pdf");

        tokio::fs::write(&source, typst_document(receipt))
            .await
            .map_err(RenderError::WriteTypst)?;

        debug!(binary = %self.binary.display(), "Compiling receipt");
        let result = Command::new(&self.binary)
            .arg("compile")
            .arg("--font-path")
            .arg(&self.font_dir)
            .arg(&source)
            .arg(&pdf)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RenderError::TypstNotFound {
                    binary: self.binary.clone(),
                },
                _ => RenderError::TypstIo(e),
            })?;

        if !result.status.success() {
            return Err(RenderError::TypstExit {
                code: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        tokio::fs::copy(&pdf, output)
            .await
            .map_err(|e| RenderError::WritePdf {
                path: output.to_path_buf(),
                source: e,
            })?;
        Ok(())
    }
}

/// Quote a value as a Typst string literal
fn typst_str(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// One receipt section; `digits` localizes numbers
fn section(receipt: &Receipt, labels: &Labels, digits: fn(&str) -> String) -> String {
    let period = format!(
        "{} {} {}",
        digits(&receipt.period.start_date.to_string()),
        labels.period_to,
        digits(&receipt.period.end_date.to_string())
    );
    let reading = |value: f64| format!("{} {}", digits(&format_amount(value)), receipt.unit);
    let money = |value: f64| format!("{} {}", digits(&format_amount(value)), receipt.currency);

    let rows = [
        (labels.site, receipt.site_name.clone()),
        (labels.report_id, receipt.report_id.clone()),
        (
            labels.generated_at,
            digits(&receipt.generated_at.format("%Y-%m-%d %H:%M").to_string()),
        ),
        (labels.meter, receipt.entity_label.clone()),
        (labels.period, period),
        (labels.previous_reading, reading(receipt.start_value)),
        (labels.current_reading, reading(receipt.total_value)),
        (labels.consumption, reading(receipt.used_value)),
        (labels.fixed_charge, money(receipt.fixed_charge)),
        (
            labels.rate,
            format!("{} / {}", money(receipt.rate), receipt.unit),
        ),
    ];

    let mut out = String::new();
    out.push_str(&format!(
        "#align(center)[#text(size: 14pt, weight: \"bold\")[#{}]]\n",
        typst_str(labels.title)
    ));
    out.push_str("#table(columns: (1fr, 1fr), stroke: 0.4pt, inset: 6pt,\n");
    for (label, value) in rows {
        out.push_str(&format!(
            "  [#{}], [#{}],\n",
            typst_str(label),
            typst_str(&value)
        ));
    }
    out.push_str(&format!(
        "  table.cell(fill: luma(230))[*#{}*], table.cell(fill: luma(230))[*#{}*],\n",
        typst_str(labels.total),
        typst_str(&money(receipt.total_cost))
    ));
    out.push_str(")\n");
    out
}

fn plain_digits(text: &str) -> String {
    text.to_string()
}

/// Typst source for a receipt
pub fn typst_document(receipt: &Receipt) -> String {
    let mut doc = String::new();
    doc.push_str("#set page(paper: \"a5\", margin: 1.4cm)\n");
    doc.push_str("#set text(font: (\"Noto Sans\", \"Noto Naskh Arabic\"), size: 9.5pt)\n\n");
    doc.push_str(&section(receipt, &ENGLISH, plain_digits));
    doc.push_str("\n#v(1.2em)\n#line(length: 100%, stroke: 0.6pt)\n#v(1.2em)\n\n");
    doc.push_str("#[\n#set text(dir: rtl, lang: \"ar\", font: (\"Noto Naskh Arabic\", \"Noto Sans\"))\n");
    doc.push_str(&section(receipt, &ARABIC, to_arabic_digits));
    doc.push_str("]\n");
    doc
}
