use std::path::Path;
use tally_core::Receipt;
use thiserror::Error;
use tracing::debug;

use crate::extract::extract_fields;
use crate::layout;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{ExtractedFields, TextFragment};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("No text recognized")]
    NoText,
}

/// The result of a single receipt processing run.
#[derive(Debug)]
pub struct ScanResult {
    /// The new receipt; its lines are the assembled OCR rows.
    pub receipt: Receipt,
    /// Fields extracted from those lines at scan time.
    pub extracted: ExtractedFields,
}

/// Orchestrates: recognize → assemble lines → build receipt → extract.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R) -> Self {
        Self { recognizer }
    }

    /// Process a file on disk.
    pub async fn process_file(&self, path: &Path) -> Result<ScanResult, PipelineError> {
        let bytes = tokio::fs::read(path).await?;
        self.process_bytes(&bytes)
    }

    /// Process raw bytes (from camera capture or file read).
    pub fn process_bytes(&self, data: &[u8]) -> Result<ScanResult, PipelineError> {
        let fragments = self.recognizer.recognize(data)?;
        process_fragments(&fragments)
    }
}

/// Turn already-recognized fragments into a receipt.
pub fn process_fragments(fragments: &[TextFragment]) -> Result<ScanResult, PipelineError> {
    let lines = layout::assemble_text(fragments);
    process_lines(lines)
}

/// Manual entry: lines are taken in the given order, skipping assembly.
pub fn process_lines<I, S>(lines: I) -> Result<ScanResult, PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let receipt = Receipt::from_lines(lines).ok_or(PipelineError::NoText)?;
    let extracted = extract_fields(receipt.lines());
    debug!(id = %receipt.id(), lines = receipt.lines().len(), "built receipt");
    Ok(ScanResult { receipt, extracted })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
