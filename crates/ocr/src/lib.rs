pub mod display;
pub mod extract;
pub mod layout;
pub mod pipeline;
pub mod recognizer;
pub mod types;

pub use display::{
    extract_currency_token, summary_total, FieldSource, ReceiptView, ResolvedField,
    MISSING_PLACEHOLDER,
};
pub use extract::{classify, extract_date, extract_fields, normalize_amount, strip_label, type_lines};
pub use layout::{assemble, assemble_text, LogicalLine, ROW_THRESHOLD};
pub use pipeline::{process_fragments, process_lines, PipelineError, ReceiptPipeline, ScanResult};
pub use recognizer::{JsonFragmentBackend, MockRecognizer, OcrBackend, OcrError};
pub use types::{BoundingBox, ExtractedFields, LineKind, TextFragment, TypedLine};
