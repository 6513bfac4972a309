use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized image coordinates (0.0–1.0).
///
/// `y` grows toward the top of the image, so `(x, y)` is the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// One span of recognized text as reported by an OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    #[serde(rename = "boundingBox", alias = "bounding_box")]
    pub bounding_box: BoundingBox,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self { text: text.into(), bounding_box }
    }

    /// Fragment anchored at `(x, y)` with a nominal size, handy for fixtures.
    pub fn at(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self::new(text, BoundingBox::new(x, y, 0.1, 0.02))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Normal,
    Subtotal,
    Total,
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineKind::Normal => write!(f, "normal"),
            LineKind::Subtotal => write!(f, "subtotal"),
            LineKind::Total => write!(f, "total"),
        }
    }
}

/// A logical line annotated with its kind and label-stripped text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedLine {
    /// The line exactly as it came in.
    pub original: String,
    /// Label removed, trimmed.
    pub text: String,
    pub kind: LineKind,
}

/// Fields derived from an ordered line sequence. Absent means "not found",
/// never zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub store_name: String,
    pub date: Option<NaiveDate>,
    pub subtotal: Option<String>,
    pub tax: Option<String>,
    pub total: Option<String>,
}
