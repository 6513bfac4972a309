use thiserror::Error;

use crate::types::TextFragment;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Malformed fragment data: {0}")]
    Fragments(#[from] serde_json::Error),
}

/// Abstraction over an OCR provider.
/// Implementations accept raw image bytes and return positioned text fragments
/// in no particular order.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<TextFragment>, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set fragment list regardless of the image.
pub struct MockRecognizer {
    pub fragments: Vec<TextFragment>,
}

impl MockRecognizer {
    pub fn new(fragments: Vec<TextFragment>) -> Self {
        Self { fragments }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<Vec<TextFragment>, OcrError> {
        Ok(self.fragments.clone())
    }
}

// ── JSON backend ──────────────────────────────────────────────────────────────

/// Reads fragments already produced by an external OCR engine, serialized as a
/// JSON array of `{"text": .., "boundingBox": {"x", "y", "width", "height"}}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFragmentBackend;

impl OcrBackend for JsonFragmentBackend {
    fn recognize(&self, image_bytes: &[u8]) -> Result<Vec<TextFragment>, OcrError> {
        Ok(serde_json::from_slice(image_bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_fragments() {
        let r = MockRecognizer::new(vec![TextFragment::at("STARBUCKS", 0.1, 0.9)]);
        let out = r.recognize(b"fake image data").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "STARBUCKS");
    }

    #[test]
    fn mock_ignores_image_content() {
        let r = MockRecognizer::new(vec![]);
        assert!(r.recognize(b"anything").unwrap().is_empty());
        assert!(r.recognize(b"").unwrap().is_empty());
    }

    #[test]
    fn json_backend_decodes_fragments() {
        let data = br#"[
            {"text": "Total", "boundingBox": {"x": 0.1, "y": 0.4, "width": 0.2, "height": 0.03}},
            {"text": "$1.99", "boundingBox": {"x": 0.3, "y": 0.4, "width": 0.2, "height": 0.03}}
        ]"#;
        let out = JsonFragmentBackend.recognize(data).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].text, "$1.99");
    }

    #[test]
    fn json_backend_rejects_garbage() {
        assert!(matches!(
            JsonFragmentBackend.recognize(b"\x89PNG"),
            Err(OcrError::Fragments(_))
        ));
    }

    #[test]
    fn fragment_error_describes_bad_input() {
        let err = JsonFragmentBackend.recognize(b"{").unwrap_err();
        assert!(err.to_string().starts_with("Malformed fragment data"));
    }
}
