use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tally_core::{Receipt, ReceiptId, DEFAULT_TITLE};

use crate::extract::{amount_candidates, classify, extract_fields, strip_label, type_lines};
use crate::types::{LineKind, TypedLine};

/// Shown in place of an amount that was neither edited nor extracted.
pub const MISSING_PLACEHOLDER: &str = "Not found";

fn re_currency_token() -> Option<&'static Regex> {
    static R: OnceLock<Option<Regex>> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\$?\d+(?:\.\d{2})?").ok()).as_ref()
}

/// Coarse amount for one-line summaries.
///
/// Takes the last `$12.34`-shaped token of the whitespace-free line. Without
/// one, falls back to the line with its total/balance label and leading
/// punctuation removed. `None` when nothing is left.
pub fn extract_currency_token(line: &str) -> Option<String> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(m) = re_currency_token().and_then(|re| re.find_iter(&compact).last()) {
        return Some(m.as_str().trim_start_matches('$').to_string());
    }

    let stripped = strip_label(line, LineKind::Total);
    let rest = stripped
        .trim_start_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    (!rest.is_empty()).then_some(rest)
}

/// The amount for a receipt's list row: the last total-kind line, coarsely parsed.
pub fn summary_total<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| classify(l) == LineKind::Total)
        .last()
        .and_then(extract_currency_token)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Edited,
    Extracted,
    Fallback,
    Missing,
}

/// A display value together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub value: Option<String>,
    pub source: FieldSource,
}

impl ResolvedField {
    /// Edit beats extraction; neither means missing.
    ///
    /// `edited` is taken as stored: blank overrides never survive
    /// [`tally_core::ReceiptEdits::canonicalized`].
    pub fn resolve(edited: Option<&str>, extracted: Option<&str>) -> Self {
        match (edited, extracted) {
            (Some(v), _) => Self { value: Some(v.to_string()), source: FieldSource::Edited },
            (None, Some(v)) => Self { value: Some(v.to_string()), source: FieldSource::Extracted },
            (None, None) => Self { value: None, source: FieldSource::Missing },
        }
    }

    pub fn display(&self, placeholder: &str) -> String {
        self.value.clone().unwrap_or_else(|| placeholder.to_string())
    }
}

/// Everything the presentation layer needs for one receipt.
///
/// Built fresh from the receipt; resolving never touches `lines`.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptView {
    pub id: ReceiptId,
    pub store_name: ResolvedField,
    pub date: NaiveDate,
    pub date_source: FieldSource,
    pub subtotal: ResolvedField,
    pub tax: ResolvedField,
    pub total: ResolvedField,
    pub is_edited: bool,
    pub lines: Vec<String>,
    pub typed_lines: Vec<TypedLine>,
    pub subtotal_candidates: Vec<String>,
    pub total_candidates: Vec<String>,
}

impl ReceiptView {
    pub fn resolve(receipt: &Receipt) -> Self {
        let lines = receipt.lines();
        let edits = receipt.edits();
        let fields = extract_fields(lines);
        let typed_lines = type_lines(lines);

        // Extraction always yields a store name; without any text it is only the default title.
        let has_text = lines.iter().any(|l| !l.trim().is_empty());
        let store_name = match edits.store_name.as_deref() {
            None if !has_text => ResolvedField {
                value: Some(DEFAULT_TITLE.to_string()),
                source: FieldSource::Fallback,
            },
            edited => ResolvedField::resolve(edited, Some(fields.store_name.as_str())),
        };
        let (date, date_source) = match (edits.date, fields.date) {
            (Some(d), _) => (d, FieldSource::Edited),
            (None, Some(d)) => (d, FieldSource::Extracted),
            (None, None) => (receipt.created_at().date_naive(), FieldSource::Fallback),
        };

        ReceiptView {
            id: receipt.id(),
            store_name,
            date,
            date_source,
            subtotal: ResolvedField::resolve(edits.subtotal.as_deref(), fields.subtotal.as_deref()),
            tax: ResolvedField::resolve(edits.tax.as_deref(), fields.tax.as_deref()),
            total: ResolvedField::resolve(edits.total.as_deref(), fields.total.as_deref()),
            is_edited: receipt.is_edited(),
            lines: lines.to_vec(),
            subtotal_candidates: amount_candidates(&typed_lines, LineKind::Subtotal),
            total_candidates: amount_candidates(&typed_lines, LineKind::Total),
            typed_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ReceiptEdits;

    fn receipt(lines: &[&str]) -> Receipt {
        Receipt::from_lines(lines.iter().copied()).unwrap()
    }

    // ── Currency token ────────────────────────────────────────────────────────

    #[test]
    fn currency_token_takes_last_match() {
        assert_eq!(extract_currency_token("Total    $5.48").as_deref(), Some("5.48"));
        assert_eq!(extract_currency_token("Total 2 items $ 12.00").as_deref(), Some("12.00"));
    }

    #[test]
    fn currency_token_closes_ocr_gaps() {
        assert_eq!(extract_currency_token("TOTAL $7. 02").as_deref(), Some("7.02"));
    }

    #[test]
    fn currency_token_without_decimals() {
        assert_eq!(extract_currency_token("Total $12").as_deref(), Some("12"));
    }

    #[test]
    fn currency_token_comma_amount_differs_from_normalizer() {
        // Coarser than `normalize_amount`, which would yield "12.50".
        assert_eq!(extract_currency_token("Total 12,50").as_deref(), Some("50"));
    }

    #[test]
    fn currency_token_falls_back_to_label_stripped_text() {
        assert_eq!(extract_currency_token("Total: due   now").as_deref(), Some("due now"));
        assert_eq!(extract_currency_token("Total"), None);
        assert_eq!(extract_currency_token("   "), None);
    }

    #[test]
    fn summary_total_ignores_subtotal() {
        let lines = ["Store", "Subtotal $5.00", "Total $5.48", "Sub-total $9.99"];
        assert_eq!(summary_total(&lines).as_deref(), Some("5.48"));
    }

    #[test]
    fn summary_total_absent_without_total_line() {
        assert_eq!(summary_total(&["Store", "Item $1.00"]), None);
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    #[test]
    fn edit_overrides_extraction_and_clearing_reverts() {
        let mut r = receipt(&["Store A", "Subtotal $5.48", "Total $5.48"]);
        r.update_edits(ReceiptEdits { total: Some("9.99".to_string()), ..Default::default() });

        let view = ReceiptView::resolve(&r);
        assert_eq!(view.total.value.as_deref(), Some("9.99"));
        assert_eq!(view.total.source, FieldSource::Edited);
        assert!(view.is_edited);

        r.clear_edits();
        let view = ReceiptView::resolve(&r);
        assert_eq!(view.total.value.as_deref(), Some("5.48"));
        assert_eq!(view.total.source, FieldSource::Extracted);
        assert!(!view.is_edited);
    }

    #[test]
    fn missing_amounts_use_placeholder() {
        let view = ReceiptView::resolve(&receipt(&["Store A", "Thanks"]));
        assert_eq!(view.tax.source, FieldSource::Missing);
        assert_eq!(view.tax.display(MISSING_PLACEHOLDER), MISSING_PLACEHOLDER);
    }

    #[test]
    fn date_falls_back_to_creation_day() {
        let r = receipt(&["Store A"]);
        let view = ReceiptView::resolve(&r);
        assert_eq!(view.date, r.created_at().date_naive());
        assert_eq!(view.date_source, FieldSource::Fallback);
    }

    #[test]
    fn edited_date_beats_extracted_date() {
        let mut r = receipt(&["Store A", "2024-03-15"]);
        assert_eq!(ReceiptView::resolve(&r).date_source, FieldSource::Extracted);

        let edited = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        r.update_edits(ReceiptEdits { date: Some(edited), ..Default::default() });
        let view = ReceiptView::resolve(&r);
        assert_eq!(view.date, edited);
        assert_eq!(view.date_source, FieldSource::Edited);
    }

    #[test]
    fn store_name_edit_wins() {
        let mut r = receipt(&["STORE A #123"]);
        r.update_edits(ReceiptEdits { store_name: Some("Store A".to_string()), ..Default::default() });
        assert_eq!(ReceiptView::resolve(&r).store_name.value.as_deref(), Some("Store A"));
    }

    #[test]
    fn store_name_without_text_is_a_fallback() {
        let view = ReceiptView::resolve(&Receipt::new(vec!["   ".to_string()]));
        assert_eq!(view.store_name.value.as_deref(), Some(DEFAULT_TITLE));
        assert_eq!(view.store_name.source, FieldSource::Fallback);

        let view = ReceiptView::resolve(&receipt(&["Corner Deli"]));
        assert_eq!(view.store_name.value.as_deref(), Some("Corner Deli"));
        assert_eq!(view.store_name.source, FieldSource::Extracted);
    }

    #[test]
    fn blank_store_edit_leaves_extracted_name() {
        let mut r = receipt(&["Corner Deli"]);
        r.update_edits(ReceiptEdits { store_name: Some("  ".to_string()), ..Default::default() });
        let view = ReceiptView::resolve(&r);
        assert_eq!(view.store_name.value.as_deref(), Some("Corner Deli"));
        assert_eq!(view.store_name.source, FieldSource::Extracted);
    }

    #[test]
    fn resolving_leaves_lines_untouched() {
        let mut r = receipt(&["Store A", "Total $1.99"]);
        r.update_edits(ReceiptEdits { total: Some("2.50".to_string()), ..Default::default() });
        let before = r.lines().to_vec();
        let view = ReceiptView::resolve(&r);
        assert_eq!(view.lines, before);
        assert_eq!(r.lines(), before.as_slice());
        assert_eq!(view.typed_lines[1].text, "$1.99");
    }

    #[test]
    fn candidates_listed_for_detail_view() {
        let view = ReceiptView::resolve(&receipt(&["S", "Subtotal 1.00", "Subtotal 2.00", "Total 2.20"]));
        assert_eq!(view.subtotal_candidates, vec!["1.00", "2.00"]);
        assert_eq!(view.total_candidates, vec!["2.20"]);
    }
}
