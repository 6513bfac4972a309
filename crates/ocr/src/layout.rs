use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::TextFragment;

/// Maximum distance (fraction of image height) between a fragment's anchor and
/// the running mean of the row it joins.
pub const ROW_THRESHOLD: f64 = 0.01;

/// One visual row of the receipt, fragments joined left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalLine {
    pub text: String,
    /// Mean anchor `y` of the fragments in this row.
    pub anchor_y: f64,
    pub fragment_count: usize,
}

struct Anchored<'a> {
    text: &'a str,
    x: f64,
    y: f64,
}

/// Rebuild reading-ordered lines from unordered OCR fragments.
///
/// Rows come out top to bottom, fragments within a row left to right. Blank
/// fragments are the only ones ever dropped.
pub fn assemble(fragments: &[TextFragment]) -> Vec<LogicalLine> {
    let mut items: Vec<Anchored<'_>> = fragments
        .iter()
        .filter_map(|f| {
            let text = f.text.trim();
            (!text.is_empty()).then_some(Anchored {
                text,
                x: f.bounding_box.x,
                y: f.bounding_box.y,
            })
        })
        .collect();

    // Stable sort keeps input order for equal anchors.
    items.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut rows: Vec<Vec<Anchored<'_>>> = Vec::new();
    let mut current: Vec<Anchored<'_>> = Vec::new();
    let mut sum_y = 0.0;

    for item in items {
        if !current.is_empty() {
            let mean_y = sum_y / current.len() as f64;
            if (item.y - mean_y).abs() > ROW_THRESHOLD {
                rows.push(std::mem::take(&mut current));
                sum_y = 0.0;
            }
        }
        sum_y += item.y;
        current.push(item);
    }
    if !current.is_empty() {
        rows.push(current);
    }

    let lines: Vec<LogicalLine> = rows.into_iter().map(into_line).collect();
    debug!(fragments = fragments.len(), lines = lines.len(), "assembled OCR fragments");
    lines
}

/// [`assemble`], keeping only the line text.
pub fn assemble_text(fragments: &[TextFragment]) -> Vec<String> {
    assemble(fragments).into_iter().map(|l| l.text).collect()
}

fn into_line(mut row: Vec<Anchored<'_>>) -> LogicalLine {
    row.sort_by(|a, b| a.x.total_cmp(&b.x));
    let anchor_y = row.iter().map(|a| a.y).sum::<f64>() / row.len() as f64;
    LogicalLine {
        text: row.iter().map(|a| a.text).collect::<Vec<_>>().join(" "),
        anchor_y,
        fragment_count: row.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(text: &str, x: f64, y: f64) -> TextFragment {
        TextFragment::at(text, x, y)
    }

    fn receipt_fragments() -> Vec<TextFragment> {
        vec![
            frag("$1.99", 0.3, 0.40),
            frag("Subtotal", 0.1, 0.50),
            frag("Store A", 0.1, 0.90),
            frag("Total", 0.1, 0.40),
            frag("Item 1 $1.99", 0.1, 0.70),
            frag("$1.99", 0.3, 0.50),
        ]
    }

    #[test]
    fn empty_input_gives_no_lines() {
        assert!(assemble(&[]).is_empty());
    }

    #[test]
    fn blank_fragments_are_dropped() {
        let lines = assemble_text(&[frag("   ", 0.1, 0.5), frag("\n", 0.2, 0.5)]);
        assert!(lines.is_empty());
    }

    #[test]
    fn single_fragment_is_its_own_line() {
        let lines = assemble(&[frag("  Hello ", 0.4, 0.2)]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello");
        assert_eq!(lines[0].fragment_count, 1);
    }

    #[test]
    fn rows_top_to_bottom_and_left_to_right() {
        let lines = assemble_text(&receipt_fragments());
        assert_eq!(
            lines,
            vec!["Store A", "Item 1 $1.99", "Subtotal $1.99", "Total $1.99"]
        );
    }

    #[test]
    fn assembly_is_deterministic() {
        let fragments = receipt_fragments();
        assert_eq!(assemble(&fragments), assemble(&fragments));
    }

    #[test]
    fn small_vertical_jitter_stays_on_one_row() {
        let lines = assemble_text(&[
            frag("Tax", 0.1, 0.503),
            frag("$0.52", 0.7, 0.497),
            frag("Total", 0.1, 0.30),
        ]);
        assert_eq!(lines, vec!["Tax $0.52", "Total"]);
    }

    #[test]
    fn rows_beyond_threshold_split() {
        let lines = assemble_text(&[frag("upper", 0.1, 0.52), frag("lower", 0.1, 0.50)]);
        assert_eq!(lines, vec!["upper", "lower"]);
    }

    #[test]
    fn running_mean_absorbs_slow_drift() {
        // Each step is within the threshold of the row mean, though the last
        // fragment is more than one threshold away from the first.
        let lines = assemble(&[
            frag("a", 0.1, 0.800),
            frag("b", 0.2, 0.792),
            frag("c", 0.3, 0.787),
        ]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "a b c");
    }

    #[test]
    fn duplicate_positions_are_both_kept() {
        let lines = assemble_text(&[frag("one", 0.1, 0.5), frag("two", 0.1, 0.5)]);
        assert_eq!(lines, vec!["one two"]);
    }

    #[test]
    fn larger_y_comes_first_when_far_apart() {
        let fragments = vec![
            frag("bottom", 0.1, 0.1),
            frag("middle", 0.1, 0.5),
            frag("top", 0.1, 0.9),
        ];
        let lines = assemble_text(&fragments);
        assert_eq!(lines, vec!["top", "middle", "bottom"]);
    }

    #[test]
    fn anchor_is_row_mean() {
        let lines = assemble(&[frag("a", 0.1, 0.504), frag("b", 0.2, 0.496)]);
        assert!((lines[0].anchor_y - 0.5).abs() < 1e-9);
    }
}
