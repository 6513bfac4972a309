use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use tally_core::title_from_lines;
use tracing::{debug, warn};

use crate::types::{ExtractedFields, LineKind, TypedLine};

// ── Compiled regex cache ─────────────────────────────────────────────────────

// A pattern that fails to compile is cached as `None`; callers degrade instead
// of panicking.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> Option<&'static Regex> {
            static R: OnceLock<Option<Regex>> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).ok()).as_ref()
        }
    };
}

re!(re_subtotal_label, r"(?i)^\s*sub[\s-]*total\s*[:=\-]?\s*");
re!(re_total_label, r"(?i)^\s*(?:total|balance)\s*[:=\-]?\s*");

re!(re_date_slash, r"\b\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})\b");
re!(re_date_dash, r"\b\d{1,2}-\d{1,2}-(?:\d{4}|\d{2})\b");
re!(re_date_iso, r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b");
re!(re_date_month_name,
    r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\b");

// ── Classification ────────────────────────────────────────────────────────────

/// Lowercase with spaces and hyphens removed, so "Sub-Total" matches "subtotal".
pub fn match_key(line: &str) -> String {
    line.to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Classify a line. "subtotal" is tested before "total" because it contains it.
pub fn classify(line: &str) -> LineKind {
    let key = match_key(line);
    if key.contains("subtotal") {
        LineKind::Subtotal
    } else if key.contains("total") || key.contains("balance") {
        LineKind::Total
    } else {
        LineKind::Normal
    }
}

// ── Label stripping ───────────────────────────────────────────────────────────

/// Remove the leading "subtotal"/"total"/"balance" label for the given kind.
/// Never fails: without a label match the trimmed line comes back unchanged.
pub fn strip_label(line: &str, kind: LineKind) -> String {
    let re = match kind {
        LineKind::Normal => return line.trim().to_string(),
        LineKind::Subtotal => re_subtotal_label(),
        LineKind::Total => re_total_label(),
    };
    match re {
        Some(re) => re.replace(line, "").trim().to_string(),
        None => {
            warn!(%kind, "label pattern unavailable, keeping line as-is");
            line.trim().to_string()
        }
    }
}

pub fn type_line(line: &str) -> TypedLine {
    let kind = classify(line);
    TypedLine {
        original: line.to_string(),
        text: strip_label(line, kind),
        kind,
    }
}

pub fn type_lines<S: AsRef<str>>(lines: &[S]) -> Vec<TypedLine> {
    lines.iter().map(|l| type_line(l.as_ref())).collect()
}

// ── Amount normalization ──────────────────────────────────────────────────────

/// Pull a decimal numeral out of noisy OCR text.
///
/// Drops `$` and whitespace, keeps digits and only the last `.` (or the last
/// `,`, rewritten as `.`). An empty result means no value, not zero.
pub fn normalize_amount(text: &str) -> String {
    let cleaned: Vec<char> = text
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace())
        .collect();

    let separator = if cleaned.contains(&'.') {
        Some('.')
    } else if cleaned.contains(&',') {
        Some(',')
    } else {
        None
    };
    if !cleaned.iter().any(char::is_ascii_digit) {
        return String::new();
    }
    let last_sep = separator.and_then(|sep| cleaned.iter().rposition(|c| *c == sep));

    cleaned
        .iter()
        .enumerate()
        .filter_map(|(idx, c)| {
            if c.is_ascii_digit() {
                Some(*c)
            } else if Some(idx) == last_sep {
                Some('.')
            } else {
                None
            }
        })
        .collect()
}

fn texts_of_kind(typed: &[TypedLine], kind: LineKind) -> impl Iterator<Item = &str> + '_ {
    typed
        .iter()
        .filter(move |t| t.kind == kind)
        .map(|t| t.text.as_str())
}

fn last_amount<'a, I>(texts: I) -> Option<String>
where
    I: Iterator<Item = &'a str>,
{
    texts.map(normalize_amount).filter(|a| !a.is_empty()).last()
}

// ── Field extraction ──────────────────────────────────────────────────────────

/// Derive subtotal, tax, total, store name and date from ordered lines.
///
/// Amounts take the last non-empty candidate of their kind, since the lowest
/// restatement on a receipt is the authoritative one.
pub fn extract_fields<S: AsRef<str>>(lines: &[S]) -> ExtractedFields {
    let typed = type_lines(lines);

    let subtotal = last_amount(texts_of_kind(&typed, LineKind::Subtotal));
    let total = last_amount(texts_of_kind(&typed, LineKind::Total));
    let tax = last_amount(
        typed
            .iter()
            .filter(|t| match_key(&t.text).contains("tax"))
            .map(|t| t.text.as_str()),
    );

    let fields = ExtractedFields {
        store_name: title_from_lines(lines),
        date: extract_date(lines),
        subtotal,
        tax,
        total,
    };
    debug!(
        lines = lines.len(),
        subtotal = ?fields.subtotal,
        tax = ?fields.tax,
        total = ?fields.total,
        date = ?fields.date,
        "extracted receipt fields"
    );
    fields
}

/// All normalized candidates for one kind, in line order.
pub fn amount_candidates(typed: &[TypedLine], kind: LineKind) -> Vec<String> {
    typed
        .iter()
        .filter(|t| t.kind == kind)
        .map(|t| normalize_amount(&t.text))
        .filter(|a| !a.is_empty())
        .collect()
}

// ── Date ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum DateFamily {
    Slash,
    Dash,
    Iso,
    MonthName,
}

impl DateFamily {
    const ALL: [DateFamily; 4] = [
        DateFamily::Slash,
        DateFamily::Dash,
        DateFamily::Iso,
        DateFamily::MonthName,
    ];

    fn regex(self) -> Option<&'static Regex> {
        match self {
            DateFamily::Slash => re_date_slash(),
            DateFamily::Dash => re_date_dash(),
            DateFamily::Iso => re_date_iso(),
            DateFamily::MonthName => re_date_month_name(),
        }
    }

    /// Concrete formats tried in order. Month-first wins over day-first when
    /// both are valid; there is no locale signal to do better.
    fn formats(self, token: &str) -> &'static [&'static str] {
        let long_year = token
            .rsplit(|c: char| c == '/' || c == '-')
            .next()
            .map_or(false, |y| y.len() == 4);
        match (self, long_year) {
            (DateFamily::Slash, true) => &["%m/%d/%Y", "%d/%m/%Y"],
            (DateFamily::Slash, false) => &["%m/%d/%y", "%d/%m/%y"],
            (DateFamily::Dash, true) => &["%m-%d-%Y", "%d-%m-%Y"],
            (DateFamily::Dash, false) => &["%m-%d-%y", "%d-%m-%y"],
            (DateFamily::Iso, _) => &["%Y-%m-%d", "%Y/%m/%d"],
            (DateFamily::MonthName, _) => &["%b %d %Y"],
        }
    }

    fn parse(self, token: &str) -> Option<NaiveDate> {
        let token = match self {
            // "Sept. 5, 2024" → "Sep 5 2024". %b wants exactly three letters.
            DateFamily::MonthName => token
                .replace(|c: char| c == '.' || c == ',', " ")
                .split_whitespace()
                .enumerate()
                .map(|(i, word)| match i {
                    0 => word.chars().take(3).collect(),
                    _ => word.to_string(),
                })
                .collect::<Vec<String>>()
                .join(" "),
            _ => token.to_string(),
        };
        self.formats(&token)
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&token, fmt).ok())
    }
}

/// The first date found scanning raw lines in order.
///
/// Within a line the leftmost match of any family is tried first. A match
/// that no format accepts is skipped and the scan continues.
pub fn extract_date<S: AsRef<str>>(lines: &[S]) -> Option<NaiveDate> {
    for line in lines {
        let line = line.as_ref();
        let mut matches: Vec<(usize, DateFamily, &str)> = DateFamily::ALL
            .iter()
            .filter_map(|family| {
                let m = family.regex()?.find(line)?;
                Some((m.start(), *family, m.as_str()))
            })
            .collect();
        matches.sort_by_key(|(start, _, _)| *start);

        for (_, family, token) in matches {
            match family.parse(token) {
                Some(date) => return Some(date),
                None => warn!(token, ?family, "date-shaped text did not parse"),
            }
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
