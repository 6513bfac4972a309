use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Title shown for a receipt whose lines carry no usable text.
pub const DEFAULT_TITLE: &str = "Receipt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    pub fn new() -> Self {
        ReceiptId(Uuid::new_v4())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReceiptId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(ReceiptId)
    }
}

/// User-supplied values layered over machine-extracted fields.
///
/// A field is either absent or a non-empty, trimmed value. Use
/// [`ReceiptEdits::canonicalized`] before storing anything that came from a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEdits {
    pub store_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub subtotal: Option<String>,
    pub tax: Option<String>,
    pub total: Option<String>,
}

impl ReceiptEdits {
    /// Trim every text override and drop the blank ones.
    pub fn canonicalized(self) -> Self {
        ReceiptEdits {
            store_name: non_blank(self.store_name),
            date: self.date,
            subtotal: non_blank(self.subtotal),
            tax: non_blank(self.tax),
            total: non_blank(self.total),
        }
    }

    /// Overlay the fields present in `other` on top of `self`.
    pub fn merge(self, other: ReceiptEdits) -> Self {
        ReceiptEdits {
            store_name: other.store_name.or(self.store_name),
            date: other.date.or(self.date),
            subtotal: other.subtotal.or(self.subtotal),
            tax: other.tax.or(self.tax),
            total: other.total.or(self.total),
        }
    }

    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.store_name)
            && self.date.is_none()
            && blank(&self.subtotal)
            && blank(&self.tax)
            && blank(&self.total)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A scanned (or manually entered) receipt.
///
/// `lines` is the OCR-derived source of truth and is fixed at creation. User
/// corrections live in [`ReceiptEdits`] and never rewrite the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    id: ReceiptId,
    created_at: DateTime<Utc>,
    lines: Vec<String>,
    #[serde(default)]
    edits: ReceiptEdits,
}

impl Receipt {
    pub fn new(lines: Vec<String>) -> Self {
        Receipt {
            id: ReceiptId::new(),
            created_at: Utc::now(),
            lines,
            edits: ReceiptEdits::default(),
        }
    }

    /// Build a receipt from raw lines, trimming each and dropping blank ones.
    /// Returns `None` when nothing is left.
    pub fn from_lines<I, S>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned: Vec<String> = lines
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self::new(cleaned))
        }
    }

    /// Rebuild a persisted receipt exactly as it was stored.
    pub fn restore(
        id: ReceiptId,
        created_at: DateTime<Utc>,
        lines: Vec<String>,
        edits: ReceiptEdits,
    ) -> Self {
        Receipt { id, created_at, lines, edits: edits.canonicalized() }
    }

    pub fn id(&self) -> ReceiptId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn edits(&self) -> &ReceiptEdits {
        &self.edits
    }

    pub fn title(&self) -> String {
        title_from_lines(&self.lines)
    }

    pub fn is_edited(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Apply the non-blank fields of `edits` on top of the existing overrides.
    /// A blank field never removes an override; use [`Receipt::clear_edits`].
    pub fn update_edits(&mut self, edits: ReceiptEdits) {
        let current = std::mem::take(&mut self.edits);
        self.edits = current.merge(edits.canonicalized());
    }

    /// Drop every override at once.
    pub fn clear_edits(&mut self) {
        self.edits = ReceiptEdits::default();
    }
}

/// First non-blank line (trimmed), or [`DEFAULT_TITLE`].
pub fn title_from_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|l| l.as_ref().trim())
        .find(|l| !l.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}
