use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tally_core::{Receipt, ReceiptEdits, ReceiptId};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Stored lines are not valid JSON: {0}")]
    Lines(#[from] serde_json::Error),
    #[error("Stored receipt id is not a UUID: {0}")]
    Id(#[from] uuid::Error),
}

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            lines TEXT NOT NULL,
            edited_store_name TEXT,
            edited_date TEXT,
            edited_subtotal TEXT,
            edited_tax TEXT,
            edited_total TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_receipts_created_at ON receipts(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

type ReceiptRow = (
    String,
    DateTime<Utc>,
    String,
    Option<String>,
    Option<NaiveDate>,
    Option<String>,
    Option<String>,
    Option<String>,
);

const SELECT_RECEIPT: &str = "SELECT id, created_at, lines, edited_store_name, edited_date, \
     edited_subtotal, edited_tax, edited_total FROM receipts";

fn receipt_from_row(r: ReceiptRow) -> Result<Receipt, StorageError> {
    let id = ReceiptId(Uuid::parse_str(&r.0)?);
    let lines: Vec<String> = serde_json::from_str(&r.2)?;
    let edits = ReceiptEdits {
        store_name: r.3,
        date: r.4,
        subtotal: r.5,
        tax: r.6,
        total: r.7,
    };
    Ok(Receipt::restore(id, r.1, lines, edits))
}

/// Store a new receipt. Blank overrides are written as NULL.
pub async fn insert_receipt(pool: &DbPool, receipt: &Receipt) -> Result<(), StorageError> {
    let lines = serde_json::to_string(receipt.lines())?;
    let edits = receipt.edits().clone().canonicalized();

    sqlx::query(
        "INSERT INTO receipts (id, created_at, lines, edited_store_name, edited_date, \
         edited_subtotal, edited_tax, edited_total) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(receipt.id().to_string())
    .bind(receipt.created_at())
    .bind(lines)
    .bind(edits.store_name)
    .bind(edits.date)
    .bind(edits.subtotal)
    .bind(edits.tax)
    .bind(edits.total)
    .execute(pool)
    .await?;

    debug!(id = %receipt.id(), "receipt inserted");
    Ok(())
}

pub async fn get_receipt(pool: &DbPool, id: ReceiptId) -> Result<Option<Receipt>, StorageError> {
    let row = sqlx::query_as::<_, ReceiptRow>(&format!("{SELECT_RECEIPT} WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(receipt_from_row).transpose()
}

/// All receipts, newest first.
pub async fn list_receipts(pool: &DbPool) -> Result<Vec<Receipt>, StorageError> {
    let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
        "{SELECT_RECEIPT} ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(receipt_from_row).collect()
}

/// Replace all five overrides with `edits` (canonicalized). Lines are never
/// touched. Returns whether a receipt with `id` existed.
pub async fn update_receipt_edits(
    pool: &DbPool,
    id: ReceiptId,
    edits: &ReceiptEdits,
) -> Result<bool, StorageError> {
    let edits = edits.clone().canonicalized();
    let result = sqlx::query(
        "UPDATE receipts SET edited_store_name = ?, edited_date = ?, edited_subtotal = ?, \
         edited_tax = ?, edited_total = ? WHERE id = ?",
    )
    .bind(edits.store_name)
    .bind(edits.date)
    .bind(edits.subtotal)
    .bind(edits.tax)
    .bind(edits.total)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn clear_receipt_edits(pool: &DbPool, id: ReceiptId) -> Result<bool, StorageError> {
    update_receipt_edits(pool, id, &ReceiptEdits::default()).await
}

pub async fn delete_receipt(pool: &DbPool, id: ReceiptId) -> Result<bool, StorageError> {
    let result = sqlx::query("DELETE FROM receipts WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every receipt. Returns how many were deleted.
pub async fn delete_all_receipts(pool: &DbPool) -> Result<u64, StorageError> {
    let result = sqlx::query("DELETE FROM receipts").execute(pool).await?;
    Ok(result.rows_affected())
}
