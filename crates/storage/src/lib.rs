pub mod db;

pub use db::{
    clear_receipt_edits, create_db, delete_all_receipts, delete_receipt, get_receipt,
    insert_receipt, list_receipts, update_receipt_edits, DbPool, StorageError,
};
