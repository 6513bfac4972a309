pub mod config;
pub mod receipt;

pub use config::{ConfigError, TallyConfig};
pub use receipt::{title_from_lines, Receipt, ReceiptEdits, ReceiptId, DEFAULT_TITLE};
