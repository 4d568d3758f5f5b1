//! # Pairs - persisted bidirectional key/value mapping
//!
//! A key↔value dictionary stored in a single SQLite table, fronted by an
//! in-process lookup cache so that repeated lookups avoid storage round-trips.
//!
//! Pairs provides:
//! - Lookups in both directions (`key → value` and `value → key`)
//! - Interning: `get_key(value, add = true, ..)` assigns ids on first sight
//! - Write-through upserts with four value encodings (raw, integer, JSON, deflated JSON)
//! - Lazily compiled, reused query plans per mapping instance
//! - Caller-driven transactions delegated to SQLite
//!
//! ```no_run
//! use pairs::{Codec, KeyFormat, PairStore, PairsConfig, Scalar};
//!
//! # fn main() -> pairs::Result<()> {
//! let mut pairs = PairStore::open("storage.sqlite", PairsConfig::new("pairs").writable(true))?;
//! pairs.set_key_value(1, "Hello, World!", Codec::Raw)?;
//! assert_eq!(pairs.get_key("Hello, World!", false, KeyFormat::Integer)?, Some(Scalar::Integer(1)));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod storage;
pub mod ui;
pub mod value;

// Re-exports for convenient access
pub use cache::LookupCache;
pub use codec::Codec;
pub use config::{PairsConfig, TypeSpec};
pub use storage::{PairStats, PairStore, Record, Session};
pub use value::{KeyFormat, Scalar, Value};

/// Result type alias for pair store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pair store operations
///
/// A missing key or value is not an error: lookups report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("Statement error: {0}")]
    Statement(#[from] rusqlite::Error),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Invalid type spec: {0}")]
    InvalidTypeSpec(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
