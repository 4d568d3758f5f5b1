//! Storage Layer - SQLite-backed pair tables
//!
//! Each mapping owns one table:
//! - `<table>(key, value)` with column types from a `TypeSpec`
//! - optional `<table>_key_index` / `<table>_value_index`

pub mod plans;
pub mod schema;
pub mod sqlite;

pub use plans::{Plan, QueryPlanCache};
pub use sqlite::{PairStats, PairStore, Record, Session};
