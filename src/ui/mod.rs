//! Terminal output for the `pairs` binary

pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use output::{error, header, info, not_found, pair, section, success, summary_row};
pub use progress::ImportProgress;
pub use table::{TableBuilder, records_table, sql_cell, stats_table};
pub use theme::{Icons, Theme, theme};
