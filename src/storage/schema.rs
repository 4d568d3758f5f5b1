//! Database schema definitions and writable-mode bootstrap

use crate::config::TypeSpec;
use crate::{Error, Result};
use rusqlite::Connection;
use tracing::debug;

/// Pragmas applied to every session a store opens itself
pub const SESSION_PRAGMAS: &[(&str, &str)] = &[("temp_store", "MEMORY")];

/// WAL journal size cap in bytes
pub const JOURNAL_SIZE_LIMIT: i64 = 1024 * 1024;

/// Reject anything that is not a plain identifier; table names are
/// interpolated into SQL text.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTable(table.to_string()))
    }
}

/// SQL to create the pair table
pub fn create_table(table: &str, types: &TypeSpec) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table}( key {}, value {} )",
        types.key_type, types.value_type
    )
}

/// SQL to create the key index
pub fn create_key_index(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS {table}_key_index ON {table}( key )")
}

/// SQL to create the value index
pub fn create_value_index(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS {table}_value_index ON {table}( value )")
}

/// All schema creation statements for a table
pub fn all_schema_statements(table: &str, types: &TypeSpec) -> Vec<String> {
    let mut stmts = vec![create_table(table, types)];
    if types.index_key {
        stmts.push(create_key_index(table));
    }
    if types.index_value {
        stmts.push(create_value_index(table));
    }
    stmts
}

/// Tune durability pragmas for WAL operation.
pub fn apply_writable_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    let limit: i64 = conn.pragma_update_and_check(
        None,
        "journal_size_limit",
        JOURNAL_SIZE_LIMIT,
        |row| row.get(0),
    )?;
    conn.execute_batch("PRAGMA optimize")?;
    debug!(journal_mode = %mode, journal_size_limit = limit, "applied writable pragmas");
    Ok(())
}

/// Pragmas, table and requested indexes. Idempotent.
pub fn bootstrap(conn: &Connection, table: &str, types: &TypeSpec) -> Result<()> {
    apply_writable_pragmas(conn)?;
    for stmt in all_schema_statements(table, types) {
        conn.execute(&stmt, [])?;
    }
    debug!(table, types = %types, "schema ready");
    Ok(())
}
