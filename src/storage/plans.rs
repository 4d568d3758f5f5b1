//! Query plans - one lazily compiled statement per operation
//!
//! A slot is filled the first time its statement prepares successfully and
//! is reused for the life of the store. A failed prepare (for instance a
//! table that does not exist yet) leaves the slot empty so the next call
//! tries again. The compiled statement itself lives in the session's
//! prepared-statement cache.

use crate::Result;
use rusqlite::{CachedStatement, Connection};
use tracing::{debug, warn};

/// Operation kinds backed by a parameterized statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plan {
    /// `value → key`
    KeyByValue,
    /// `key → value`
    ValueByKey,
    /// New row with an auto-assigned key
    InsertValue,
    /// Upsert keyed by `key`
    UpsertPair,
    /// Remove the row for `key`
    DeletePair,
}

const PLAN_COUNT: usize = 5;

impl Plan {
    pub const ALL: [Plan; PLAN_COUNT] = [
        Plan::KeyByValue,
        Plan::ValueByKey,
        Plan::InsertValue,
        Plan::UpsertPair,
        Plan::DeletePair,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::KeyByValue => "key_by_value",
            Plan::ValueByKey => "value_by_key",
            Plan::InsertValue => "insert_value",
            Plan::UpsertPair => "upsert_pair",
            Plan::DeletePair => "delete_pair",
        }
    }

    pub fn sql(&self, table: &str) -> String {
        match self {
            Plan::KeyByValue => format!("SELECT key FROM {table} WHERE value = :value"),
            Plan::ValueByKey => format!("SELECT value FROM {table} WHERE key = :key"),
            Plan::InsertValue => format!("INSERT INTO {table}( value ) VALUES( :value )"),
            Plan::UpsertPair => {
                format!("INSERT OR REPLACE INTO {table}( key, value ) VALUES( :key, :value )")
            }
            Plan::DeletePair => format!("DELETE FROM {table} WHERE key = :key"),
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

pub struct QueryPlanCache {
    table: String,
    slots: [Option<String>; PLAN_COUNT],
}

impl QueryPlanCache {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            slots: Default::default(),
        }
    }

    /// Statement for `plan`, compiling it on first use.
    pub fn statement<'c>(&mut self, conn: &'c Connection, plan: Plan) -> Result<CachedStatement<'c>> {
        let slot = &mut self.slots[plan.slot()];
        if let Some(sql) = slot.as_deref() {
            return Ok(conn.prepare_cached(sql)?);
        }

        let sql = plan.sql(&self.table);
        match conn.prepare_cached(&sql) {
            Ok(stmt) => {
                debug!(plan = plan.as_str(), table = %self.table, "compiled query plan");
                *slot = Some(sql);
                Ok(stmt)
            }
            Err(err) => {
                warn!(plan = plan.as_str(), table = %self.table, error = %err, "query plan failed to compile");
                Err(err.into())
            }
        }
    }

    pub fn is_compiled(&self, plan: Plan) -> bool {
        self.slots[plan.slot()].is_some()
    }

    /// Number of plans compiled so far
    pub fn compiled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
