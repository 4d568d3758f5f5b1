//! SQLite pair store implementation

use std::ops::Deref;
use std::path::Path;
use rusqlite::{Connection, OptionalExtension, named_params};
use serde::Serialize;
use tracing::{debug, warn};
use crate::cache::LookupCache;
use crate::codec::Codec;
use crate::config::PairsConfig;
use crate::value::{KeyFormat, Scalar, Value};
use crate::{Error, Result};
use super::plans::{Plan, QueryPlanCache};
use super::schema;

/// The SQLite session a store runs on.
///
/// A store either owns its connection outright or borrows one whose
/// lifetime the caller manages (e.g. several tables sharing a database).
pub enum Session<'c> {
    Owned(Connection),
    Shared(&'c Connection),
}

impl Deref for Session<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Session::Owned(conn) => conn,
            Session::Shared(conn) => conn,
        }
    }
}

/// One result row of a raw query: column name and value, in column order
pub type Record = Vec<(String, rusqlite::types::Value)>;

/// Counters for a single store instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PairStats {
    /// `key → value` lookups that reached SQLite
    pub lookups_by_key: u64,
    /// `value → key` lookups that reached SQLite
    pub lookups_by_value: u64,
    /// Rows inserted or replaced
    pub writes: u64,
    /// Delete statements executed for `unset_key_value`
    pub deletes: u64,
    pub plans_compiled: usize,
    pub cache_flushes: u64,
    pub cached_entries: usize,
}

impl std::fmt::Display for PairStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pair Store Statistics:")?;
        writeln!(f, "  Lookups by key: {}", self.lookups_by_key)?;
        writeln!(f, "  Lookups by value: {}", self.lookups_by_value)?;
        writeln!(f, "  Writes: {}", self.writes)?;
        writeln!(f, "  Deletes: {}", self.deletes)?;
        writeln!(f, "  Plans compiled: {}", self.plans_compiled)?;
        writeln!(f, "  Cache flushes: {}", self.cache_flushes)?;
        writeln!(f, "  Cached entries: {}", self.cached_entries)
    }
}

/// Bidirectional key↔value mapping over one SQLite table.
///
/// Lookups consult the in-process cache first and fall back to SQLite;
/// writes go to SQLite and update the cache at the same time. Cache writes
/// ignore transaction state: after `rollback` the cache may still report
/// rolled-back values until `clear_cache` (or `reset`).
pub struct PairStore<'c> {
    session: Session<'c>,
    table: String,
    plans: QueryPlanCache,
    cache: LookupCache,
    stats: PairStats,
}

impl PairStore<'static> {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: impl AsRef<Path>, config: PairsConfig) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(Error::Connection)?;
        debug!(path = %path.display(), table = %config.table, "opened pair database");
        apply_session_pragmas(&conn);
        Self::from_connection(conn, config)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(config: PairsConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::Connection)?;
        apply_session_pragmas(&conn);
        Self::from_connection(conn, config)
    }

    /// Take exclusive ownership of an existing connection
    pub fn from_connection(conn: Connection, config: PairsConfig) -> Result<Self> {
        Self::new(Session::Owned(conn), config)
    }
}

impl<'c> PairStore<'c> {
    /// Borrow a connection shared with the caller
    pub fn with_connection(conn: &'c Connection, config: PairsConfig) -> Result<Self> {
        Self::new(Session::Shared(conn), config)
    }

    fn new(session: Session<'c>, config: PairsConfig) -> Result<Self> {
        schema::validate_table_name(&config.table)?;

        if config.writable {
            if let Err(err) = schema::bootstrap(&session, &config.table, &config.types) {
                warn!(table = %config.table, error = %err, "schema bootstrap failed");
            }
        }

        // Only a store that created the schema knows the value column is unique
        let cache_values = config.writable && config.types.caches_values();

        Ok(Self {
            session,
            plans: QueryPlanCache::new(config.table.as_str()),
            cache: LookupCache::new(config.cache_capacity, cache_values),
            table: config.table,
            stats: PairStats::default(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The underlying session
    pub fn connection(&self) -> &Connection {
        &self.session
    }

    // ========== Lookups ==========

    /// Find the key stored for `value`.
    ///
    /// With `add`, a missing value is inserted under a fresh key and looked
    /// up once more; a second miss is reported as `Ok(None)`.
    pub fn get_key(
        &mut self,
        value: impl Into<Scalar>,
        add: bool,
        format: KeyFormat,
    ) -> Result<Option<Scalar>> {
        let value = value.into();
        if let Some(key) = self.cache.key(&value) {
            return format.apply(key.clone()).map(Some);
        }

        match self.lookup_key(&value) {
            Ok(Some(key)) => return self.remember_key(key, value, format),
            Ok(None) => {}
            // The insert below may still succeed, e.g. on a freshly created table
            Err(err) if add => debug!(table = %self.table, error = %err, "key lookup failed, inserting"),
            Err(err) => return Err(err),
        }

        if !add {
            return Ok(None);
        }

        self.insert_value(&value)?;
        match self.lookup_key(&value)? {
            Some(key) => self.remember_key(key, value, format),
            None => Ok(None),
        }
    }

    /// Find the value stored for `key`, decoded with `codec`.
    ///
    /// Misses are cached, so repeated lookups of an absent key stay in memory.
    pub fn get_value(&mut self, key: impl Into<Scalar>, codec: Codec) -> Result<Option<Value>> {
        let key = key.into();
        if let Some(cached) = self.cache.value(&key) {
            return Ok(cached.cloned());
        }

        let stored = {
            let mut stmt = self.plans.statement(&self.session, Plan::ValueByKey)?;
            self.stats.lookups_by_key += 1;
            stmt.query_row(named_params! { ":key": &key }, |row| row.get::<_, Option<Scalar>>(0))
                .optional()?
                .flatten()
        };

        let Some(stored) = stored else {
            self.cache.insert(key, None, false);
            return Ok(None);
        };

        let value = codec.decode(stored)?;
        self.cache.insert(key, Some(value.clone()), codec.stores_verbatim());
        Ok(Some(value))
    }

    // ========== Writes ==========

    /// Insert or replace the pair `(key, value)`.
    ///
    /// A value the codec cannot encode is rejected before anything changes.
    /// Otherwise the cache is updated, holding the value as `codec` would
    /// decode it, before the statement runs; it reflects the new value even
    /// when the write fails, so check the result for durability.
    pub fn set_key_value(
        &mut self,
        key: impl Into<Scalar>,
        value: impl Into<Value>,
        codec: Codec,
    ) -> Result<()> {
        let key = key.into();
        let value = value.into();

        let stored = codec.encode(&value)?;
        let cached = codec.normalize(value)?;
        self.cache.insert(key.clone(), Some(cached), codec.stores_verbatim());

        let mut stmt = self.plans.statement(&self.session, Plan::UpsertPair)?;
        stmt.execute(named_params! { ":key": &key, ":value": &stored })?;
        self.stats.writes += 1;
        Ok(())
    }

    /// Delete the pair for `key`. Returns whether a row was removed.
    ///
    /// The cache is only touched once the delete has succeeded: `key` then
    /// becomes a cached miss and `value` no longer resolves to it.
    pub fn unset_key_value(&mut self, key: impl Into<Scalar>, value: impl Into<Value>) -> Result<bool> {
        let key = key.into();
        let value = value.into();

        let removed = {
            let mut stmt = self.plans.statement(&self.session, Plan::DeletePair)?;
            stmt.execute(named_params! { ":key": &key })?
        };
        self.stats.deletes += 1;

        self.cache.mark_absent(key, value.as_scalar());
        Ok(removed > 0)
    }

    /// Delete every row of the table and clear the cache.
    ///
    /// The cache is cleared even if the delete fails.
    pub fn reset(&mut self) -> Result<()> {
        let deleted = self.session.execute(&format!("DELETE FROM {}", self.table), []);
        self.clear_cache();
        let deleted = deleted?;
        debug!(table = %self.table, rows = deleted, "reset pair table");
        Ok(())
    }

    /// Drop all cached lookups; persisted rows are untouched.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // ========== Transactions ==========

    /// Begin a transaction on the session
    pub fn begin(&self) -> Result<()> {
        self.session.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    /// Commit a transaction
    pub fn commit(&self) -> Result<()> {
        self.session.execute("COMMIT", [])?;
        Ok(())
    }

    /// Rollback a transaction; the cache is left as is
    pub fn rollback(&self) -> Result<()> {
        self.session.execute("ROLLBACK", [])?;
        Ok(())
    }

    // ========== Raw access ==========

    /// Run an arbitrary statement and collect its rows. Bypasses the cache.
    pub fn query(&self, sql: &str) -> Result<Vec<Record>> {
        let mut stmt = self.session.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                record.push((name.clone(), row.get::<_, rusqlite::types::Value>(idx)?));
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Count persisted pairs
    pub fn count_pairs(&self) -> Result<usize> {
        let count: i64 = self.session.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Number of key-side cache entries
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Key-side entries held before the cache is flushed
    pub fn cache_capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn stats(&self) -> PairStats {
        PairStats {
            plans_compiled: self.plans.compiled(),
            cache_flushes: self.cache.flushes(),
            cached_entries: self.cache.len(),
            ..self.stats
        }
    }

    // ========== Helpers ==========

    fn lookup_key(&mut self, value: &Scalar) -> Result<Option<Scalar>> {
        let mut stmt = self.plans.statement(&self.session, Plan::KeyByValue)?;
        self.stats.lookups_by_value += 1;
        let key = stmt
            .query_row(named_params! { ":value": value }, |row| row.get::<_, Option<Scalar>>(0))
            .optional()?;
        Ok(key.flatten())
    }

    fn insert_value(&mut self, value: &Scalar) -> Result<()> {
        let mut stmt = self.plans.statement(&self.session, Plan::InsertValue)?;
        stmt.execute(named_params! { ":value": value })?;
        self.stats.writes += 1;
        Ok(())
    }

    fn remember_key(&mut self, key: Scalar, value: Scalar, format: KeyFormat) -> Result<Option<Scalar>> {
        let reported = format.apply(key.clone())?;
        self.cache.insert(key, Some(Value::Scalar(value)), true);
        Ok(Some(reported))
    }
}

fn apply_session_pragmas(conn: &Connection) {
    for (pragma, value) in schema::SESSION_PRAGMAS {
        if let Err(err) = conn.pragma_update(None, pragma, value) {
            warn!(pragma, error = %err, "session pragma failed");
        }
    }
}
