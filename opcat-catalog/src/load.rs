//! The relational catalog store.
//!
//! SQLite via rusqlite: schema applied on open, one transaction per
//! definition batch, prepared statements with bound parameters throughout.
//! The store is wiped and fully regenerated on every run; there is no
//! incremental-update path.

use crate::generate::{SqlValue, Statement};
use opcat_common::FamilyRegistry;
use rusqlite::{Connection, params};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("statement failed: {statement}: {source}")]
    Batch {
        /// Rendered form of the offending statement.
        statement: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Catalog tables in referential dependency order: link tables first, then
/// dependents, then independents. Deletion walks this list front to back.
const TABLES_DEPENDENCY_ORDER: &[&str] = &[
    "implementation_input_items",
    "implementation_output_items",
    "profile_item",
    "implementation",
    "algorithm",
    "family",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS family (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    label       TEXT NOT NULL,
    description TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS algorithm (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    label       TEXT NOT NULL,
    description TEXT NOT NULL,
    family_id   INTEGER NOT NULL REFERENCES family(id)
);
CREATE TABLE IF NOT EXISTS implementation (
    id               INTEGER PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE,
    label            TEXT NOT NULL,
    description      TEXT NOT NULL,
    algorithm_id     INTEGER NOT NULL REFERENCES algorithm(id),
    execution_plugin TEXT NOT NULL,
    library_address  TEXT NOT NULL,
    visibility       INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS profile_item (
    id               INTEGER PRIMARY KEY,
    name             TEXT NOT NULL UNIQUE,
    label            TEXT NOT NULL,
    description      TEXT NOT NULL,
    direction        INTEGER NOT NULL,
    dtype            INTEGER NOT NULL,
    order_index      INTEGER NOT NULL,
    data_format      TEXT NOT NULL,
    domain_of_values TEXT,
    default_value    TEXT
);
CREATE TABLE IF NOT EXISTS implementation_input_items (
    implementation_id INTEGER NOT NULL REFERENCES implementation(id),
    profile_item_id   INTEGER NOT NULL REFERENCES profile_item(id)
);
CREATE TABLE IF NOT EXISTS implementation_output_items (
    implementation_id INTEGER NOT NULL REFERENCES implementation(id),
    profile_item_id   INTEGER NOT NULL REFERENCES profile_item(id)
);
";

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
        Ok(match self {
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Integer(n) => ToSqlOutput::Owned(SqliteValue::Integer(*n)),
            Self::Bool(b) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*b))),
            Self::Null => ToSqlOutput::Owned(SqliteValue::Null),
        })
    }
}

/// A profile item row read back from the store, for reports and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileItemRow {
    pub name: String,
    pub direction: i64,
    pub dtype: i64,
    pub order_index: i64,
    pub data_format: String,
    pub domain_of_values: Option<String>,
    pub default_value: Option<String>,
}

/// Connection to the catalog store.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open (or create) the store at `path`, applying the schema and a
    /// conservative busy timeout.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::prepare(conn, busy_timeout)
    }

    /// In-memory store, used by the test suites.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(conn, Duration::from_secs(5))
    }

    fn prepare(conn: Connection, busy_timeout: Duration) -> Result<Self, StoreError> {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Delete all catalog rows in dependency order. Family rows are kept
    /// unless `include_families` is set.
    pub fn wipe(&mut self, include_families: bool) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for table in TABLES_DEPENDENCY_ORDER {
            if *table == "family" && !include_families {
                continue;
            }
            let deleted = tx.execute(&format!("DELETE FROM {table}"), [])?;
            debug!(table, deleted, "wiped catalog table");
        }
        tx.commit()?;
        info!(families_included = include_families, "catalog wiped");
        Ok(())
    }

    /// Insert every family of the registry. Family names are expected
    /// unique; a duplicate surfaces as a constraint error.
    pub fn load_families(&mut self, registry: &FamilyRegistry) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO family (name, label, description) VALUES (?1, ?2, ?3)",
            )?;
            for family in registry.iter() {
                stmt.execute(params![family.name, family.label, family.description])?;
                inserted += 1;
            }
        }
        tx.commit()?;
        info!(inserted, "family registry loaded");
        Ok(inserted)
    }

    /// Run one definition's statement batch inside a single transaction.
    ///
    /// On failure the transaction rolls back and the error carries the
    /// rendered offending statement; the caller decides whether to
    /// continue with the next repository.
    pub fn load_catalog(&mut self, batch: &[Statement]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for statement in batch {
            tx.execute(
                &statement.sql,
                rusqlite::params_from_iter(statement.params.iter()),
            )
            .map_err(|source| StoreError::Batch {
                statement: statement.render(),
                source,
            })?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── Read-back helpers (reports and tests) ──────────────────────────

    pub fn count(&self, table: &str) -> Result<i64, StoreError> {
        debug_assert!(TABLES_DEPENDENCY_ORDER.contains(&table));
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(n)
    }

    /// The family name an algorithm row resolves to, if the row exists.
    pub fn algorithm_family(&self, algorithm: &str) -> Result<Option<String>, StoreError> {
        use rusqlite::OptionalExtension;
        let family = self
            .conn
            .query_row(
                "SELECT f.name FROM algorithm a JOIN family f ON a.family_id = f.id \
                 WHERE a.name = ?1",
                params![algorithm],
                |row| row.get(0),
            )
            .optional()?;
        Ok(family)
    }

    /// The namespaced entry point stored on an implementation row.
    pub fn implementation_entry_point(
        &self,
        implementation: &str,
    ) -> Result<Option<String>, StoreError> {
        use rusqlite::OptionalExtension;
        let address = self
            .conn
            .query_row(
                "SELECT library_address FROM implementation WHERE name = ?1",
                params![implementation],
                |row| row.get(0),
            )
            .optional()?;
        Ok(address)
    }

    /// All profile items linked to an implementation, ordered by
    /// order_index, input links first.
    pub fn linked_profile_items(
        &self,
        implementation: &str,
    ) -> Result<Vec<ProfileItemRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.name, p.direction, p.dtype, p.order_index, p.data_format, \
                    p.domain_of_values, p.default_value \
             FROM profile_item p \
             JOIN ( \
                 SELECT profile_item_id, implementation_id FROM implementation_input_items \
                 UNION ALL \
                 SELECT profile_item_id, implementation_id FROM implementation_output_items \
             ) link ON link.profile_item_id = p.id \
             JOIN implementation i ON link.implementation_id = i.id \
             WHERE i.name = ?1 \
             ORDER BY p.order_index",
        )?;
        let rows = stmt
            .query_map(params![implementation], |row| {
                Ok(ProfileItemRow {
                    name: row.get(0)?,
                    direction: row.get(1)?,
                    dtype: row.get(2)?,
                    order_index: row.get(3)?,
                    data_format: row.get(4)?,
                    domain_of_values: row.get(5)?,
                    default_value: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
