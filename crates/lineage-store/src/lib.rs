//! Lineage Storage Layer
//!
//! Implements the ProvenanceStore trait over SQLite.
//!
//! # Architecture
//!
//! - Name registries (services, categories, events) resolve human-readable
//!   names to stable integer identifiers
//! - `registered_objects` gates recording: provenance attaches only to an
//!   object registered exactly once
//! - `provenance` holds the durable records; `provenance_audit` holds the
//!   audit-shaped copies written when a primary insert fails
//! - `history_chains` holds parent/child members of grouped records
//!
//! Each of the four write shapes maps to a fixed (primary, audit)
//! statement pair carrying exactly the columns the shape uses.
//!
//! # Examples
//!
//! ```no_run
//! use lineage_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for recording operations
//! ```

#![warn(missing_docs)]

use lineage_domain::traits::ProvenanceStore;
use lineage_domain::{ChainEntry, EntityKind, ProvenanceRecord, WriteShape, DEFAULT_VERSION};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Outcome of a service-object lookup.
///
/// Backs the read-only object lookup endpoint; the missing and ambiguous
/// cases are reported distinctly to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLookup {
    /// Exactly one registration row matched; carries the object uuid
    Found(String),

    /// No registration row matched
    Missing,

    /// More than one registration row matched (upstream data corruption)
    Ambiguous(usize),
}

const INSERT_BASIC: &str = "INSERT INTO provenance \
     (object_uuid, event_id, category_id, service_id, username, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const INSERT_PROXY: &str = "INSERT INTO provenance \
     (object_uuid, event_id, category_id, service_id, username, proxy_username, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
const INSERT_DATA: &str = "INSERT INTO provenance \
     (object_uuid, event_id, category_id, service_id, username, event_data, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
const INSERT_FULL: &str = "INSERT INTO provenance \
     (object_uuid, event_id, category_id, service_id, username, proxy_username, event_data, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const AUDIT_BASIC: &str = "INSERT INTO provenance_audit \
     (object_uuid, event_id, category_id, service_id, username, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
const AUDIT_PROXY: &str = "INSERT INTO provenance_audit \
     (object_uuid, event_id, category_id, service_id, username, proxy_username, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
const AUDIT_DATA: &str = "INSERT INTO provenance_audit \
     (object_uuid, event_id, category_id, service_id, username, event_data, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
const AUDIT_FULL: &str = "INSERT INTO provenance_audit \
     (object_uuid, event_id, category_id, service_id, username, proxy_username, event_data, source_address, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

/// Each write shape's (primary, audit) statement pair.
fn shape_statements(shape: WriteShape) -> (&'static str, &'static str) {
    match shape {
        WriteShape::Basic => (INSERT_BASIC, AUDIT_BASIC),
        WriteShape::Proxy => (INSERT_PROXY, AUDIT_PROXY),
        WriteShape::Data => (INSERT_DATA, AUDIT_DATA),
        WriteShape::Full => (INSERT_FULL, AUDIT_FULL),
    }
}

/// SQLite-based implementation of ProvenanceStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its
/// own SqliteStore instance, or access must be serialized externally.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use lineage_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("lineage.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Execute the shaped statement with exactly the columns it carries.
    fn execute_shaped(
        &mut self,
        sql: &str,
        record: &ProvenanceRecord,
        shape: WriteShape,
    ) -> Result<usize, StoreError> {
        let rows = match shape {
            WriteShape::Basic => self.conn.execute(
                sql,
                params![
                    &record.object_uuid,
                    record.ids.event_id,
                    record.ids.category_id,
                    record.ids.service_id,
                    &record.username,
                    &record.source_address,
                    record.created_at,
                ],
            )?,
            WriteShape::Proxy => self.conn.execute(
                sql,
                params![
                    &record.object_uuid,
                    record.ids.event_id,
                    record.ids.category_id,
                    record.ids.service_id,
                    &record.username,
                    &record.proxy_username,
                    &record.source_address,
                    record.created_at,
                ],
            )?,
            WriteShape::Data => self.conn.execute(
                sql,
                params![
                    &record.object_uuid,
                    record.ids.event_id,
                    record.ids.category_id,
                    record.ids.service_id,
                    &record.username,
                    &record.event_data,
                    &record.source_address,
                    record.created_at,
                ],
            )?,
            WriteShape::Full => self.conn.execute(
                sql,
                params![
                    &record.object_uuid,
                    record.ids.event_id,
                    record.ids.category_id,
                    record.ids.service_id,
                    &record.username,
                    &record.proxy_username,
                    &record.event_data,
                    &record.source_address,
                    record.created_at,
                ],
            )?,
        };
        Ok(rows)
    }

    /// Register a service name under a version, returning its identifier.
    ///
    /// Names are assumed unique within their version scope; this helper
    /// does not enforce it.
    pub fn add_service(&mut self, name: &str, version: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO services (name, version) VALUES (?1, ?2)",
            params![name, version],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Register a category name, returning its identifier.
    pub fn add_category(&mut self, name: &str) -> Result<i64, StoreError> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Register an event name, returning its identifier.
    pub fn add_event(&mut self, name: &str) -> Result<i64, StoreError> {
        self.conn
            .execute("INSERT INTO events (name) VALUES (?1)", params![name])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Register an object so provenance can attach to it.
    ///
    /// `service_object_id` is the submitting service's own identifier for
    /// the object, used by the read-only lookup.
    pub fn register_object(
        &mut self,
        object_uuid: &str,
        service_object_id: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO registered_objects (object_uuid, service_object_id) VALUES (?1, ?2)",
            params![object_uuid, service_object_id],
        )?;
        Ok(())
    }

    /// Look up the object uuid registered for a service's own object id.
    ///
    /// Used by the read-only lookup endpoint; missing and ambiguous
    /// results are distinct outcomes, not errors.
    pub fn lookup_object(&self, service_object_id: &str) -> Result<ObjectLookup, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT object_uuid FROM registered_objects WHERE service_object_id = ?1",
        )?;
        let mut uuids = stmt
            .query_map(params![service_object_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        match uuids.len() {
            0 => Ok(ObjectLookup::Missing),
            1 => Ok(ObjectLookup::Found(uuids.remove(0))),
            n => Ok(ObjectLookup::Ambiguous(n)),
        }
    }
}

impl ProvenanceStore for SqliteStore {
    type Error = StoreError;

    fn resolve_id(
        &self,
        kind: EntityKind,
        name: &str,
        version: &str,
    ) -> Result<Option<i64>, Self::Error> {
        let id = match kind {
            EntityKind::Event => self
                .conn
                .query_row(
                    "SELECT id FROM events WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?,
            EntityKind::Category => self
                .conn
                .query_row(
                    "SELECT id FROM categories WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?,
            EntityKind::Service if version == DEFAULT_VERSION => self
                .conn
                .query_row(
                    "SELECT id FROM services WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?,
            EntityKind::Service => self
                .conn
                .query_row(
                    "SELECT id FROM services WHERE name = ?1 AND version = ?2",
                    params![name, version],
                    |row| row.get(0),
                )
                .optional()?,
        };
        Ok(id)
    }

    fn registration_count(&self, object_uuid: &str) -> Result<usize, Self::Error> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM registered_objects WHERE object_uuid = ?1",
            params![object_uuid],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn insert_record(
        &mut self,
        record: &ProvenanceRecord,
        shape: WriteShape,
    ) -> Result<usize, Self::Error> {
        let (primary, _) = shape_statements(shape);
        self.execute_shaped(primary, record, shape)
    }

    fn insert_audit(
        &mut self,
        record: &ProvenanceRecord,
        shape: WriteShape,
    ) -> Result<usize, Self::Error> {
        let (_, audit) = shape_statements(shape);
        self.execute_shaped(audit, record, shape)
    }

    fn chain_members(&self, chain_code: &str) -> Result<usize, Self::Error> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history_chains WHERE chain_code = ?1",
            params![chain_code],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn insert_chain_entry(&mut self, entry: &ChainEntry) -> Result<usize, Self::Error> {
        let rows = self.conn.execute(
            "INSERT INTO history_chains \
             (chain_code, object_uuid, event_id, category_id, service_id, username, created_at, is_parent) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &entry.chain_code,
                &entry.object_uuid,
                entry.ids.event_id,
                entry.ids.category_id,
                entry.ids.service_id,
                &entry.username,
                entry.created_at,
                entry.is_parent,
            ],
        )?;
        Ok(rows)
    }
}
