//! Trait definitions for external interactions
//!
//! These traits define the boundary between the recording engine and the
//! backing store. Infrastructure implementations live in other crates.

use crate::record::{ChainEntry, EntityKind, ProvenanceRecord};
use crate::request::WriteShape;

/// Trait for the durable provenance store.
///
/// Implemented by the infrastructure layer (lineage-store). Insert
/// methods return the affected-row count; the engine treats anything
/// other than exactly one row as a failed write.
pub trait ProvenanceStore {
    /// Error type for store operations
    type Error;

    /// Resolve a name to its stable identifier.
    ///
    /// Events and categories resolve by name alone; services resolve by
    /// name under the default version sentinel, otherwise by
    /// (name, version). `Ok(None)` means the name is unknown.
    fn resolve_id(
        &self,
        kind: EntityKind,
        name: &str,
        version: &str,
    ) -> Result<Option<i64>, Self::Error>;

    /// Count registration rows for an object identifier.
    ///
    /// A request may attach provenance only to an object registered
    /// exactly once.
    fn registration_count(&self, object_uuid: &str) -> Result<usize, Self::Error>;

    /// Insert a provenance record using the given shape's statement.
    fn insert_record(
        &mut self,
        record: &ProvenanceRecord,
        shape: WriteShape,
    ) -> Result<usize, Self::Error>;

    /// Insert the audit-shaped copy of a record whose primary write
    /// failed.
    fn insert_audit(
        &mut self,
        record: &ProvenanceRecord,
        shape: WriteShape,
    ) -> Result<usize, Self::Error>;

    /// Count existing members of a history chain code.
    fn chain_members(&self, chain_code: &str) -> Result<usize, Self::Error>;

    /// Insert one history-chain member (parent or child).
    fn insert_chain_entry(&mut self, entry: &ChainEntry) -> Result<usize, Self::Error>;
}
