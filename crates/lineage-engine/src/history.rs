//! History chain management
//!
//! Causally related provenance records group into chains keyed by an
//! opaque code. The first member recorded under a code is the chain's
//! parent; every later member is a child referencing the same code and is
//! never re-parented.

use lineage_domain::traits::ProvenanceStore;
use lineage_domain::{ChainEntry, ProvenanceRecord};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::fmt::Write as _;
use thiserror::Error;

/// Errors raised while extending a history chain.
///
/// Chain failures are non-fatal to the request that carried them; the
/// recorder routes them to the failure queue.
#[derive(Debug, Clone, Error)]
pub enum HistoryError {
    /// Chain membership lookup failed
    #[error("chain lookup failed: {0}")]
    Lookup(String),

    /// Chain member insert failed or affected an unexpected row count
    #[error("chain insert failed: {0}")]
    Insert(String),
}

/// Derive a fresh chain code from the identifying fields of its first
/// record.
///
/// The code is the SHA-256 digest of `username:uuid:created_at`,
/// hex-encoded: stable for identical inputs, distinct with overwhelming
/// probability otherwise.
pub fn derive_chain_code(username: &str, object_uuid: &str, created_at: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(object_uuid.as_bytes());
    hasher.update(b":");
    hasher.update(created_at.to_string().as_bytes());

    let digest = hasher.finalize();
    let mut code = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(code, "{:02x}", byte);
    }
    code
}

/// Creates and extends history chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryTracker;

impl HistoryTracker {
    /// Create a tracker.
    pub fn new() -> Self {
        Self
    }

    /// Record one chain member under a caller-supplied code.
    ///
    /// A code with no prior members is established with a parent row;
    /// a code with any prior member gets a child row. Exactly one
    /// affected row counts as success.
    pub fn extend_chain<S>(
        &self,
        store: &mut S,
        chain_code: &str,
        record: &ProvenanceRecord,
    ) -> Result<(), HistoryError>
    where
        S: ProvenanceStore,
        S::Error: Display,
    {
        let members = store
            .chain_members(chain_code)
            .map_err(|e| HistoryError::Lookup(e.to_string()))?;

        let entry = ChainEntry {
            chain_code: chain_code.to_string(),
            object_uuid: record.object_uuid.clone(),
            ids: record.ids,
            username: record.username.clone(),
            created_at: record.created_at,
            is_parent: members == 0,
        };

        match store.insert_chain_entry(&entry) {
            Ok(1) => Ok(()),
            Ok(rows) => Err(HistoryError::Insert(format!("affected {} rows", rows))),
            Err(e) => Err(HistoryError::Insert(e.to_string())),
        }
    }
}
