//! Append-only failure queue
//!
//! The floor of the failure-handling chain: when even the audit-shaped
//! fallback insert cannot be completed, or a history-chain error has
//! nowhere else to go, the payload is appended here as one JSON line.
//! Writes to the queue never propagate errors.

use lineage_domain::ProvenanceRecord;
use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Durable last-resort log for records that could not be persisted
/// normally and for history-tracking errors.
#[derive(Debug, Clone)]
pub struct FailureQueue {
    path: PathBuf,
}

impl FailureQueue {
    /// Create a queue appending to the given file path.
    ///
    /// The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Queue a record whose primary write and audit fallback both failed.
    pub fn record_failed_insert(&self, record: &ProvenanceRecord) {
        self.push(json!({
            "kind": "failed_insert",
            "record": record_payload(record),
        }));
    }

    /// Queue a history-tracking error for operator review.
    pub fn record_history_error(&self, chain_code: &str, detail: &str, record: &ProvenanceRecord) {
        self.push(json!({
            "kind": "history_error",
            "chain_code": chain_code,
            "detail": detail,
            "record": record_payload(record),
        }));
    }

    /// Append one entry. Failures are logged and swallowed: this is the
    /// last stop and must not throw.
    fn push(&self, entry: serde_json::Value) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", entry));

        if let Err(e) = result {
            tracing::error!(
                "Failure queue write to {} failed, entry dropped: {}: {}",
                self.path.display(),
                e,
                entry
            );
        }
    }
}

fn record_payload(record: &ProvenanceRecord) -> serde_json::Value {
    json!({
        "object_uuid": record.object_uuid,
        "event_id": record.ids.event_id,
        "category_id": record.ids.category_id,
        "service_id": record.ids.service_id,
        "username": record.username,
        "proxy_username": record.proxy_username,
        "event_data": record.event_data,
        "source_address": record.source_address,
        "created_at": record.created_at,
    })
}
