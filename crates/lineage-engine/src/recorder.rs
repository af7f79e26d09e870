//! Provenance recording orchestration
//!
//! The recorder walks one request through validation, name resolution,
//! the registration check, the shaped write with its audit fallback, and
//! the conditional history step, and converts every path - success or
//! failure - into a structured [`RecordOutcome`].

use crate::history::HistoryTracker;
use crate::queue::FailureQueue;
use crate::validator::{RejectionReason, Validator};
use lineage_domain::traits::ProvenanceStore;
use lineage_domain::{EntityKind, ProvenanceRecord, ProvenanceRequest, RawRequest, ResolvedIds};
use serde::Serialize;
use std::fmt::Display;

const WARNING_CODE_WITHOUT_FLAG: &str =
    "Track history flag not set but a history code was sent";

/// Overall status of a recording attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The record was persisted
    Success,

    /// The record was not persisted
    Failed,
}

/// Which terminal state the request reached.
///
/// Not serialized; the shell uses this to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// Record persisted
    Recorded,

    /// Rejected by the validator; no store access occurred
    ValidationFailed,

    /// A name did not resolve; nothing was written
    ResolutionFailed,

    /// The target object was not registered exactly once
    RegistrationFailed,

    /// The primary insert did not succeed
    WriteFailed,
}

/// Structured result of one recording attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    /// Terminal state, for the shell's status mapping
    #[serde(skip)]
    pub kind: OutcomeKind,

    /// Overall status
    pub status: OutcomeStatus,

    /// Human-readable summary
    pub details: String,

    /// Failure specifics, when a failure has more to say
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,

    /// Freshly generated chain code, when tracking was requested without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_code: Option<String>,

    /// Inconsistency note that does not fail the write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl RecordOutcome {
    fn recorded() -> Self {
        Self {
            kind: OutcomeKind::Recorded,
            status: OutcomeStatus::Success,
            details: "Provenance recorded".to_string(),
            report: None,
            history_code: None,
            warning: None,
        }
    }

    fn failed(kind: OutcomeKind, details: &str, report: Option<String>) -> Self {
        Self {
            kind,
            status: OutcomeStatus::Failed,
            details: details.to_string(),
            report,
            history_code: None,
            warning: None,
        }
    }

    fn validation_failure(reason: &RejectionReason) -> Self {
        Self::failed(
            OutcomeKind::ValidationFailed,
            "Validation failed",
            Some(reason.to_string()),
        )
    }

    fn resolution_failure() -> Self {
        Self::failed(
            OutcomeKind::ResolutionFailed,
            "Unknown service, category, or event name",
            None,
        )
    }

    fn registration_failure(registrations: usize, object_uuid: &str) -> Self {
        let report = if registrations == 0 {
            format!("No registration found for object {}", object_uuid)
        } else {
            format!(
                "{} registrations found for object {}; support has been notified",
                registrations, object_uuid
            )
        };
        Self::failed(
            OutcomeKind::RegistrationFailed,
            "Provenance not recorded",
            Some(report),
        )
    }

    fn write_failure() -> Self {
        Self::failed(
            OutcomeKind::WriteFailed,
            "Provenance not recorded; audit data captured",
            None,
        )
    }
}

/// The provenance recording orchestrator.
///
/// Stateless between requests: every call owns its walk through the
/// state machine, and all coordination is delegated to the backing
/// store's read-then-write consistency.
pub struct Recorder {
    validator: Validator,
    history: HistoryTracker,
    failures: FailureQueue,
}

impl Recorder {
    /// Create a recorder routing unrecoverable failures to `failures`.
    pub fn new(failures: FailureQueue) -> Self {
        Self {
            validator: Validator::new(),
            history: HistoryTracker::new(),
            failures,
        }
    }

    /// Record one provenance request.
    ///
    /// Never returns an error: every failure path is converted to a
    /// [`RecordOutcome`] and logged with enough context to reconstruct
    /// the attempted record.
    pub fn record<S>(&self, store: &mut S, raw: RawRequest) -> RecordOutcome
    where
        S: ProvenanceStore,
        S::Error: Display,
    {
        tracing::info!(
            "Received provenance request: object={:?} service={:?} category={:?} event={:?} user={:?} source={} created={}",
            raw.object_uuid,
            raw.service_name,
            raw.category_name,
            raw.event_name,
            raw.username,
            raw.source_address,
            raw.created_at
        );

        let request = match self.validator.validate(raw) {
            Ok(request) => request,
            Err(reason) => {
                tracing::info!("Validation rejected request: {}", reason);
                return RecordOutcome::validation_failure(&reason);
            }
        };

        let ids = match self.resolve_ids(store, &request) {
            Ok(Some(ids)) => ids,
            Ok(None) => {
                tracing::error!(
                    "Unresolved name for object {}: service={} category={} event={} version={}",
                    request.object_uuid,
                    request.service_name,
                    request.category_name,
                    request.event_name,
                    request.version()
                );
                return RecordOutcome::resolution_failure();
            }
            Err(e) => {
                tracing::error!(
                    "Resolution query failed for object {}: {}",
                    request.object_uuid,
                    e
                );
                return RecordOutcome::resolution_failure();
            }
        };

        let record = ProvenanceRecord::new(&request, ids);

        match store.registration_count(&record.object_uuid) {
            Ok(1) => {}
            Ok(registrations) => {
                tracing::error!(
                    "Object {} has {} registrations, expected exactly one: {}",
                    record.object_uuid,
                    registrations,
                    describe(&record)
                );
                self.capture_audit(store, &record);
                return RecordOutcome::registration_failure(registrations, &record.object_uuid);
            }
            Err(e) => {
                tracing::error!(
                    "Registration check failed for object {}: {}: {}",
                    record.object_uuid,
                    e,
                    describe(&record)
                );
                self.capture_audit(store, &record);
                return RecordOutcome::write_failure();
            }
        }

        let shape = record.shape();
        let written = match store.insert_record(&record, shape) {
            Ok(1) => true,
            Ok(rows) => {
                tracing::error!(
                    "Insert ({}) affected {} rows: {}",
                    shape.as_str(),
                    rows,
                    describe(&record)
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    "Insert ({}) failed: {}: {}",
                    shape.as_str(),
                    e,
                    describe(&record)
                );
                false
            }
        };

        if !written {
            self.capture_audit(store, &record);
            return RecordOutcome::write_failure();
        }
        tracing::info!("Provenance recorded: {}", describe(&record));

        self.process_history(store, &request, &record)
    }

    /// Resolve all three identifiers, substituting the default version.
    fn resolve_ids<S>(
        &self,
        store: &S,
        request: &ProvenanceRequest,
    ) -> Result<Option<ResolvedIds>, S::Error>
    where
        S: ProvenanceStore,
    {
        let version = request.version();
        let event = store.resolve_id(EntityKind::Event, &request.event_name, version)?;
        let category = store.resolve_id(EntityKind::Category, &request.category_name, version)?;
        let service = store.resolve_id(EntityKind::Service, &request.service_name, version)?;

        Ok(match (event, category, service) {
            (Some(event_id), Some(category_id), Some(service_id)) => Some(ResolvedIds {
                event_id,
                category_id,
                service_id,
            }),
            _ => None,
        })
    }

    /// Attempt the audit-shaped fallback; a failed fallback lands in the
    /// failure queue.
    fn capture_audit<S>(&self, store: &mut S, record: &ProvenanceRecord)
    where
        S: ProvenanceStore,
        S::Error: Display,
    {
        match store.insert_audit(record, record.shape()) {
            Ok(1) => {}
            Ok(rows) => {
                tracing::error!(
                    "Audit insert affected {} rows, queueing: {}",
                    rows,
                    describe(record)
                );
                self.failures.record_failed_insert(record);
            }
            Err(e) => {
                tracing::error!("Audit insert failed, queueing: {}: {}", e, describe(record));
                self.failures.record_failed_insert(record);
            }
        }
    }

    /// The history step. Only reached after a successful primary write;
    /// nothing here changes the write outcome.
    fn process_history<S>(
        &self,
        store: &mut S,
        request: &ProvenanceRequest,
        record: &ProvenanceRecord,
    ) -> RecordOutcome
    where
        S: ProvenanceStore,
        S::Error: Display,
    {
        let mut outcome = RecordOutcome::recorded();

        if request.track_history {
            match &request.track_history_code {
                Some(code) => match self.history.extend_chain(store, code, record) {
                    Ok(()) => {
                        tracing::info!("History recorded under {}: {}", code, describe(record));
                    }
                    Err(e) => {
                        tracing::error!("History tracking failed for {}: {}", code, e);
                        self.failures
                            .record_history_error(code, &e.to_string(), record);
                    }
                },
                None => {
                    let code = crate::history::derive_chain_code(
                        &record.username,
                        &record.object_uuid,
                        record.created_at,
                    );
                    tracing::info!("History code generated: {} {}", code, describe(record));
                    outcome.history_code = Some(code);
                }
            }
        } else if let Some(code) = &request.track_history_code {
            tracing::error!(
                "History code {} sent without the track history flag: {}",
                code,
                describe(record)
            );
            self.failures
                .record_history_error(code, WARNING_CODE_WITHOUT_FLAG, record);
            outcome.warning = Some(WARNING_CODE_WITHOUT_FLAG.to_string());
        }

        outcome
    }
}

/// One-line description of a record for log lines.
fn describe(record: &ProvenanceRecord) -> String {
    format!(
        "{{object={} event={} category={} service={} user={} source={} created={}}}",
        record.object_uuid,
        record.ids.event_id,
        record.ids.category_id,
        record.ids.service_id,
        record.username,
        record.source_address,
        record.created_at
    )
}
