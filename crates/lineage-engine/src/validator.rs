//! Request validation logic

use lineage_domain::{ProvenanceRequest, RawRequest};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static UUID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("uuid pattern"));
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-_]+$").expect("name pattern"));

/// Why a request was rejected.
///
/// Rules are checked in a fixed order and evaluation stops at the first
/// violation, so a rejection names exactly one rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// One of the five required fields was absent
    #[error("required fields missing")]
    MissingRequired,

    /// A present field did not match its expected lexical shape
    #[error("{0} value is not in the correct format")]
    MalformedField(&'static str),
}

/// Validates the raw field set of a provenance request.
///
/// Checks are deliberately permissive: a character-class match per field,
/// no length or encoding bounds. Acceptance yields the typed request, so
/// downstream code never re-checks presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate a raw request, producing the typed request on acceptance.
    ///
    /// Rules in order: required presence; `object_uuid` numeric; each of
    /// `service_name`, `category_name`, `event_name`, `username` against
    /// the name class; `proxy_username` when present; `version` when
    /// present. Evaluation stops at the first failure.
    pub fn validate(&self, raw: RawRequest) -> Result<ProvenanceRequest, RejectionReason> {
        let RawRequest {
            object_uuid,
            service_name,
            category_name,
            event_name,
            username,
            proxy_username,
            event_data,
            version,
            track_history,
            track_history_code,
            source_address,
            created_at,
        } = raw;

        let (
            Some(object_uuid),
            Some(service_name),
            Some(category_name),
            Some(event_name),
            Some(username),
        ) = (object_uuid, service_name, category_name, event_name, username)
        else {
            return Err(RejectionReason::MissingRequired);
        };

        if !UUID_PATTERN.is_match(&object_uuid) {
            return Err(RejectionReason::MalformedField("object_uuid"));
        }

        let named = [
            ("service_name", &service_name),
            ("category_name", &category_name),
            ("event_name", &event_name),
            ("username", &username),
        ];
        for (field, value) in named {
            if !NAME_PATTERN.is_match(value) {
                return Err(RejectionReason::MalformedField(field));
            }
        }

        if let Some(proxy) = &proxy_username {
            if !NAME_PATTERN.is_match(proxy) {
                return Err(RejectionReason::MalformedField("proxy_username"));
            }
        }

        if let Some(version) = &version {
            if !NAME_PATTERN.is_match(version) {
                return Err(RejectionReason::MalformedField("version"));
            }
        }

        Ok(ProvenanceRequest {
            object_uuid,
            service_name,
            category_name,
            event_name,
            username,
            proxy_username,
            event_data,
            version,
            track_history,
            track_history_code,
            source_address,
            created_at,
        })
    }
}
