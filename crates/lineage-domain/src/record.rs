//! Record types - the durable units this system persists

use crate::request::{ProvenanceRequest, WriteShape};

/// The kind of name being resolved to a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// An event name (version-independent)
    Event,

    /// A category name (version-independent)
    Category,

    /// A service name (version-scoped)
    Service,
}

impl EntityKind {
    /// Kind name for diagnostics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Event => "event",
            EntityKind::Category => "category",
            EntityKind::Service => "service",
        }
    }
}

/// The three identifiers a request resolves to.
///
/// A request may proceed to the write phase only once all three are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIds {
    /// Resolved event identifier
    pub event_id: i64,

    /// Resolved category identifier
    pub category_id: i64,

    /// Resolved service identifier
    pub service_id: i64,
}

/// The durable unit of provenance: resolved identifiers plus the request
/// payload. Records are append-only; this engine never mutates or deletes
/// one.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceRecord {
    /// Object the event attaches to
    pub object_uuid: String,

    /// Resolved event/category/service identifiers
    pub ids: ResolvedIds,

    /// Acting account
    pub username: String,

    /// Account acted on behalf of, when present
    pub proxy_username: Option<String>,

    /// Free-form event data, when present
    pub event_data: Option<String>,

    /// Network address of the submitting service
    pub source_address: String,

    /// Seconds since epoch
    pub created_at: i64,
}

impl ProvenanceRecord {
    /// Build the persistable record from a validated request and its
    /// resolved identifiers.
    pub fn new(request: &ProvenanceRequest, ids: ResolvedIds) -> Self {
        Self {
            object_uuid: request.object_uuid.clone(),
            ids,
            username: request.username.clone(),
            proxy_username: request.proxy_username.clone(),
            event_data: request.event_data.clone(),
            source_address: request.source_address.clone(),
            created_at: request.created_at,
        }
    }

    /// Which insert variant this record takes.
    pub fn shape(&self) -> WriteShape {
        WriteShape::select(self.proxy_username.as_deref(), self.event_data.as_deref())
    }
}

/// One member of a history chain.
///
/// The first recorded member of a chain code is its parent; every later
/// member references the same code as a child and is never re-parented.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEntry {
    /// Opaque grouping code identifying the chain
    pub chain_code: String,

    /// Object the member's event attached to
    pub object_uuid: String,

    /// Resolved identifiers of the member's event
    pub ids: ResolvedIds,

    /// Acting account
    pub username: String,

    /// Seconds since epoch
    pub created_at: i64,

    /// Whether this member establishes the chain
    pub is_parent: bool,
}
