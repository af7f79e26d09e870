//! Request types - the transient input to one recording call

/// Sentinel version substituted when a request carries no explicit version.
///
/// Service identifiers are version-scoped; a request without a version
/// resolves its service by name alone under this sentinel.
pub const DEFAULT_VERSION: &str = "Default";

/// The field set of a provenance request as received off the wire, before
/// validation.
///
/// Every caller-supplied field is optional at this stage; the validator
/// decides which absences are fatal. `source_address` and `created_at` are
/// assigned by the receiving shell, never by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    /// Identifier of the object the event attaches to (externally assigned)
    pub object_uuid: Option<String>,

    /// Name of the service reporting the event
    pub service_name: Option<String>,

    /// Name of the event category
    pub category_name: Option<String>,

    /// Name of the event itself
    pub event_name: Option<String>,

    /// Acting account; may be a system or daemon account
    pub username: Option<String>,

    /// The user the acting account is working on behalf of
    pub proxy_username: Option<String>,

    /// Free-form data associated with the event
    pub event_data: Option<String>,

    /// Service version; defaults to [`DEFAULT_VERSION`] when absent
    pub version: Option<String>,

    /// Whether the caller asked for history-chain tracking
    pub track_history: bool,

    /// Grouping code for history tracking, when the caller supplies one
    pub track_history_code: Option<String>,

    /// Network address of the submitting service (shell-assigned)
    pub source_address: String,

    /// Seconds since epoch, assigned server-side on receipt
    pub created_at: i64,
}

/// A provenance request that has passed validation.
///
/// Required fields are non-optional here; construction is the validator's
/// job, so a value of this type is known to satisfy the lexical rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceRequest {
    /// Identifier of the registered object the event attaches to
    pub object_uuid: String,

    /// Name of the service reporting the event
    pub service_name: String,

    /// Name of the event category
    pub category_name: String,

    /// Name of the event itself
    pub event_name: String,

    /// Acting account
    pub username: String,

    /// Account the acting account is working on behalf of
    pub proxy_username: Option<String>,

    /// Free-form event data
    pub event_data: Option<String>,

    /// Explicit service version, when one was supplied
    pub version: Option<String>,

    /// Whether history-chain tracking was requested
    pub track_history: bool,

    /// Caller-supplied chain code, when present
    pub track_history_code: Option<String>,

    /// Network address of the submitting service
    pub source_address: String,

    /// Seconds since epoch, assigned on receipt
    pub created_at: i64,
}

impl ProvenanceRequest {
    /// The version to resolve the service under.
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_VERSION)
    }

    /// Which insert variant this request maps to.
    pub fn write_shape(&self) -> WriteShape {
        WriteShape::select(self.proxy_username.as_deref(), self.event_data.as_deref())
    }
}

/// The four mutually exclusive insert variants.
///
/// Exactly one applies to any request, decided by which of the optional
/// proxy/data fields are present. Selection is a single exhaustive match
/// over the pair, so a request carrying both fields cannot be
/// misclassified into a narrower shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteShape {
    /// Neither proxy username nor event data present
    Basic,

    /// Proxy username present, no event data
    Proxy,

    /// Event data present, no proxy username
    Data,

    /// Both proxy username and event data present (the general case)
    Full,
}

impl WriteShape {
    /// Select the shape for a given optional-field combination.
    pub fn select(proxy_username: Option<&str>, event_data: Option<&str>) -> Self {
        match (proxy_username, event_data) {
            (None, None) => WriteShape::Basic,
            (Some(_), None) => WriteShape::Proxy,
            (None, Some(_)) => WriteShape::Data,
            (Some(_), Some(_)) => WriteShape::Full,
        }
    }

    /// Shape name for diagnostics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteShape::Basic => "basic",
            WriteShape::Proxy => "proxy",
            WriteShape::Data => "data",
            WriteShape::Full => "full",
        }
    }
}
