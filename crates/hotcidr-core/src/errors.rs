use hotcidr_core_types::{RunId, TraceId};
use thiserror::Error;

/// Result type alias using HotCidrError
pub type Result<T> = std::result::Result<T, HotCidrError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and the CLI's exit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Rule/record validation
    InvalidInput,
    InvalidDirection,
    InvalidRule,
    DuplicateRecord,
    InvalidSnapshot,
    NotFound,

    // Connector
    UnsupportedParameter,
    ExternalService,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidDirection => "ERR_INVALID_DIRECTION",
            ExErrorKind::InvalidRule => "ERR_INVALID_RULE",
            ExErrorKind::DuplicateRecord => "ERR_DUPLICATE_RECORD",
            ExErrorKind::InvalidSnapshot => "ERR_INVALID_SNAPSHOT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::UnsupportedParameter => "ERR_UNSUPPORTED_PARAMETER",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context for
/// debugging. Library boundaries that load or reconcile state return this.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    group: Option<String>,
    run_id: Option<RunId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            group: None,
            run_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (instance id, group id, file path)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add security group name context
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(group) = &self.group {
            write!(f, " (group: {})", group)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(trace_id) = &self.trace_id {
            write!(f, " (trace_id: {})", trace_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error taxonomy for reconciliation operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HotCidrError {
    // ===== Validation Errors =====
    /// A rule's direction is neither inbound nor outbound
    #[error("Invalid direction {direction} for rule in group {group}")]
    InvalidDirection { group: String, direction: String },

    /// A rule is missing a field required to execute it
    #[error("Invalid rule in group {group}: {reason}")]
    InvalidRule { group: String, reason: String },

    /// A snapshot already holds a record under this key
    #[error("Duplicate {kind} record: {key}")]
    DuplicateRecord { kind: String, key: String },

    /// A snapshot could not be interpreted
    #[error("Invalid snapshot: {reason}")]
    InvalidSnapshot { reason: String },

    // ===== Connector Errors =====
    /// The connector rejected a group-reference parameter variant (after retry)
    #[error("Connector does not support parameter {parameter} in {op}")]
    UnsupportedParameter { op: String, parameter: String },

    /// The connector failed for any other reason
    #[error("Connector call {op} failed: {code}: {message}")]
    Connector {
        op: String,
        code: String,
        message: String,
    },

    // ===== Generic Errors =====
    /// Filesystem error while reading or writing state
    #[error("IO error at {path}: {message}")]
    Io { path: String, message: String },

    /// Serialization error (YAML/JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<HotCidrError> for ExError {
    fn from(err: HotCidrError) -> Self {
        match err {
            HotCidrError::InvalidDirection { group, direction } => {
                ExError::new(ExErrorKind::InvalidDirection)
                    .with_group(group)
                    .with_message(format!("Invalid direction {}", direction))
            }
            HotCidrError::InvalidRule { group, reason } => ExError::new(ExErrorKind::InvalidRule)
                .with_group(group)
                .with_message(reason),
            HotCidrError::DuplicateRecord { kind, key } => {
                ExError::new(ExErrorKind::DuplicateRecord)
                    .with_entity_id(key)
                    .with_message(format!("Duplicate {} record", kind))
            }
            HotCidrError::InvalidSnapshot { reason } => {
                ExError::new(ExErrorKind::InvalidSnapshot).with_message(reason)
            }
            HotCidrError::UnsupportedParameter { op, parameter } => {
                ExError::new(ExErrorKind::UnsupportedParameter)
                    .with_op(op)
                    .with_message(format!("Parameter {} is not supported", parameter))
            }
            HotCidrError::Connector { op, code, message } => {
                ExError::new(ExErrorKind::ExternalService)
                    .with_op(op)
                    .with_message(format!("{}: {}", code, message))
            }
            HotCidrError::Io { path, message } => ExError::new(ExErrorKind::Io)
                .with_entity_id(path)
                .with_message(message),
            HotCidrError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }
            HotCidrError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}
