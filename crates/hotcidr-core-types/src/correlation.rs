//! Correlation ids for reconciliation runs
//!
//! A run is transient; nothing persists between runs. Each run mints a
//! [`RunId`]. A [`TraceId`] is never minted here: it comes from whoever
//! launched the run (a CI job, a wrapper script) so their logs and ours join up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a single reconciliation run (UUIDv7, time ordered)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque caller-supplied trace identifier
///
/// Any non-blank string is accepted; surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rejected trace id input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankTraceId;

impl fmt::Display for BlankTraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("trace id must not be blank")
    }
}

impl std::error::Error for BlankTraceId {}

impl FromStr for TraceId {
    type Err = BlankTraceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(BlankTraceId),
            trimmed => Ok(Self(trimmed.to_string())),
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ids and flags carried through one reconciliation run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub run_id: RunId,
    pub trace_id: Option<TraceId>,
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }
}
