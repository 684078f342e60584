//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Entity identifiers
pub const FIELD_GROUP: &str = "group";
pub const FIELD_GROUP_ID: &str = "group_id";
pub const FIELD_INSTANCE_ID: &str = "instance_id";

// Plan/run sizes
pub const FIELD_ACTION_COUNT: &str = "action_count";
pub const FIELD_ACTION_INDEX: &str = "action_index";
pub const FIELD_DRY_RUN: &str = "dry_run";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
