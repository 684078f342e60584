//! Structured logging facility for HotCIDR
//!
//! - Single initialization point via `init(profile)`
//! - Operation boundary macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Progress lines for operators are NOT logged here; they go through the
//! executor's progress sink. This facility is for diagnostics only.
//!
//! # Usage
//!
//! ```rust
//! use hotcidr_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
