//! Process-level surface: load both sides, diff, execute, report
//!
//! Output is plain text: one `Action <n>/<total>: <description>` line per
//! action, flushed as it is written, then a single summary line. The summary
//! line is written even when execution stops on a failure.

use std::io::{self, Write};

use hotcidr_core_types::{RunContext, TraceId};

use crate::connector::Connector;
use crate::diff::compute_diff;
use crate::errors::{ExError, ExErrorKind, HotCidrError};
use crate::executor::{execute, ExecuteOptions, ProgressSink};
use crate::model::SnapshotSource;
use crate::summary::ChangeSummary;
use crate::{log_op_end, log_op_error, log_op_start};

/// Progress sink writing one line per action; remembers the first write failure
struct WriterProgress<'a> {
    out: &'a mut dyn Write,
    error: Option<io::Error>,
}

impl ProgressSink for WriterProgress<'_> {
    fn on_action(&mut self, index: usize, total: usize, description: &str) {
        if self.error.is_some() {
            return;
        }
        let written = writeln!(self.out, "Action {}/{}: {}", index, total, description)
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            self.error = Some(e);
        }
    }

    fn failure(&self) -> Option<HotCidrError> {
        self.error.as_ref().map(|e| HotCidrError::Io {
            path: OUTPUT.to_string(),
            message: format!("failed to write progress: {}", e),
        })
    }
}

const OUTPUT: &str = "<output>";

fn output_error(err: &io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op("reconcile")
        .with_message(format!("failed to write progress: {}", err))
}

/// Reconcile `actual` onto `desired` through `connector`.
///
/// # Errors
///
/// - loading either snapshot fails (error from the source)
/// - an action fails; remaining actions are skipped and nothing is rolled back
/// - writing to `out` fails; no further action is started once a progress
///   line could not be written, and an action failure takes precedence
pub fn reconcile(
    desired: &dyn SnapshotSource,
    actual: &dyn SnapshotSource,
    connector: &mut dyn Connector,
    dry_run: bool,
    out: &mut dyn Write,
) -> Result<ChangeSummary, ExError> {
    reconcile_with_context(desired, actual, connector, &RunContext::new(dry_run), out)
}

/// [`reconcile`] under an explicit run context; errors carry its ids.
///
/// # Errors
///
/// Same as [`reconcile`].
pub fn reconcile_with_context(
    desired: &dyn SnapshotSource,
    actual: &dyn SnapshotSource,
    connector: &mut dyn Connector,
    ctx: &RunContext,
    out: &mut dyn Write,
) -> Result<ChangeSummary, ExError> {
    let span = tracing::info_span!(
        "reconcile",
        run_id = %ctx.run_id,
        trace_id = ctx.trace_id.as_ref().map(TraceId::as_str),
        dry_run = ctx.dry_run
    );
    let _guard = span.enter();
    log_op_start!("reconcile", dry_run = ctx.dry_run);
    let start = std::time::Instant::now();

    let result = reconcile_impl(desired, actual, connector, ctx, out).map_err(|e| {
        let e = tag(e, ctx);
        log_op_error!(
            "reconcile",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "reconcile",
        duration_ms = start.elapsed().as_millis() as u64,
        action_count = result.total()
    );
    Ok(result)
}

fn tag(err: ExError, ctx: &RunContext) -> ExError {
    let err = err.with_run_id(ctx.run_id.clone());
    match &ctx.trace_id {
        Some(trace_id) => err.with_trace_id(trace_id.clone()),
        None => err,
    }
}

fn reconcile_impl(
    desired: &dyn SnapshotSource,
    actual: &dyn SnapshotSource,
    connector: &mut dyn Connector,
    ctx: &RunContext,
    out: &mut dyn Write,
) -> Result<ChangeSummary, ExError> {
    let desired = desired.load_snapshot()?;
    let actual = actual.load_snapshot()?;
    let actions = compute_diff(&desired, &actual);

    let options = ExecuteOptions {
        dry_run: ctx.dry_run,
    };
    let mut progress = WriterProgress { out, error: None };
    let outcome = execute(&actions, connector, options, &mut progress);
    let WriterProgress { out, error } = progress;

    let summary = match &outcome {
        Ok(summary) => *summary,
        Err(failure) => failure.summary,
    };
    let summary_written = writeln!(out, "{}", summary).and_then(|()| out.flush());

    match outcome {
        Err(failure) => {
            if let Err(e) = summary_written {
                tracing::warn!(error = %e, "summary line not written");
            }
            Err(ExError::from(failure))
        }
        Ok(summary) => {
            if let Some(e) = error.as_ref().or(summary_written.as_ref().err()) {
                return Err(output_error(e));
            }
            Ok(summary)
        }
    }
}
