//! Sequential action executor
//!
//! Actions run strictly in order, one at a time. Every action is announced to
//! the progress sink before it runs. In dry-run mode the announcement is all
//! that happens. The first failure stops the run; actions already applied
//! stay applied.
//!
//! The returned [`ChangeSummary`] always covers the whole planned sequence,
//! including on failure. It reports what was planned, not what succeeded.

use thiserror::Error;

use crate::actions::Action;
use crate::connector::Connector;
use crate::errors::{ExError, HotCidrError};
use crate::summary::ChangeSummary;
use crate::{log_op_end, log_op_error, log_op_start};

/// Receives one notification per action, before the action runs
pub trait ProgressSink {
    /// `index` is 1-based; `total` is the length of the planned sequence
    fn on_action(&mut self, index: usize, total: usize, description: &str);

    /// A reporting failure that stops the run before the next action
    fn failure(&self) -> Option<HotCidrError> {
        None
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize, &str),
{
    fn on_action(&mut self, index: usize, total: usize, description: &str) {
        self(index, total, description)
    }
}

/// Sink that drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_action(&mut self, _index: usize, _total: usize, _description: &str) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecuteOptions {
    /// Announce actions without calling the connector
    pub dry_run: bool,
}

impl ExecuteOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// First failure of a run, with the summary of the full plan
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Action {index} ({description}) failed: {source}")]
pub struct ExecutionError {
    /// 1-based position of the failed action
    pub index: usize,
    pub description: String,
    pub source: HotCidrError,
    pub summary: ChangeSummary,
}

impl From<ExecutionError> for ExError {
    fn from(err: ExecutionError) -> Self {
        let ex = ExError::from(err.source);
        let message = format!("{} failed: {}", err.description, ex.message());
        ex.with_entity_id(format!("action {}", err.index))
            .with_message(message)
    }
}

/// Apply `actions` in order through `connector`.
///
/// # Errors
///
/// The first action failure, as an [`ExecutionError`] carrying its 1-based
/// index and the summary of the full sequence. Later actions are not run.
pub fn execute(
    actions: &[Action],
    connector: &mut dyn Connector,
    options: ExecuteOptions,
    progress: &mut dyn ProgressSink,
) -> Result<ChangeSummary, ExecutionError> {
    let total = actions.len();
    log_op_start!("execute", action_count = total, dry_run = options.dry_run);
    let start = std::time::Instant::now();

    let summary = ChangeSummary::from_actions(actions);

    for (offset, action) in actions.iter().enumerate() {
        let index = offset + 1;
        let description = action.describe();
        if let Some(source) = progress.failure() {
            return Err(abort(index, description, source, summary, start));
        }
        progress.on_action(index, total, &description);

        if options.dry_run {
            tracing::debug!(action_index = index, "dry run, connector not called");
            continue;
        }

        if let Err(source) = action.apply(connector) {
            return Err(abort(index, description, source, summary, start));
        }
    }

    log_op_end!(
        "execute",
        duration_ms = start.elapsed().as_millis() as u64,
        action_count = total
    );
    Ok(summary)
}

fn abort(
    index: usize,
    description: String,
    source: HotCidrError,
    summary: ChangeSummary,
    start: std::time::Instant,
) -> ExecutionError {
    log_op_error!(
        "execute",
        source.clone(),
        duration_ms = start.elapsed().as_millis() as u64,
        action_index = index
    );
    ExecutionError {
        index,
        description,
        source,
        summary,
    }
}
