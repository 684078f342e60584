//! Plan and apply commands
//!
//! The actual side is a local sandbox provider: a state directory loaded
//! into an in-memory cloud, reconciled, and written back after a real apply.

use clap::Args;
use hotcidr_core::{reconcile_with_context, MemoryCloud};
use hotcidr_core_types::{RunContext, TraceId};
use hotcidr_store::{load_snapshot, save_snapshot, RepoDir};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct StateArgs {
    /// Directory holding the desired state (groups/ and boxes.yaml)
    #[arg(long, default_value = ".")]
    pub desired: PathBuf,

    /// Directory holding the sandbox provider state
    #[arg(long)]
    pub actual: PathBuf,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub state: StateArgs,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Print the actions without executing them
    #[arg(long)]
    pub dry_run: bool,
}

pub fn plan(
    args: PlanArgs,
    trace_id: Option<TraceId>,
) -> Result<(), Box<dyn std::error::Error>> {
    run(&args.state, context(true, trace_id))
}

pub fn apply(
    args: ApplyArgs,
    trace_id: Option<TraceId>,
) -> Result<(), Box<dyn std::error::Error>> {
    run(&args.state, context(args.dry_run, trace_id))
}

fn context(dry_run: bool, trace_id: Option<TraceId>) -> RunContext {
    let ctx = RunContext::new(dry_run);
    match trace_id {
        Some(trace_id) => ctx.with_trace_id(trace_id),
        None => ctx,
    }
}

fn run(state: &StateArgs, ctx: RunContext) -> Result<(), Box<dyn std::error::Error>> {
    let mut cloud = MemoryCloud::from_snapshot(&load_snapshot(&state.actual)?)?;
    let live = cloud.snapshot()?;
    let desired = RepoDir::new(&state.desired);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = reconcile_with_context(&desired, &live, &mut cloud, &ctx, &mut out);

    // Applied actions are not rolled back, so persist them even after a failure.
    if !ctx.dry_run {
        save_snapshot(&state.actual, &cloud.snapshot()?)?;
        tracing::info!(actual = %state.actual.display(), "sandbox state saved");
    }

    result?;
    Ok(())
}
