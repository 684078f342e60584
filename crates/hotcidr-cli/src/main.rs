//! HotCIDR CLI
//!
//! Command-line interface for reviewing and applying security-group changes

use clap::{Parser, Subcommand, ValueEnum};
use hotcidr_core::logging_facility::{init, Profile};
use hotcidr_core_types::TraceId;

mod commands;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "hotcidr")]
#[command(about = "HotCIDR - Security group reconciliation", long_about = None)]
struct Cli {
    /// Diagnostic log format on stderr (level via RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    /// Caller-supplied trace id attached to errors and log spans
    #[arg(long, env = "HOTCIDR_TRACE_ID", global = true)]
    trace_id: Option<TraceId>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the actions that would converge actual state onto desired state
    Plan(commands::reconcile::PlanArgs),
    /// Converge actual state onto desired state
    Apply(commands::reconcile::ApplyArgs),
}

fn main() {
    let cli = Cli::parse();

    init(match cli.log_format {
        LogFormat::Pretty => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    let result = match cli.command {
        Commands::Plan(args) => commands::reconcile::plan(args, cli.trace_id),
        Commands::Apply(args) => commands::reconcile::apply(args, cli.trace_id),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
