//! jobscaled — the jobscale operator.
//!
//! Wires the scale executor to the embedded job store:
//! - Target manifests (TOML) are applied into the store
//! - `scale` runs a single reconcile pass
//! - `run` repeats it on an interval until Ctrl-C
//! - `prune` enforces history limits only
//!
//! # Usage
//!
//! ```text
//! jobscaled apply worker.toml
//! jobscaled run batch/worker --desired 4 --interval 10
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "jobscaled",
    about = "jobscale — ceiling-bounded job scaling with history cleanup",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to jobscale.toml (defaults apply when absent).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the job store; overrides [daemon].data_dir.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or update a scale target from a TOML manifest.
    Apply {
        manifest: PathBuf,
    },
    /// List targets with their running / completed / failed job counts.
    List,
    /// Run one scale pass for a target.
    Scale {
        /// Target as namespace/name.
        target: String,
        #[command(flatten)]
        request: ScaleArgs,
    },
    /// Run scale passes on an interval until interrupted.
    Run {
        /// Target as namespace/name.
        target: String,
        #[command(flatten)]
        request: ScaleArgs,
        /// Seconds between passes; overrides [daemon].interval_secs.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Delete finished jobs beyond the target's history limits.
    Prune {
        /// Target as namespace/name.
        target: String,
    },
}

#[derive(clap::Args, Clone, Copy)]
struct ScaleArgs {
    /// Number of new jobs wanted.
    #[arg(long)]
    desired: i64,
    /// Maximum concurrently running jobs; defaults to the target's max_replica_count.
    #[arg(long)]
    ceiling: Option<i64>,
    /// Treat the target as inactive: no jobs are created.
    #[arg(long)]
    inactive: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let ctx = commands::Context::load(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Command::Apply { manifest } => commands::apply(&ctx, &manifest),
        Command::List => commands::list(&ctx).await,
        Command::Scale { target, request } => {
            commands::scale(&ctx, &target, request.into()).await
        }
        Command::Run {
            target,
            request,
            interval,
        } => commands::run(&ctx, &target, request.into(), interval).await,
        Command::Prune { target } => commands::prune(&ctx, &target).await,
    }
}

impl From<ScaleArgs> for commands::ScaleRequest {
    fn from(args: ScaleArgs) -> Self {
        Self {
            is_active: !args.inactive,
            desired: args.desired,
            ceiling: args.ceiling,
        }
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,jobscaled=debug,jobscale=debug"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
