mod cmd_contextize;
mod cmd_generate;
mod cmd_grade;
mod cmd_plans;
mod config;
mod context;

use clap::{Parser, Subcommand};
use config::Config;
use context::{default_run_id, RunContext};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "planbench",
    version,
    about = "Benchmark coding-agent plans against real merged changes"
)]
struct Cli {
    /// Config file (default: ./planbench.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Repository URL (overrides repo_url)
    #[arg(long, global = true)]
    repo_url: Option<String>,
    /// Branch to clone (overrides branch)
    #[arg(long, global = true)]
    branch: Option<String>,
    /// Run identifier (default: run_YYYYMMDD_HHMMSS, UTC)
    #[arg(long, global = true)]
    run_id: Option<String>,
    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clone or update the repository and build the repo map
    Contextize,
    /// Mine merge commits and turn a stratified sample into tasks
    GenerateTasks {
        /// Merge commits to walk back (overrides max_merge_commits)
        #[arg(long)]
        max_commits: Option<usize>,
        /// Tasks to produce (overrides max_tasks)
        #[arg(long)]
        max_tasks: Option<usize>,
    },
    /// Run the coding agent in plan mode for every task
    RunPlans,
    /// Grade every plan and write scores.json
    Grade,
    /// contextize, generate-tasks, run-plans, then grade
    All {
        #[arg(long)]
        max_commits: Option<usize>,
        #[arg(long)]
        max_tasks: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let mut config = Config::load(cli.config.as_deref())?;
    config.load_dotenv();
    if let Some(url) = cli.repo_url {
        config.repo_url = url;
    }
    if let Some(branch) = cli.branch {
        config.branch = branch;
    }
    let run_id = cli
        .run_id
        .unwrap_or_else(|| default_run_id(time::OffsetDateTime::now_utc()));
    tracing::info!(run_id = %run_id, "planbench run");
    let ctx = RunContext::new(config, &run_id);

    match cli.cmd {
        Command::Contextize => cmd_contextize::execute(&ctx),
        Command::GenerateTasks {
            max_commits,
            max_tasks,
        } => cmd_generate::execute(&ctx, max_commits, max_tasks),
        Command::RunPlans => cmd_plans::execute(&ctx),
        Command::Grade => cmd_grade::execute(&ctx),
        Command::All {
            max_commits,
            max_tasks,
        } => {
            cmd_contextize::execute(&ctx)?;
            cmd_generate::execute(&ctx, max_commits, max_tasks)?;
            cmd_plans::execute(&ctx)?;
            cmd_grade::execute(&ctx)
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("PLANBENCH_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;
    Ok(())
}
