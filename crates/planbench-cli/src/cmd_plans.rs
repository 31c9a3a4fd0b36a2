use crate::context::RunContext;
use anyhow::{bail, Result};
use planbench_conductor::{run_plans, ClaudeCodeProducer};
use planbench_miner::GitCli;
use planbench_store::load_tasks;
use tokio_util::sync::CancellationToken;

/// Execute `planbench run-plans`: one plan-mode agent session per task,
/// each at the task's pre-merge commit.
pub fn execute(ctx: &RunContext) -> Result<()> {
    let tasks = load_tasks(&ctx.paths.tasks_json)?;
    let repo = ctx.repo_dir()?;
    if !repo.exists() {
        bail!("repository not found at {}; run `planbench contextize` first", repo.display());
    }
    let producer = ClaudeCodeProducer::new(&ctx.config.claude_cli_path, ctx.config.plan_timeout());
    producer.verify_available()?;
    ctx.paths.ensure_layout()?;

    println!("Running plan mode for {} tasks", tasks.len());
    let cancel = CancellationToken::new();
    ctrlc_cancel(cancel.clone());

    let scm = GitCli::new(&repo);
    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(run_plans(&producer, &scm, &repo, &tasks, &ctx.paths, cancel))?;

    println!(
        "Plans: {} written, {} failed, {} timed out",
        summary.planned, summary.failed, summary.timed_out
    );
    if summary.skipped > 0 {
        println!("Interrupted: {} tasks not attempted", summary.skipped);
    }
    println!("Output: {}", ctx.paths.plans_dir.display());
    Ok(())
}

fn ctrlc_cancel(cancel: CancellationToken) {
    let _ = ctrlc::set_handler(move || {
        cancel.cancel();
    });
}
