use crate::config::{require_env, ANTHROPIC_API_KEY};
use crate::context::RunContext;
use anyhow::{bail, Context, Result};
use planbench_miner::{history_rev, mine, GitCli, MineOptions};
use planbench_oracle::AnthropicJudge;
use planbench_store::{save_merge_commits, save_tasks};
use planbench_taskgen::{category_counts, sample, CommitClassifier, TaskBuilder};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Execute `planbench generate-tasks`: mine merges, classify and sample them,
/// and write one task per selected merge.
pub fn execute(ctx: &RunContext, max_commits: Option<usize>, max_tasks: Option<usize>) -> Result<()> {
    require_env(ANTHROPIC_API_KEY)?;
    let config = &ctx.config;
    let repo = ctx.repo_dir()?;
    if !repo.exists() {
        bail!("repository not found at {}; run `planbench contextize` first", repo.display());
    }
    ctx.paths.ensure_layout()?;

    let opts = MineOptions {
        max_commits: max_commits.unwrap_or(config.max_merge_commits),
        diff_max_bytes: config.mine_diff_max_bytes,
    };
    let scm = GitCli::new(&repo);
    let rev = history_rev(&scm, config.branch());
    let commits = mine(&scm.with_history_rev(rev), opts).context("mine merge history")?;
    save_merge_commits(&ctx.paths.merge_commits_json, &commits)?;
    println!("Mined {} merge commits", commits.len());
    if commits.is_empty() {
        bail!("no merge commits found in {}", repo.display());
    }

    let repo_map = ctx
        .repo_mapper()
        .cached(&repo, false)
        .context("load repo map")?;
    let judge = AnthropicJudge::from_env(&config.judge_model, config.oracle_timeout())?
        .with_call_log(ctx.call_log());

    let mut rng = match config.sample_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let classifier = CommitClassifier::new(&judge, &ctx.templates);
    let max_tasks = max_tasks.unwrap_or(config.max_tasks);
    let selected = sample(commits, max_tasks, &classifier, &mut rng);
    tracing::info!(selected = selected.len(), max_tasks, "sampled merge commits");

    let builder = TaskBuilder::new(
        &judge,
        &ctx.templates,
        &repo_map,
        config.repo_map_max_chars,
        config.task_diff_max_chars,
    );
    let tasks = builder.build_all(&selected);
    save_tasks(&ctx.paths.tasks_json, &tasks)?;

    println!("Generated {} tasks -> {}", tasks.len(), ctx.paths.tasks_json.display());
    for (category, count) in category_counts(&tasks) {
        println!("  {category}: {count}");
    }
    Ok(())
}
