use crate::config::ANTHROPIC_API_KEY;
use crate::context::RunContext;
use anyhow::Result;
use planbench_core::text::clip;
use planbench_grade::{average_score, Evidence, Grader};
use planbench_oracle::{AnthropicJudge, BraveSearch, CallLog, JudgeOracle, SearchOracle, UnconfiguredJudge};
use planbench_store::{load_merge_commits, load_tasks, save_scores};
use std::sync::Arc;

/// Execute `planbench grade`: score every task's plan and write `scores.json`.
pub fn execute(ctx: &RunContext) -> Result<()> {
    let config = &ctx.config;
    let tasks = load_tasks(&ctx.paths.tasks_json)?;
    ctx.paths.ensure_layout()?;
    let log = ctx.call_log();

    let judge = judge_for(&config.judge_model, ctx, &log);
    let reviewer = judge_for(&config.reviewer_model, ctx, &log);
    let search = BraveSearch::from_env(config.oracle_timeout()).map(|s| s.with_call_log(log.clone()));
    if search.is_none() {
        tracing::warn!("BRAVE_SEARCH_API_KEY not set, every claim will be unknown");
    }

    let repo = ctx.repo_dir()?;
    let repo_map = match ctx.repo_mapper().cached(&repo, false) {
        Ok(map) => clip(&map, config.grade_repo_map_chars).to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "no repo map, grading soundness without it");
            String::new()
        }
    };

    let evidence = Evidence::new(load_merge_commits(&ctx.paths.merge_commits_json)?.unwrap_or_default());
    if evidence.is_empty() {
        tracing::warn!("no mined merge commits, ground-truth judge gets no commit evidence");
    } else {
        tracing::info!(commits = evidence.len(), "indexed merge-commit evidence");
    }

    let grader = Grader {
        judge: judge.as_ref(),
        reviewer: reviewer.as_ref(),
        search: search.as_ref().map(|s| s as &dyn SearchOracle),
        templates: &ctx.templates,
        max_claims: config.max_num_claims_per_task,
        search_top_n: config.search_top_n,
        repo_map: &repo_map,
    };
    println!("Grading {} plans", tasks.len());
    let results = grader.grade_run(&tasks, &ctx.paths, &evidence);
    save_scores(&ctx.paths.scores_json, &results)?;

    for result in &results {
        match &result.error {
            Some(error) => println!("  {}: {:.2} ({error})", result.task_id, result.score),
            None => println!("  {}: {:.2}", result.task_id, result.score),
        }
    }
    println!("Average score: {:.2}", average_score(&results));
    println!("Scores: {}", ctx.paths.scores_json.display());
    Ok(())
}

/// Without a credential grading still runs; every oracle stage falls back.
fn judge_for(model: &str, ctx: &RunContext, log: &Arc<CallLog>) -> Box<dyn JudgeOracle> {
    match AnthropicJudge::from_env(model, ctx.config.oracle_timeout()) {
        Ok(judge) => Box::new(judge.with_call_log(log.clone())),
        Err(e) => {
            tracing::warn!(model, error = %e, "judge unavailable, oracle stages use fallbacks");
            Box::new(UnconfiguredJudge {
                credential: ANTHROPIC_API_KEY,
            })
        }
    }
}
