use crate::producer::{plan_session_id, PlanOutcome, PlanProducer};
use anyhow::{Context, Result};
use planbench_core::Task;
use planbench_miner::SourceControl;
use planbench_store::{write_atomic, RunPaths};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Per-run tally of plan sessions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub planned: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Tasks never attempted because the run was cancelled.
    pub skipped: usize,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.planned + self.failed + self.timed_out
    }
}

/// Run the producer once per task, sequentially, each at its own
/// `repo_state_commit`. Writes `plans/<task_id>/plan.md` on success and
/// `plans/<task_id>/error.txt` otherwise; one task's failure never stops
/// the rest. Only filesystem errors on the run directory are returned.
pub async fn run_plans(
    producer: &dyn PlanProducer,
    scm: &dyn SourceControl,
    repo: &Path,
    tasks: &[Task],
    paths: &RunPaths,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for (i, task) in tasks.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.skipped = tasks.len() - i;
            tracing::warn!(skipped = summary.skipped, "plan run cancelled");
            break;
        }
        let id = task.task_id.as_str();
        let dir = paths.plan_dir(id);
        std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        clear_stale(paths, id)?;

        if let Err(e) = scm.checkout(&task.repo_state_commit) {
            tracing::warn!(task = id, error = %e, "checkout failed");
            write_error(paths, id, &format!("checkout of {} failed: {e}", task.repo_state_commit))?;
            summary.failed += 1;
            continue;
        }

        let session_id = plan_session_id(&paths.run_id, id).to_string();
        let transcript = paths.plan_raw(id);
        tracing::info!(task = id, commit = %task.repo_state_commit, "running plan mode");
        let outcome = match producer
            .produce(&task.prompt, &session_id, repo, Some(&transcript), cancel.clone())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => PlanOutcome::Crash {
                error: format!("{e:#}"),
            },
        };

        match outcome {
            PlanOutcome::Plan(text) => {
                write_atomic(&paths.plan_md(id), text.as_bytes())?;
                tracing::info!(task = id, chars = text.len(), "plan written");
                summary.planned += 1;
            }
            PlanOutcome::Timeout => {
                write_error(paths, id, "Plan run timed out.")?;
                tracing::warn!(task = id, "plan run timed out");
                summary.timed_out += 1;
            }
            PlanOutcome::NoPlan { detail } => {
                write_error(paths, id, &format!("No plan found: {detail}"))?;
                tracing::warn!(task = id, %detail, "no plan in session output");
                summary.failed += 1;
            }
            PlanOutcome::Crash { error } => {
                write_error(paths, id, &error)?;
                tracing::warn!(task = id, %error, "plan run failed");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

fn write_error(paths: &RunPaths, task_id: &str, message: &str) -> Result<()> {
    write_atomic(&paths.plan_error(task_id), message.as_bytes())
}

/// A rerun must not leave a previous plan next to a fresh error, or the reverse.
fn clear_stale(paths: &RunPaths, task_id: &str) -> Result<()> {
    for path in [paths.plan_md(task_id), paths.plan_error(task_id)] {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
    Ok(())
}
