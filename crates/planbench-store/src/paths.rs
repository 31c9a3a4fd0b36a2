use std::path::{Path, PathBuf};

/// Shared repomix output, reused across runs.
pub const REPOMIX_OUTPUT: &str = "repomix-output.xml";
/// Repomix output with the `<files>` section stripped.
pub const REPOMIX_OUTPUT_COMPRESSED: &str = "repomix-output-compressed.xml";

/// Every on-disk location a pipeline run touches.
///
/// Repositories and the repo map live directly under `data_dir` and are shared
/// by all runs; per-run artifacts live under `data_dir/<run_id>/`, and oracle
/// call logs under `logs_dir/<run_id>/`.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub run_id: String,
    pub data_dir: PathBuf,
    pub repos_dir: PathBuf,
    pub run_dir: PathBuf,
    pub merge_commits_json: PathBuf,
    pub tasks_json: PathBuf,
    pub plans_dir: PathBuf,
    pub scores_json: PathBuf,
    pub logs_dir: PathBuf,
}

impl RunPaths {
    /// Derive all paths for a run. Pure computation, no I/O.
    pub fn discover(data_dir: impl Into<PathBuf>, logs_root: &Path, run_id: &str) -> Self {
        let data_dir = data_dir.into();
        let run_dir = data_dir.join(run_id);
        Self {
            run_id: run_id.to_string(),
            repos_dir: data_dir.join("repos"),
            merge_commits_json: run_dir.join("merge_commits.json"),
            tasks_json: run_dir.join("tasks.json"),
            plans_dir: run_dir.join("plans"),
            scores_json: run_dir.join("scores.json"),
            logs_dir: logs_root.join(run_id),
            run_dir,
            data_dir,
        }
    }

    /// Create the run and log directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.repos_dir, &self.run_dir, &self.plans_dir, &self.logs_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Clone location for a repository slug.
    pub fn repo_dir(&self, slug: &str) -> PathBuf {
        self.repos_dir.join(slug)
    }

    /// Per-task plan directory: `plans/<task_id>/`.
    pub fn plan_dir(&self, task_id: &str) -> PathBuf {
        self.plans_dir.join(task_id)
    }

    pub fn plan_md(&self, task_id: &str) -> PathBuf {
        self.plan_dir(task_id).join("plan.md")
    }

    /// Raw stream-json capture of the agent session.
    pub fn plan_raw(&self, task_id: &str) -> PathBuf {
        self.plan_dir(task_id).join("plan_raw.jsonl")
    }

    pub fn plan_error(&self, task_id: &str) -> PathBuf {
        self.plan_dir(task_id).join("error.txt")
    }
}
