//! The three persisted pipeline artifacts: mined commits, tasks, and scores.
//! Each is a single compact JSON array written once per stage and read
//! wholesale by the next.

use anyhow::{Context, Result};
use planbench_core::{GradeResult, MergeCommit, Task};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Serialize to compact JSON and write atomically.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec(value)?;
    crate::write_atomic(path, &data).with_context(|| format!("saving {}", path.display()))?;
    Ok(())
}

/// Load a JSON artifact. Returns None if the file doesn't exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(value))
}

fn load_required<T: DeserializeOwned>(path: &Path, produced_by: &str) -> Result<T> {
    load_json(path)?.with_context(|| {
        format!(
            "{} not found; run `{produced_by}` first",
            path.display()
        )
    })
}

pub fn save_merge_commits(path: &Path, commits: &[MergeCommit]) -> Result<()> {
    save_json(path, commits)
}

/// Mined commits are optional evidence for grading, so absence is `None`.
pub fn load_merge_commits(path: &Path) -> Result<Option<Vec<MergeCommit>>> {
    load_json(path)
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    save_json(path, tasks)
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    load_required(path, "generate-tasks")
}

pub fn save_scores(path: &Path, scores: &[GradeResult]) -> Result<()> {
    save_json(path, scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planbench_core::{CommitCategory, Difficulty, GroundTruth};

    fn sample_task(id: &str) -> Task {
        Task {
            task_id: id.into(),
            prompt: "Add a retry wrapper to the HTTP client".into(),
            repo_state_commit: "a1b2c3d4".into(),
            ground_truth: GroundTruth::default(),
            difficulty: Difficulty::Medium,
            task_type: CommitCategory::BugFix,
        }
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Vec<Task>> = load_json(&dir.path().join("tasks.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn required_artifact_names_producing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tasks(&dir.path().join("tasks.json")).unwrap_err();
        assert!(err.to_string().contains("generate-tasks"));
    }

    #[test]
    fn tasks_persist_as_single_line_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run").join("tasks.json");
        let tasks = vec![sample_task("task_001"), sample_task("task_002")];
        save_tasks(&path, &tasks).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with('['));
        assert!(!raw.contains('\n'));
        assert_eq!(load_tasks(&path).unwrap(), tasks);
    }

    #[test]
    fn scores_keep_error_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        save_scores(&path, &[GradeResult::failed("task_003", "plan not found")]).unwrap();
        let back: Vec<GradeResult> = load_json(&path).unwrap().unwrap();
        assert!(back[0].is_error());
        assert_eq!(back[0].score, 0.0);
    }

    #[test]
    fn merge_commits_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge_commits.json");
        assert!(load_merge_commits(&path).unwrap().is_none());
        save_merge_commits(&path, &[]).unwrap();
        assert_eq!(load_merge_commits(&path).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge_commits.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_merge_commits(&path).unwrap_err();
        assert!(format!("{err:#}").contains("merge_commits.json"));
    }
}
