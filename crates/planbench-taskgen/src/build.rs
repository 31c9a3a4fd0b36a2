use planbench_core::ground_truth;
use planbench_core::text::truncate_chars;
use planbench_core::{short_sha, CommitCategory, MergeCommit, Task};
use planbench_oracle::reply::TaskPromptReply;
use planbench_oracle::{ask, JudgeOracle, OracleReply, Prompt, Templates};
use std::collections::BTreeMap;

const TASK_GEN_MAX_TOKENS: u32 = 1024;

/// `task_001`, `task_002`, ...
pub fn task_id(seq: usize) -> String {
    format!("task_{seq:03}")
}

/// Builds one [`Task`] per selected commit: ground truth from the diff, and a
/// judge-written request that hides the solution.
pub struct TaskBuilder<'a> {
    judge: &'a dyn JudgeOracle,
    templates: &'a Templates,
    repo_map: String,
    diff_max_chars: usize,
}

impl<'a> TaskBuilder<'a> {
    pub fn new(
        judge: &'a dyn JudgeOracle,
        templates: &'a Templates,
        repo_map: &str,
        repo_map_max_chars: usize,
        diff_max_chars: usize,
    ) -> Self {
        Self {
            judge,
            templates,
            repo_map: truncate_chars(repo_map, repo_map_max_chars),
            diff_max_chars,
        }
    }

    /// Build the task with sequence number `seq` (1-based). Never fails: an
    /// oracle outage yields a placeholder prompt.
    pub fn build(&self, seq: usize, commit: &MergeCommit, category: CommitCategory) -> Task {
        let id = task_id(seq);
        let diff = truncate_chars(&commit.diff, self.diff_max_chars);
        let prompt = self.templates.render(
            Prompt::TaskGen,
            &[
                ("repo_map", self.repo_map.as_str()),
                ("commit_message", commit.message.as_str()),
                ("diff", diff.as_str()),
            ],
        );

        let reply = ask(
            self.judge,
            Prompt::TaskGen.name(),
            &prompt,
            TASK_GEN_MAX_TOKENS,
            &TaskPromptReply,
        );
        if let OracleReply::Unavailable(reason) = &reply {
            tracing::warn!(task = %id, merge = short_sha(&commit.merge_sha), %reason, "task prompt generation failed");
        }
        let (request, difficulty) = reply.resolve(&TaskPromptReply);

        Task {
            task_id: id,
            prompt: request,
            repo_state_commit: commit.parent_sha.clone(),
            ground_truth: ground_truth::extract(&commit.diff, &commit.message),
            difficulty,
            task_type: category,
        }
    }

    /// Build tasks in selection order, numbering from 1.
    pub fn build_all(&self, selected: &[(MergeCommit, CommitCategory)]) -> Vec<Task> {
        selected
            .iter()
            .enumerate()
            .map(|(i, (commit, category))| {
                let task = self.build(i + 1, commit, *category);
                tracing::info!(task = %task.task_id, category = %task.task_type, "built task");
                task
            })
            .collect()
    }
}

/// Task count per category, for the generation summary.
pub fn category_counts(tasks: &[Task]) -> BTreeMap<CommitCategory, usize> {
    let mut counts: BTreeMap<CommitCategory, usize> =
        CommitCategory::SAMPLED.iter().map(|c| (*c, 0)).collect();
    for task in tasks {
        *counts.entry(task.task_type).or_default() += 1;
    }
    counts
}
