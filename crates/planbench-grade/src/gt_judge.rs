use planbench_core::text::clip;
use planbench_core::{MergeCommit, Task};
use planbench_oracle::reply::GradeReply;
use planbench_oracle::{ask, JudgeOracle, Prompt, Templates};
use std::collections::HashMap;

const GT_JUDGE_MAX_TOKENS: u32 = 256;
const COMMIT_MESSAGE_CHARS: usize = 2_000;
const DIFF_CHARS: usize = 8_000;
const PLAN_CHARS: usize = 6_000;
const NOT_AVAILABLE: &str = "N/A";

/// Mined merge commits keyed by `parent_sha`, the state a task starts from.
#[derive(Debug, Default)]
pub struct Evidence {
    by_parent: HashMap<String, MergeCommit>,
}

impl Evidence {
    pub fn new(commits: Vec<MergeCommit>) -> Self {
        let by_parent = commits
            .into_iter()
            .filter(|c| !c.parent_sha.is_empty())
            .map(|c| (c.parent_sha.clone(), c))
            .collect();
        Self { by_parent }
    }

    pub fn for_task(&self, task: &Task) -> Option<&MergeCommit> {
        self.by_parent.get(&task.repo_state_commit)
    }

    pub fn len(&self) -> usize {
        self.by_parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_parent.is_empty()
    }
}

/// Grade (normalized to [0, 1]) of whether the plan reaches the same goal as
/// the real change. The merge's own message and diff are shown when known.
pub fn judge_gt_match(
    reviewer: &dyn JudgeOracle,
    templates: &Templates,
    task: &Task,
    plan: &str,
    evidence: Option<&MergeCommit>,
) -> f64 {
    let gt = &task.ground_truth;
    let files_modified = join(&gt.files_modified);
    let files_created = join(&gt.files_created);
    let libraries_added = join(&gt.libraries_added);
    let key_additions = join(&gt.key_additions);

    let commit_message = evidence
        .map(|c| clip(&c.message, COMMIT_MESSAGE_CHARS))
        .filter(|m| !m.is_empty())
        .unwrap_or(NOT_AVAILABLE);
    let diff_summary = evidence
        .map(|c| clip(&c.diff, DIFF_CHARS))
        .filter(|d| !d.is_empty())
        .unwrap_or(NOT_AVAILABLE);

    let prompt = templates.render(
        Prompt::JudgeGtMatch,
        &[
            ("task_prompt", task.prompt.as_str()),
            ("files_modified", files_modified.as_str()),
            ("files_created", files_created.as_str()),
            ("libraries_added", libraries_added.as_str()),
            ("key_additions", key_additions.as_str()),
            ("commit_message", commit_message),
            ("diff_summary", diff_summary),
            ("plan", clip(plan, PLAN_CHARS)),
        ],
    );
    ask(
        reviewer,
        Prompt::JudgeGtMatch.name(),
        &prompt,
        GT_JUDGE_MAX_TOKENS,
        &GradeReply,
    )
    .resolve(&GradeReply)
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
