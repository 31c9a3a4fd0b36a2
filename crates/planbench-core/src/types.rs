use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A commit contained in a merged branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubCommit {
    pub sha: String,
    pub message: String,
    pub diff: String,
}

/// A merge point on the first-parent history, paired with its pre-merge state.
///
/// `diff` is the cumulative diff from `parent_sha` to the merged branch tip;
/// `message` is the merge message followed by one `Commit <short-sha>: ...`
/// entry per sub-commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeCommit {
    pub merge_sha: String,
    pub parent_sha: String,
    pub message: String,
    pub diff: String,
    #[serde(default)]
    pub sub_commits: Vec<SubCommit>,
}

impl MergeCommit {
    pub fn short_sha(&self) -> &str {
        short_sha(&self.merge_sha)
    }
}

/// First 8 characters of a SHA (or the whole string if shorter).
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(8) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}

/// What a historical change actually did. The answer key for grading.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroundTruth {
    pub files_modified: BTreeSet<String>,
    pub files_created: BTreeSet<String>,
    /// Best-effort summary phrases, at most five.
    pub key_additions: Vec<String>,
    pub libraries_added: BTreeSet<String>,
}

impl GroundTruth {
    /// Union of modified and created paths.
    pub fn all_files(&self) -> BTreeSet<String> {
        self.files_modified
            .union(&self.files_created)
            .cloned()
            .collect()
    }
}

/// Change category assigned from a commit message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommitCategory {
    #[serde(rename = "feature_request")]
    Feature,
    #[serde(rename = "bug_fix")]
    BugFix,
    #[serde(rename = "code_refactoring")]
    Refactor,
    #[serde(rename = "do_not_use")]
    DoNotUse,
}

impl CommitCategory {
    /// Categories eligible for sampling, in backfill order.
    pub const SAMPLED: [CommitCategory; 3] = [
        CommitCategory::Feature,
        CommitCategory::BugFix,
        CommitCategory::Refactor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CommitCategory::Feature => "feature_request",
            CommitCategory::BugFix => "bug_fix",
            CommitCategory::Refactor => "code_refactoring",
            CommitCategory::DoNotUse => "do_not_use",
        }
    }
}

impl fmt::Display for CommitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CommitCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "feature_request" => Ok(CommitCategory::Feature),
            "bug_fix" => Ok(CommitCategory::BugFix),
            "code_refactoring" => Ok(CommitCategory::Refactor),
            "do_not_use" => Ok(CommitCategory::DoNotUse),
            other => Err(format!("unknown commit category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// One unit of evaluation: a redacted request plus the answer key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub task_id: String,
    pub prompt: String,
    pub repo_state_commit: String,
    pub ground_truth: GroundTruth,
    pub difficulty: Difficulty,
    pub task_type: CommitCategory,
}

/// One step of a plan, segmented by the judge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClaimStep {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub claims: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Verified,
    Contradicted,
    Unknown,
}

/// Every sub-score of a graded plan, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GradeBreakdown {
    pub verified_and_unknown_claim_ratio: f64,
    pub unknown_claim_ratio: f64,
    pub logical_soundness: f64,
    pub file_recall: f64,
    pub file_precision: f64,
    pub gt_judge: f64,
    pub conciseness: f64,
    pub precision: f64,
    pub tone: f64,
    pub formatting: f64,
}

/// Final per-task output. A failed task carries `error` and no breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeResult {
    pub task_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<GradeBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GradeResult {
    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            score: 0.0,
            breakdown: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
