use crate::git::{GitError, SourceControl};
use planbench_core::diff;
use planbench_core::{short_sha, MergeCommit, SubCommit};

#[derive(Debug, Clone, Copy)]
pub struct MineOptions {
    /// How many first-parent merges to walk back.
    pub max_commits: usize,
    /// Cap applied to every stored diff.
    pub diff_max_bytes: usize,
}

/// Walk the last `max_commits` merges and assemble each with its pre-merge
/// state, sub-commits, cumulative diff, and combined message.
///
/// Only an unreadable history is fatal. A merge whose first parent cannot be
/// resolved is skipped; any other per-commit failure leaves that field empty.
pub fn mine(scm: &dyn SourceControl, opts: MineOptions) -> Result<Vec<MergeCommit>, GitError> {
    let merges = scm.merge_history(opts.max_commits)?;
    tracing::info!(count = merges.len(), "found merge commits");

    let mut mined = Vec::with_capacity(merges.len());
    for merge_sha in merges {
        let parent_sha = match scm.resolve_parent(&merge_sha) {
            Ok(sha) => sha,
            Err(e) => {
                tracing::debug!(merge = short_sha(&merge_sha), error = %e, "no first parent, skipping");
                continue;
            }
        };
        mined.push(mine_one(scm, merge_sha, parent_sha, opts.diff_max_bytes));
    }
    Ok(mined)
}

fn mine_one(
    scm: &dyn SourceControl,
    merge_sha: String,
    parent_sha: String,
    diff_max_bytes: usize,
) -> MergeCommit {
    let short = short_sha(&merge_sha).to_string();
    let merge_message = or_empty(scm.message(&merge_sha), "merge message", &short);

    let (diff_text, sub_commits) = match scm.branch_tip(&merge_sha) {
        Ok(tip) => {
            let diff_text = or_empty(scm.diff_between(&parent_sha, &tip), "merge diff", &short);
            let shas = or_empty(scm.commits_between(&parent_sha, &tip), "sub-commit list", &short);
            let subs = shas
                .into_iter()
                .map(|sha| mine_sub_commit(scm, sha, diff_max_bytes))
                .collect();
            (diff_text, subs)
        }
        Err(e) => {
            tracing::warn!(merge = %short, error = %e, "branch tip unresolved");
            (String::new(), Vec::new())
        }
    };

    MergeCommit {
        message: combined_message(&merge_message, &sub_commits),
        diff: diff::prepare(&diff_text, diff_max_bytes),
        merge_sha,
        parent_sha,
        sub_commits,
    }
}

fn mine_sub_commit(scm: &dyn SourceControl, sha: String, diff_max_bytes: usize) -> SubCommit {
    let short = short_sha(&sha).to_string();
    let message = or_empty(scm.message(&sha), "sub-commit message", &short);
    let diff_text = or_empty(scm.commit_diff(&sha), "sub-commit diff", &short);
    SubCommit {
        sha,
        message,
        diff: diff::prepare(&diff_text, diff_max_bytes),
    }
}

/// Merge message, then one `Commit <short-sha>: <message>` entry per
/// sub-commit in the order given.
pub fn combined_message(merge_message: &str, sub_commits: &[SubCommit]) -> String {
    let mut out = merge_message.to_string();
    for sub in sub_commits {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("Commit {}: {}", short_sha(&sub.sha), sub.message));
    }
    out
}

fn or_empty<T: Default>(result: Result<T, GitError>, what: &str, merge: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(merge, error = %e, "failed to read {what}, leaving empty");
        T::default()
    })
}
