use crate::classify::CategorySource;
use planbench_core::{short_sha, CommitCategory, MergeCommit};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Target category mix for a sample of `max_tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotas {
    pub feature: usize,
    pub bug_fix: usize,
    pub refactor: usize,
}

impl Quotas {
    /// 30% bug fixes, 20% refactors, the rest features. Halves round to even.
    pub fn for_tasks(max_tasks: usize) -> Self {
        let share = |pct: f64| ((pct * max_tasks as f64).round_ties_even() as usize).min(max_tasks);
        let bug_fix = share(0.3);
        let refactor = share(0.2).min(max_tasks - bug_fix);
        Self {
            feature: max_tasks - bug_fix - refactor,
            bug_fix,
            refactor,
        }
    }

    pub fn get(&self, category: CommitCategory) -> usize {
        match category {
            CommitCategory::Feature => self.feature,
            CommitCategory::BugFix => self.bug_fix,
            CommitCategory::Refactor => self.refactor,
            CommitCategory::DoNotUse => 0,
        }
    }

    fn met_by(&self, buckets: &BTreeMap<CommitCategory, Vec<MergeCommit>>) -> bool {
        CommitCategory::SAMPLED
            .iter()
            .all(|c| buckets.get(c).map_or(0, Vec::len) >= self.get(*c))
    }
}

/// Draw up to `max_tasks` commits honoring [`Quotas`].
///
/// Commits are shuffled, then classified one at a time until every quota is
/// filled or the input runs out; `DoNotUse` commits are dropped. Each
/// category contributes up to its quota (Feature, BugFix, Refactor order),
/// and any shortfall is backfilled from the leftovers in the same order.
pub fn sample<R: Rng + ?Sized>(
    mut commits: Vec<MergeCommit>,
    max_tasks: usize,
    classifier: &dyn CategorySource,
    rng: &mut R,
) -> Vec<(MergeCommit, CommitCategory)> {
    commits.shuffle(rng);
    let quotas = Quotas::for_tasks(max_tasks);

    let mut buckets: BTreeMap<CommitCategory, Vec<MergeCommit>> = CommitCategory::SAMPLED
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();
    let mut classified = 0usize;
    for commit in commits {
        if quotas.met_by(&buckets) {
            break;
        }
        let category = classifier.category(&commit.message);
        classified += 1;
        if category == CommitCategory::DoNotUse {
            tracing::debug!(merge = short_sha(&commit.merge_sha), "do_not_use, skipping");
            continue;
        }
        tracing::debug!(merge = short_sha(&commit.merge_sha), %category, "classified");
        buckets.entry(category).or_default().push(commit);
    }

    let mut selected = Vec::with_capacity(max_tasks);
    let mut leftovers = Vec::new();
    for category in CommitCategory::SAMPLED {
        let mut bucket = buckets.remove(&category).unwrap_or_default();
        let rest = bucket.split_off(quotas.get(category).min(bucket.len()));
        selected.extend(bucket.into_iter().map(|c| (c, category)));
        leftovers.extend(rest.into_iter().map(|c| (c, category)));
    }
    let shortfall = max_tasks.saturating_sub(selected.len());
    selected.extend(leftovers.into_iter().take(shortfall));

    tracing::info!(
        classified,
        selected = selected.len(),
        target = max_tasks,
        "sampled commits"
    );
    selected
}
