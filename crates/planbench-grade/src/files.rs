use planbench_core::paths::normalize_all;
use planbench_core::GroundTruth;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// `` `src/foo/bar.ts` `` with a known source extension.
static BACKTICKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`([^`]+\.(?:ts|tsx|js|jsx|py|json|md|yaml|yml|txt|go|rs|rb|java|kt))`").unwrap()
});

/// "Edit src/foo.ts", "modify `lib/x.py`", ...
static AFTER_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:edit|modify|change|update|open)\s+`?([a-zA-Z0-9_./-]+\.[a-zA-Z0-9]+)`?")
        .unwrap()
});

/// Bare `dir/file.ext` tokens; the slash is checked separately.
static BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_/.-]+\.(?:ts|tsx|js|jsx|py|json|md))\b").unwrap()
});

/// File paths a plan mentions, as the union of three pattern heuristics.
/// A path named only as an example counts the same as one the plan edits.
pub fn plan_files(plan: &str) -> BTreeSet<String> {
    let mut found: BTreeSet<String> = BTreeSet::new();
    for re in [&*BACKTICKED, &*AFTER_VERB] {
        found.extend(re.captures_iter(plan).map(|c| c[1].trim().to_string()));
    }
    found.extend(
        BARE.captures_iter(plan)
            .map(|c| c[1].to_string())
            .filter(|p| p.contains('/')),
    );
    normalize_all(&found)
}

/// `(recall, precision)` of the plan's files against the ground-truth files.
/// Recall is 1 when the truth is empty; precision is 1 when the plan names no files.
pub fn file_recall_precision(plan: &str, truth: &GroundTruth) -> (f64, f64) {
    let truth = normalize_all(&truth.all_files());
    let planned = plan_files(plan);
    let hits = truth.intersection(&planned).count() as f64;

    let recall = if truth.is_empty() {
        1.0
    } else {
        hits / truth.len() as f64
    };
    let precision = if planned.is_empty() {
        1.0
    } else {
        hits / planned.len() as f64
    };
    (recall, precision)
}
