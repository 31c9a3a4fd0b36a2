use crate::aggregate::{round2, scored};
use crate::claims::{extract_claims, ClaimVerifier};
use crate::files::file_recall_precision;
use crate::gt_judge::{judge_gt_match, Evidence};
use crate::quality::text_quality;
use crate::soundness::logical_soundness;
use planbench_core::{GradeBreakdown, GradeResult, MergeCommit, Task};
use planbench_oracle::{JudgeOracle, SearchOracle, Templates};
use planbench_store::RunPaths;
use std::io::ErrorKind;

pub const PLAN_NOT_FOUND: &str = "plan not found";

/// Everything one grading pass reads. Shared read-only across tasks.
///
/// `judge` handles claim extraction, claim verification, and prose quality;
/// `reviewer` handles the two holistic grades (soundness, ground-truth match).
pub struct Grader<'a> {
    pub judge: &'a dyn JudgeOracle,
    pub reviewer: &'a dyn JudgeOracle,
    pub search: Option<&'a dyn SearchOracle>,
    pub templates: &'a Templates,
    pub max_claims: usize,
    pub search_top_n: usize,
    pub repo_map: &'a str,
}

impl Grader<'_> {
    /// Run every stage on one plan. Oracle trouble only lowers individual
    /// sub-scores; this never fails.
    pub fn grade(&self, task: &Task, plan: &str, evidence: Option<&MergeCommit>) -> GradeResult {
        let steps = extract_claims(self.judge, self.templates, plan);
        let check = ClaimVerifier {
            judge: self.judge,
            search: self.search,
            templates: self.templates,
            max_claims: self.max_claims,
            top_n: self.search_top_n,
        }
        .verify(&steps);
        let soundness = logical_soundness(self.reviewer, self.templates, plan, &steps, self.repo_map);
        let (file_recall, file_precision) = file_recall_precision(plan, &task.ground_truth);
        let gt_judge = judge_gt_match(self.reviewer, self.templates, task, plan, evidence);
        let style = text_quality(self.judge, self.templates, plan);

        let breakdown = GradeBreakdown {
            verified_and_unknown_claim_ratio: check.verified_and_unknown_ratio,
            unknown_claim_ratio: check.unknown_ratio,
            logical_soundness: soundness,
            file_recall,
            file_precision,
            gt_judge,
            conciseness: style.conciseness,
            precision: style.precision,
            tone: style.tone,
            formatting: style.formatting,
        };
        scored(&task.task_id, breakdown)
    }

    /// Grade every task whose plan exists under the run's plans dir. A task
    /// without a readable plan is recorded as failed and the batch continues.
    pub fn grade_run(&self, tasks: &[Task], paths: &RunPaths, evidence: &Evidence) -> Vec<GradeResult> {
        tasks
            .iter()
            .map(|task| {
                let path = paths.plan_md(&task.task_id);
                let result = match std::fs::read_to_string(&path) {
                    Ok(plan) => self.grade(task, &plan, evidence.for_task(task)),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        tracing::warn!(task = %task.task_id, "no plan to grade");
                        GradeResult::failed(&task.task_id, PLAN_NOT_FOUND)
                    }
                    Err(e) => {
                        tracing::warn!(task = %task.task_id, path = %path.display(), error = %e, "unreadable plan");
                        GradeResult::failed(&task.task_id, format!("unreadable plan: {e}"))
                    }
                };
                tracing::info!(task = %result.task_id, score = result.score, "graded");
                result
            })
            .collect()
    }
}

/// Mean score over all results, failed ones counting as zero.
pub fn average_score(results: &[GradeResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    round2(results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planbench_core::{CommitCategory, Difficulty, GroundTruth};
    use planbench_oracle::{ScriptedJudge, ScriptedSearch, UnconfiguredJudge};

    fn task(id: &str) -> Task {
        Task {
            task_id: id.into(),
            prompt: "Retry login on flaky networks".into(),
            repo_state_commit: "p1".into(),
            ground_truth: GroundTruth {
                files_modified: ["src/auth/login.ts".to_string()].into(),
                files_created: ["src/retry.ts".to_string()].into(),
                ..GroundTruth::default()
            },
            difficulty: Difficulty::Medium,
            task_type: CommitCategory::Feature,
        }
    }

    const PLAN: &str = "1. Create `src/retry.ts` with a retry helper.\n2. Edit src/auth/login.ts to use it.";

    fn scripted_judge() -> ScriptedJudge {
        ScriptedJudge::new()
            .on(
                "claim_extract",
                r#"{"steps": [{"intent": "add helper", "claims": ["fetch rejects on network errors", "ky has retry"]}]}"#,
            )
            .on("verify_claim", "VERIFIED")
            .on("judge_style", "CONCISENESS: 5\nPRECISION: 5\nTONE: 5\nFORMATTING: 5")
    }

    fn scripted_reviewer() -> ScriptedJudge {
        ScriptedJudge::new()
            .on("logical_soundness", "SCORE: 5")
            .on("judge_gt_match", "GRADE: 5")
    }

    #[test]
    fn perfect_plan_scores_full_marks() {
        let judge = scripted_judge();
        let reviewer = scripted_reviewer();
        let search = ScriptedSearch::with_results(["fetch rejects on network failure"]);
        let templates = Templates::builtin();
        let grader = Grader {
            judge: &judge,
            reviewer: &reviewer,
            search: Some(&search),
            templates: &templates,
            max_claims: 3,
            search_top_n: 5,
            repo_map: "",
        };

        let result = grader.grade(&task("task_001"), PLAN, None);
        assert_eq!(result.score, 100.0);
        let b = result.breakdown.unwrap();
        assert_eq!(b.unknown_claim_ratio, 0.0);
        assert_eq!((b.file_recall, b.file_precision), (1.0, 1.0));
        assert_eq!(judge.calls_for("verify_claim"), 2);
        assert_eq!(reviewer.calls_for("judge_gt_match"), 1);
        assert_eq!(judge.calls_for("judge_gt_match"), 0);
    }

    #[test]
    fn unconfigured_oracles_degrade_to_neutral() {
        let judge = UnconfiguredJudge {
            credential: "ANTHROPIC_API_KEY",
        };
        let templates = Templates::builtin();
        let grader = Grader {
            judge: &judge,
            reviewer: &judge,
            search: None,
            templates: &templates,
            max_claims: 3,
            search_top_n: 5,
            repo_map: "",
        };

        let result = grader.grade(&task("task_001"), PLAN, None);
        let b = result.breakdown.unwrap();
        assert_eq!(b.verified_and_unknown_claim_ratio, 0.0);
        assert_eq!(b.logical_soundness, 0.5);
        assert_eq!(b.gt_judge, 0.5);
        assert_eq!(b.tone, 0.5);
        // 0 + 10 + 10 + 10 + 10 + 4 * 2.5
        assert_eq!(result.score, 50.0);
        assert!(!result.is_error());
    }

    #[test]
    fn missing_plan_is_recorded_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::discover(dir.path(), &dir.path().join("logs"), "run_test");
        std::fs::create_dir_all(paths.plan_dir("task_002")).unwrap();
        std::fs::write(paths.plan_md("task_002"), PLAN).unwrap();

        let judge = scripted_judge();
        let reviewer = scripted_reviewer();
        let templates = Templates::builtin();
        let grader = Grader {
            judge: &judge,
            reviewer: &reviewer,
            search: None,
            templates: &templates,
            max_claims: 3,
            search_top_n: 5,
            repo_map: "",
        };

        let results = grader.grade_run(
            &[task("task_001"), task("task_002")],
            &paths,
            &Evidence::default(),
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].task_id, "task_001");
        assert_eq!(results[0].score, 0.0);
        assert_eq!(results[0].error.as_deref(), Some(PLAN_NOT_FOUND));
        assert!(results[0].breakdown.is_none());
        assert_eq!(results[1].task_id, "task_002");
        assert!(results[1].score > 0.0);
        assert!(!results[1].is_error());
    }

    #[test]
    fn evidence_reaches_the_reviewer() {
        let judge = scripted_judge();
        let reviewer = scripted_reviewer();
        let templates = Templates::builtin();
        let grader = Grader {
            judge: &judge,
            reviewer: &reviewer,
            search: None,
            templates: &templates,
            max_claims: 3,
            search_top_n: 5,
            repo_map: "<repo/>",
        };
        let commit = MergeCommit {
            merge_sha: "m1".into(),
            parent_sha: "p1".into(),
            message: "Merge branch 'retry'".into(),
            diff: String::new(),
            sub_commits: Vec::new(),
        };
        grader.grade(&task("task_001"), PLAN, Some(&commit));

        let calls = reviewer.calls();
        let gt_prompt = calls
            .iter()
            .find(|(label, _)| label == "judge_gt_match")
            .map(|(_, p)| p.as_str())
            .unwrap();
        assert!(gt_prompt.contains("Merge branch 'retry'"));
        assert!(gt_prompt.contains("Real diff (excerpt):\nN/A"));
    }

    #[test]
    fn average_counts_failures_as_zero() {
        let mut ok = GradeResult::failed("a", "x");
        ok.score = 80.0;
        ok.error = None;
        let results = [ok, GradeResult::failed("b", PLAN_NOT_FOUND)];
        assert_eq!(average_score(&results), 40.0);
        assert_eq!(average_score(&[]), 0.0);
    }
}
