use planbench_core::{GradeBreakdown, GradeResult};

/// One weighted rubric axis. Weights are whole percentages.
#[derive(Clone, Copy)]
pub struct Weight {
    pub axis: &'static str,
    pub percent: u32,
    pub value: fn(&GradeBreakdown) -> f64,
}

/// Claim verification 40, ground truth 40, prose quality 20.
/// `unknown_claim_ratio` is diagnostic only and carries no weight.
pub const WEIGHTS: [Weight; 9] = [
    Weight {
        axis: "verified_and_unknown_claim_ratio",
        percent: 20,
        value: |b| b.verified_and_unknown_claim_ratio,
    },
    Weight {
        axis: "logical_soundness",
        percent: 20,
        value: |b| b.logical_soundness,
    },
    Weight {
        axis: "file_recall",
        percent: 10,
        value: |b| b.file_recall,
    },
    Weight {
        axis: "file_precision",
        percent: 10,
        value: |b| b.file_precision,
    },
    Weight {
        axis: "gt_judge",
        percent: 20,
        value: |b| b.gt_judge,
    },
    Weight {
        axis: "conciseness",
        percent: 5,
        value: |b| b.conciseness,
    },
    Weight {
        axis: "precision",
        percent: 5,
        value: |b| b.precision,
    },
    Weight {
        axis: "tone",
        percent: 5,
        value: |b| b.tone,
    },
    Weight {
        axis: "formatting",
        percent: 5,
        value: |b| b.formatting,
    },
];

/// Weighted rubric score in [0, 100], rounded to two decimals.
pub fn aggregate(breakdown: &GradeBreakdown) -> f64 {
    let score: f64 = WEIGHTS
        .iter()
        .map(|w| f64::from(w.percent) * (w.value)(breakdown))
        .sum();
    round2(score)
}

/// A graded task: the score alongside every sub-score that produced it,
/// including the unweighted diagnostics.
pub fn scored(task_id: impl Into<String>, breakdown: GradeBreakdown) -> GradeResult {
    GradeResult {
        task_id: task_id.into(),
        score: aggregate(&breakdown),
        breakdown: Some(breakdown),
        error: None,
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(v: f64) -> GradeBreakdown {
        GradeBreakdown {
            verified_and_unknown_claim_ratio: v,
            unknown_claim_ratio: v,
            logical_soundness: v,
            file_recall: v,
            file_precision: v,
            gt_judge: v,
            conciseness: v,
            precision: v,
            tone: v,
            formatting: v,
        }
    }

    #[test]
    fn weights_sum_to_one_hundred() {
        assert_eq!(WEIGHTS.iter().map(|w| w.percent).sum::<u32>(), 100);
    }

    #[test]
    fn extremes() {
        assert_eq!(aggregate(&uniform(1.0)), 100.0);
        assert_eq!(aggregate(&uniform(0.0)), 0.0);
        assert_eq!(aggregate(&uniform(0.5)), 50.0);
    }

    #[test]
    fn unknown_ratio_is_unweighted() {
        let mut b = uniform(1.0);
        b.unknown_claim_ratio = 0.0;
        assert_eq!(aggregate(&b), 100.0);
    }

    #[test]
    fn mixed_breakdown() {
        let b = GradeBreakdown {
            verified_and_unknown_claim_ratio: 0.75,
            logical_soundness: 0.5,
            file_recall: 1.0,
            gt_judge: 0.25,
            ..GradeBreakdown::default()
        };
        // 15 + 10 + 10 + 5
        assert_eq!(aggregate(&b), 40.0);
    }

    #[test]
    fn rounds_to_cents() {
        let b = GradeBreakdown {
            file_precision: 1.0 / 3.0,
            ..GradeBreakdown::default()
        };
        assert_eq!(aggregate(&b), 3.33);
    }

    #[test]
    fn scored_keeps_full_breakdown() {
        let mut b = uniform(1.0);
        b.unknown_claim_ratio = 0.25;
        let result = scored("task_004", b);
        assert_eq!(result.task_id, "task_004");
        assert_eq!(result.score, 100.0);
        assert_eq!(result.breakdown, Some(b));
        assert!(!result.is_error());
    }

    #[test]
    fn every_axis_named_once() {
        let mut axes: Vec<_> = WEIGHTS.iter().map(|w| w.axis).collect();
        axes.sort_unstable();
        axes.dedup();
        assert_eq!(axes.len(), WEIGHTS.len());
    }
}
