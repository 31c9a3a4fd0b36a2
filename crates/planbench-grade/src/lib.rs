//! Plan grading: six independent stages per plan, folded into one weighted
//! rubric score.
//!
//! Stages run in order (claim extraction, claim verification, logical
//! soundness, file match, ground-truth judge, prose quality). None of them is
//! retried, and none can fail a task: an unreachable or incoherent oracle
//! moves that one sub-score to its neutral default, visible in the breakdown.

pub mod aggregate;
pub mod claims;
pub mod files;
pub mod grader;
pub mod gt_judge;
pub mod quality;
pub mod soundness;

pub use aggregate::{aggregate, scored, Weight, WEIGHTS};
pub use claims::{claim_ratios, extract_claims, ClaimCheck, ClaimVerifier};
pub use files::{file_recall_precision, plan_files};
pub use grader::{average_score, Grader, PLAN_NOT_FOUND};
pub use gt_judge::{judge_gt_match, Evidence};
pub use quality::text_quality;
pub use soundness::logical_soundness;
