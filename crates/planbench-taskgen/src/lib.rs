//! Turns mined merge commits into benchmark tasks: classify each commit,
//! draw a stratified sample, then have the judge write a redacted request
//! for each selected change.

pub mod build;
pub mod classify;
pub mod sample;

pub use build::{category_counts, task_id, TaskBuilder};
pub use classify::{CategorySource, CommitClassifier};
pub use sample::{sample, Quotas};
