//! Plan production: check out each task's starting commit and let a coding
//! agent write its implementation plan in read-only plan mode.

pub mod producer;
pub mod runner;
pub mod stream;

pub use producer::{plan_session_id, ClaudeCodeProducer, MockProducer, PlanOutcome, PlanProducer};
pub use runner::{run_plans, RunSummary};
pub use stream::{StreamMessage, StreamMonitor, Transcript};
