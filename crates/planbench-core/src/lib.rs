pub mod diff;
pub mod ground_truth;
pub mod paths;
pub mod text;
pub mod types;

pub use types::*;
