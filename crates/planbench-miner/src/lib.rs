//! Everything that reads a repository: acquiring it, walking its merge
//! history, and summarizing it into a repo map.

pub mod clone;
pub mod git;
pub mod mine;
pub mod repomap;

pub use clone::{clone_or_fetch, history_rev, repo_slug, upstream_ref};
pub use git::{GitCli, GitError, SourceControl};
pub use mine::{mine, MineOptions};
pub use repomap::{RepoMapError, RepoMapper, RepomixMapper};
