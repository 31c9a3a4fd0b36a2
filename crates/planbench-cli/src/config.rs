use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "planbench.yaml";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("repo_url is not set (pass --repo-url or add it to {CONFIG_FILE})")]
    MissingRepoUrl,
    #[error("{0} is not set")]
    MissingCredential(&'static str),
}

/// Pipeline settings from `planbench.yaml`. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub repo_url: String,
    pub branch: String,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub repomix_path: String,
    pub repomix_ignore: String,
    pub repomix_exclude_files: bool,
    pub claude_cli_path: String,
    pub repo_map_max_chars: usize,
    pub task_diff_max_chars: usize,
    pub mine_diff_max_bytes: usize,
    pub max_merge_commits: usize,
    pub max_tasks: usize,
    pub plan_timeout_seconds: u64,
    pub max_num_claims_per_task: usize,
    pub search_top_n: usize,
    pub grade_repo_map_chars: usize,
    pub oracle_timeout_seconds: u64,
    pub judge_model: String,
    pub reviewer_model: String,
    pub sample_seed: Option<u64>,

    /// Directory the config was read from; relative dirs resolve against it.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            branch: "main".into(),
            data_dir: "data".into(),
            logs_dir: "logs".into(),
            prompts_dir: "prompts".into(),
            repomix_path: "npx".into(),
            repomix_ignore: String::new(),
            repomix_exclude_files: false,
            claude_cli_path: "claude".into(),
            repo_map_max_chars: 150_000,
            task_diff_max_chars: 100_000,
            mine_diff_max_bytes: 500_000,
            max_merge_commits: 100,
            max_tasks: 30,
            plan_timeout_seconds: 300,
            max_num_claims_per_task: 3,
            search_top_n: 5,
            grade_repo_map_chars: 20_000,
            oracle_timeout_seconds: 60,
            judge_model: "claude-sonnet-4-20250514".into(),
            reviewer_model: "claude-opus-4-1".into(),
            sample_seed: None,
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load `path`, or `./planbench.yaml` when `None`. Only the implicit file
    /// may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(CONFIG_FILE), false),
        };
        let root = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        config.root = root;
        Ok(config)
    }

    /// An empty document yields the defaults.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn resolve(&self, dir: &Path) -> PathBuf {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root.join(dir)
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.resolve(&self.logs_dir)
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.resolve(&self.prompts_dir)
    }

    pub fn repo_url(&self) -> Result<&str, ConfigError> {
        let url = self.repo_url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingRepoUrl);
        }
        Ok(url)
    }

    /// `None` when the branch is blank, meaning the remote's default.
    pub fn branch(&self) -> Option<&str> {
        Some(self.branch.trim()).filter(|b| !b.is_empty())
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_seconds)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_seconds)
    }

    /// Load `<root>/.env`. Variables already in the environment win.
    pub fn load_dotenv(&self) {
        let env_path = self.root.join(".env");
        match dotenvy::from_path(&env_path) {
            Ok(()) => tracing::debug!(path = %env_path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(path = %env_path.display(), error = %e, "ignoring unreadable .env"),
        }
    }
}

/// Fail unless `name` is set to something non-blank.
pub fn require_env(name: &'static str) -> Result<(), ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::MissingCredential(name)),
    }
}
