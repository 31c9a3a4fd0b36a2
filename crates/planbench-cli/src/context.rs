use crate::config::Config;
use anyhow::Result;
use planbench_miner::{repo_slug, RepomixMapper};
use planbench_oracle::{CallLog, Templates};
use planbench_store::RunPaths;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;

/// Resolved settings for one invocation, shared by every stage.
pub struct RunContext {
    pub config: Config,
    pub paths: RunPaths,
    pub templates: Templates,
}

impl RunContext {
    pub fn new(config: Config, run_id: &str) -> Self {
        let paths = RunPaths::discover(config.data_dir(), &config.logs_dir(), run_id);
        let templates = Templates::load(&config.prompts_dir());
        Self {
            config,
            paths,
            templates,
        }
    }

    /// Local clone location for the configured repository.
    pub fn repo_dir(&self) -> Result<PathBuf> {
        let url = self.config.repo_url()?;
        Ok(self.paths.repo_dir(&repo_slug(url)))
    }

    pub fn repo_mapper(&self) -> RepomixMapper {
        RepomixMapper {
            program: self.config.repomix_path.clone(),
            ignore: self.config.repomix_ignore.clone(),
            exclude_files: self.config.repomix_exclude_files,
            work_dir: self.paths.data_dir.clone(),
        }
    }

    pub fn call_log(&self) -> Arc<CallLog> {
        Arc::new(CallLog::new(&self.paths.logs_dir))
    }
}

/// `run_YYYYMMDD_HHMMSS` in UTC.
pub fn default_run_id(now: OffsetDateTime) -> String {
    format!(
        "run_{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
