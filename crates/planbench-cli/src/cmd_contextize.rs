use crate::context::RunContext;
use anyhow::{Context, Result};
use planbench_miner::clone_or_fetch;

/// Execute `planbench contextize`: clone or update the repository, then
/// rebuild the shared repo map.
pub fn execute(ctx: &RunContext) -> Result<()> {
    let url = ctx.config.repo_url()?;
    let repo = ctx.repo_dir()?;
    clone_or_fetch(url, ctx.config.branch(), &repo)
        .with_context(|| format!("acquire {url}"))?;
    println!("Repository ready at {}", repo.display());

    let mapper = ctx.repo_mapper();
    let map = mapper
        .cached(&repo, true)
        .context("build repo map")?;
    println!(
        "Repo map: {} ({} chars)",
        mapper.cached_path().display(),
        map.chars().count()
    );
    Ok(())
}
