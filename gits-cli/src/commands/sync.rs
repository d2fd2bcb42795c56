//! Sync command - refresh cached provider results

use clap::Args;

use super::Context;

/// Drop cached provider results and fetch them again
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Projects to refresh (all when omitted)
    pub projects: Vec<String>,
}

impl SyncArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        if !ctx.config.settings.cache {
            tracing::warn!("Cache is disabled, sync only re-resolves projects");
        }
        let resolver = ctx.resolver()?;
        let resolution = resolver.sync(&self.projects, &ctx.config.projects).await;

        for (name, project) in &resolution.projects {
            println!("{}: {} repositories", name, project.repo_count());
        }
        for failure in &resolution.failures {
            eprintln!("error: {}: {}", failure.name, failure.error);
        }
        if !resolution.is_complete() {
            anyhow::bail!("{} project(s) failed to sync", resolution.failures.len());
        }
        Ok(())
    }
}
