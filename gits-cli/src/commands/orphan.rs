//! Orphan command - repositories on disk that no project declares

use clap::Args;
use gits_core::find_orphans;

use super::Context;

/// Find git repositories under a project directory that are not part of it
#[derive(Args, Debug)]
pub struct OrphanArgs {
    /// Project name
    pub project: String,
}

impl OrphanArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let resolver = ctx.resolver()?;
        let project = ctx.resolve_one(&resolver, &self.project).await?;
        let git = resolver.git();

        let orphans = find_orphans(&project, git.as_ref())?;
        if orphans.is_empty() {
            eprintln!("No orphan repositories in {}", project.name);
        }
        for path in orphans {
            println!("{}", path.display());
        }
        Ok(())
    }
}
