//! List command - resolved projects and repository states

use clap::Args;
use gits_core::{Project, Repository};
use serde_json::{json, Value};

use super::Context;

/// List projects and their repositories
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Projects to list (all when omitted), or a directory
    pub projects: Vec<String>,
}

impl ListArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let resolver = ctx.resolver()?;
        let resolution = resolver.resolve(&self.projects, &ctx.config.projects).await;

        if self.json {
            let projects: Vec<Value> = resolution.projects.values().map(project_json).collect();
            println!("{}", serde_json::to_string_pretty(&projects)?);
        } else {
            for project in resolution.projects.values() {
                print_project(project, 0);
            }
        }

        for failure in &resolution.failures {
            eprintln!("error: {}: {}", failure.name, failure.error);
        }
        if !resolution.is_complete() {
            anyhow::bail!(
                "{} project(s) failed to resolve",
                resolution.failures.len()
            );
        }
        Ok(())
    }
}

fn print_project(project: &Project, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{}{}  [{}]  {} repositories",
        indent,
        project.name,
        project.source_label(),
        project.repo_count()
    );

    let width = project
        .repos
        .iter()
        .map(|r| r.display_name().len())
        .max()
        .unwrap_or(0);
    for repo in &project.repos {
        println!(
            "{}  {:width$}  {:<6}  {}",
            indent,
            repo.display_name(),
            repo.state.label(),
            location(repo),
            width = width
        );
    }
    for sub in &project.sub_projects {
        print_project(sub, depth + 1);
    }
}

/// Local path when known, otherwise the remote or the failure reason
fn location(repo: &Repository) -> String {
    match repo.abs_path {
        Some(_) => repo.path_display(),
        None => repo.source_or_reason().to_string(),
    }
}

fn project_json(project: &Project) -> Value {
    json!({
        "name": project.name,
        "id": project.id,
        "path": project.abs_path.as_ref().map(|p| p.display().to_string()),
        "desc": project.desc,
        "source": project.source_label(),
        "repos": project.repos.iter().map(repo_json).collect::<Vec<_>>(),
        "subprojects": project.sub_projects.iter().map(project_json).collect::<Vec<_>>(),
    })
}

fn repo_json(repo: &Repository) -> Value {
    json!({
        "id": repo.id,
        "name": repo.display_name(),
        "namespace": repo.namespace,
        "src": repo.src,
        "url": repo.url,
        "desc": repo.desc,
        "path": repo.abs_path.as_ref().map(|p| p.display().to_string()),
        "state": repo.state.label(),
        "reason": repo.reason,
    })
}
