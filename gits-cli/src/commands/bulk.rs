//! clone, fetch, pull, status and checkout

use clap::Args;
use gits_core::{BulkReport, Operation, Selection};

use super::Context;

/// Run a git operation across a project
#[derive(Args, Debug)]
pub struct BulkArgs {
    /// Project name, or a directory (`.`, `./path`, `~/path`)
    pub project: String,

    /// Repository or sub-project (`a/b`) within the project
    pub target: Option<String>,
}

impl BulkArgs {
    /// Execute `op` and report every repository
    pub async fn execute(&self, ctx: &Context, op: Operation) -> anyhow::Result<()> {
        let resolver = ctx.resolver()?;
        let project = ctx.resolve_one(&resolver, &self.project).await?;
        let executor = ctx.executor(&resolver);

        let report = match self.target.as_deref() {
            None => executor.run(&project, &op).await,
            Some(target) => match project.select(target) {
                Some(Selection::Repo(repo)) => {
                    let mut report = BulkReport::default();
                    match executor.run_repo(&project, repo, &op).await {
                        Ok(outcome) => report.outcomes.push(outcome),
                        Err(failure) => report.failures.push(failure),
                    }
                    report
                }
                Some(Selection::SubProject(sub)) => executor.run(sub, &op).await,
                None => anyhow::bail!("{} not found in project {}", target, project.name),
            },
        };

        print_report(&report);
        report.check(&op)?;
        Ok(())
    }
}

/// Switch repositories to a branch
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[command(flatten)]
    pub target: BulkArgs,

    /// Branch to check out; a remote prefix (`origin/`) is stripped
    #[arg(short, long)]
    pub branch: String,
}

impl CheckoutArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let op = Operation::Checkout {
            branch: self.branch.clone(),
        };
        self.target.execute(ctx, op).await
    }
}

fn print_report(report: &BulkReport) {
    let width = report
        .outcomes
        .iter()
        .map(|o| o.repository.len())
        .max()
        .unwrap_or(0);

    let mut project = "";
    for outcome in &report.outcomes {
        if outcome.project != project {
            project = outcome.project.as_str();
            println!("{}", project);
        }
        let output = outcome.output.trim();
        if output.contains('\n') {
            println!("  {}", outcome.repository);
            for line in output.lines() {
                println!("    {}", line);
            }
        } else {
            println!("  {:width$}  {}", outcome.repository, output, width = width);
        }
    }

    if !report.failures.is_empty() {
        eprintln!();
        for failure in &report.failures {
            eprintln!("error: {}", failure);
        }
    }
}
