mod assignment;
mod config;
mod ledger;
mod pr;
mod report;
mod review;
mod roster;
mod runner;
mod sheets;
mod variants;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use pr::{PrError, PrUrl, PullRequestSource};
use runner::{RunError, RunOutcome, Runner};

/// Lab Grader — reviews student lab pull requests with a language model,
/// comments the review on the PR and records the attempt in the course
/// spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "lab-grader", version, about)]
struct Cli {
    /// Pull request URLs (https://github.com/org/repo/pull/42) or `owner/repo`
    /// slugs, which grade the repository's latest open PR. Graded one at a time.
    #[arg(required = true)]
    targets: Vec<String>,

    /// Config file path (defaults to .lab-grader.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Optional output file path for a markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    let github = pr::GitHubClient::new(&config.github)?;
    let store = sheets::google::GoogleSheetsClient::new(&config.sheets)?;
    let model = review::openai::OpenAiReviewer::new(&config.model)?;
    let runner = Runner::new(&github, &store, &model, &config);

    // Strictly sequential: concurrent runs on one lab sheet would lose updates.
    let mut lines = Vec::with_capacity(cli.targets.len());
    for target in &cli.targets {
        let result = grade(&runner, &github, target)
            .instrument(info_span!("grade", target = %target))
            .await;
        match &result {
            Ok(RunOutcome::Reviewed(run)) => {
                info!(student = %run.student, attempt = run.attempt, rating = run.rating, "graded")
            }
            Ok(outcome) => info!(?outcome, "not graded"),
            Err(e) => tracing::error!(error = %e, "grading failed"),
        }
        lines.push(report::GradeLine::from_result(target.as_str(), &result));
    }

    let built_report = report::build(lines);
    report::output(&built_report, cli.output.as_deref())?;
    info!(overall = %built_report.overall, "done");

    if built_report.overall == report::Status::Failed {
        return Err("one or more grading runs failed".into());
    }
    Ok(())
}

/// Resolve a command-line target to a PR and grade it.
async fn grade(
    runner: &Runner<'_>,
    source: &dyn PullRequestSource,
    target: &str,
) -> Result<RunOutcome, RunError> {
    let url = resolve_target(source, target).await?;
    debug!(owner = %url.owner, repo = %url.repo, pr = url.pr_number, "resolved target");
    runner.run(&url).await
}

async fn resolve_target(source: &dyn PullRequestSource, target: &str) -> Result<PrUrl, PrError> {
    if let Ok(url) = pr::parse_pr_url(target) {
        return Ok(url);
    }
    let (owner, repo) =
        pr::parse_repo_slug(target).ok_or_else(|| PrError::InvalidUrl(target.to_string()))?;
    let pr_number = source.latest_pull_number(&owner, &repo).await?;
    Ok(PrUrl {
        owner,
        repo,
        pr_number,
    })
}
