pub mod types;

pub use types::{ChangedFiles, PrUrl, PullRequest};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::assignment::LabIdentity;
use crate::config::GitHubConfig;

const JSON: &str = "application/vnd.github+json";
const RAW: &str = "application/vnd.github.raw";

/// GitHub caps `per_page` at 100 for the PR files endpoint.
const FILES_PER_PAGE: usize = 100;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("No open pull request in {0}")]
    NoPullRequest(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Where submissions come from and where review comments go.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    async fn fetch_pull_request(&self, url: &PrUrl) -> Result<PullRequest, PrError>;

    /// Number of the most recently created open PR of a repository.
    async fn latest_pull_number(&self, owner: &str, repo: &str) -> Result<u64, PrError>;

    /// Contents of every file the PR adds or modifies, at its head commit.
    async fn get_changed_files(&self, pr: &PullRequest) -> Result<ChangedFiles, PrError>;

    /// README of the repository at the PR head, if there is one.
    async fn get_readme(&self, pr: &PullRequest) -> Result<Option<String>, PrError>;

    async fn post_comment(&self, pr: &PullRequest, body: &str) -> Result<(), PrError>;

    /// Lab and student username for a classroom repository, falling back to
    /// the PR author when the repository name carries no known lab.
    fn get_student_identity(&self, pr: &PullRequest, known_labs: &[String]) -> (String, String) {
        let identity = LabIdentity::from_repo(&pr.repo, known_labs);
        let student = identity.student.unwrap_or_else(|| pr.author.clone());
        (identity.lab, student)
    }
}

/// Parse a GitHub PR URL into its component parts.
/// Expected format: https://github.com/{owner}/{repo}/pull/{number}
pub fn parse_pr_url(url: &str) -> Result<PrUrl, PrError> {
    let parsed = Url::parse(url).map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| PrError::InvalidUrl(url.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 4 || segments[2] != "pull" {
        return Err(PrError::InvalidUrl(url.to_string()));
    }

    let pr_number = segments[3]
        .parse::<u64>()
        .map_err(|_| PrError::InvalidUrl(url.to_string()))?;

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        pr_number,
    })
}

/// Parse an `owner/repo` slug.
pub fn parse_repo_slug(slug: &str) -> Option<(String, String)> {
    let (owner, repo) = slug.trim().split_once('/')?;
    let valid = |s: &str| !s.is_empty() && !s.contains(['/', ':', ' ']);
    (valid(owner) && valid(repo)).then(|| (owner.to_string(), repo.to_string()))
}

/// GitHub REST implementation of `PullRequestSource`.
pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct Head {
    sha: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    user: User,
    head: Head,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct PullSummary {
    number: u64,
}

#[derive(Deserialize)]
struct FileEntry {
    filename: String,
    status: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, PrError> {
        let token = config.token.clone().ok_or(PrError::MissingToken)?;
        Ok(Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// `{api}/repos/{owner}/{repo}/{segments...}`, each segment percent-encoded.
    fn repo_url(&self, owner: &str, repo: &str, segments: &[&str]) -> Result<Url, PrError> {
        let mut url =
            Url::parse(&self.api_url).map_err(|_| PrError::InvalidUrl(self.api_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| PrError::InvalidUrl(self.api_url.clone()))?
            .pop_if_empty()
            .extend(["repos", owner, repo])
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url, accept: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header("User-Agent", "lab-grader")
            .header("Accept", accept)
            .bearer_auth(&self.token)
    }

    async fn get_raw(&self, url: Url) -> Result<Option<String>, PrError> {
        let response = self
            .get(url, RAW)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    #[instrument(skip(self), fields(owner = %url.owner, repo = %url.repo, pr = url.pr_number))]
    async fn fetch_pull_request(&self, url: &PrUrl) -> Result<PullRequest, PrError> {
        let number = url.pr_number.to_string();
        let endpoint = self.repo_url(&url.owner, &url.repo, &["pulls", number.as_str()])?;

        debug!("fetching PR metadata from GitHub API");
        let metadata = self
            .get(endpoint, JSON)
            .send()
            .await?
            .error_for_status()?
            .json::<PullResponse>()
            .await?;
        debug!(title = %metadata.title, head = %metadata.head.sha, "received PR metadata");

        Ok(PullRequest {
            owner: url.owner.clone(),
            repo: url.repo.clone(),
            number: metadata.number,
            title: metadata.title,
            author: metadata.user.login,
            head_sha: metadata.head.sha,
            html_url: metadata.html_url.unwrap_or_else(|| url.html_url()),
        })
    }

    #[instrument(skip(self))]
    async fn latest_pull_number(&self, owner: &str, repo: &str) -> Result<u64, PrError> {
        let mut endpoint = self.repo_url(owner, repo, &["pulls"])?;
        endpoint
            .query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("sort", "created")
            .append_pair("direction", "desc")
            .append_pair("per_page", "1");
        let pulls = self
            .get(endpoint, JSON)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<PullSummary>>()
            .await?;
        pulls
            .first()
            .map(|p| p.number)
            .ok_or_else(|| PrError::NoPullRequest(format!("{owner}/{repo}")))
    }

    #[instrument(skip(self, pr), fields(pr = pr.number))]
    async fn get_changed_files(&self, pr: &PullRequest) -> Result<ChangedFiles, PrError> {
        let number = pr.number.to_string();
        let mut entries = Vec::new();
        for page in 1.. {
            let mut endpoint = self.repo_url(&pr.owner, &pr.repo, &["pulls", number.as_str(), "files"])?;
            endpoint
                .query_pairs_mut()
                .append_pair("per_page", &FILES_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch = self
                .get(endpoint, JSON)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<FileEntry>>()
                .await?;
            let last = batch.len() < FILES_PER_PAGE;
            entries.extend(batch);
            if last {
                break;
            }
        }
        debug!(files = entries.len(), "listed changed files");

        let mut files = ChangedFiles::new();
        for entry in entries.into_iter().filter(|e| e.status != "removed") {
            let mut endpoint = {
                let mut segments = vec!["contents"];
                segments.extend(entry.filename.split('/'));
                self.repo_url(&pr.owner, &pr.repo, &segments)?
            };
            endpoint.query_pairs_mut().append_pair("ref", &pr.head_sha);
            match self.get_raw(endpoint).await? {
                Some(content) => {
                    files.insert(entry.filename, content);
                }
                None => debug!(path = %entry.filename, "file not present at head"),
            }
        }
        Ok(files)
    }

    #[instrument(skip(self, pr), fields(pr = pr.number))]
    async fn get_readme(&self, pr: &PullRequest) -> Result<Option<String>, PrError> {
        let mut endpoint = self.repo_url(&pr.owner, &pr.repo, &["readme"])?;
        endpoint.query_pairs_mut().append_pair("ref", &pr.head_sha);
        self.get_raw(endpoint).await
    }

    #[instrument(skip(self, pr, body), fields(pr = pr.number, bytes = body.len()))]
    async fn post_comment(&self, pr: &PullRequest, body: &str) -> Result<(), PrError> {
        let number = pr.number.to_string();
        let endpoint = self.repo_url(&pr.owner, &pr.repo, &["issues", number.as_str(), "comments"])?;
        self.client
            .post(endpoint)
            .header("User-Agent", "lab-grader")
            .header("Accept", JSON)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        debug!("comment posted");
        Ok(())
    }
}
