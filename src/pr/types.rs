use std::collections::BTreeMap;

/// Changed file path → file content at the PR head.
pub type ChangedFiles = BTreeMap<String, String>;

/// Pull request metadata needed to grade a submission.
/// Note: Not Deserialize; built from the GitHub API response in pr/mod.rs.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub owner: String,
    pub repo: String,
    /// PR number (e.g., 42)
    pub number: u64,
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// Commit the changed files are read at
    pub head_sha: String,
    /// Link recorded in the ledger
    pub html_url: String,
}

/// Represents the parsed components of a GitHub PR URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

impl PrUrl {
    pub fn html_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/pull/{}",
            self.owner, self.repo, self.pr_number
        )
    }
}
