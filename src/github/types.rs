use serde::Deserialize;

/// One pull request as reported by the hosted provider. Queried live, never
/// cached across a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: PullRequestState,
}

/// The REST API reports lowercase states, `gh pr list --json` uppercase ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PullRequestState {
    #[serde(rename = "open", alias = "OPEN")]
    Open,
    #[serde(rename = "closed", alias = "CLOSED")]
    Closed,
    #[serde(rename = "merged", alias = "MERGED")]
    Merged,
}

impl PullRequestState {
    /// Value accepted by `gh pr list --state`.
    pub fn as_query(&self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
            PullRequestState::Merged => "merged",
        }
    }
}

/// Result of forking a repository; the ssh url becomes the fork remote's url.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForkInfo {
    pub ssh_url: String,
}
