pub mod cli;
pub mod types;

#[cfg(test)]
mod tests;

pub use cli::{GitHubCliProvider, GitHubProvider, MockGitHub};
pub use types::{ForkInfo, PullRequest, PullRequestState};
