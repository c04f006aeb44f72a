use crate::errors::{PrkitError, Result};
use crate::github::types::{ForkInfo, PullRequest, PullRequestState};
use std::process::Command;
use std::sync::Mutex;

/// The four provider operations the workflow needs, and nothing else.
/// `repo` arguments are `owner/name` slugs on the hosting side.
pub trait GitHubProvider {
    fn fork_repository(&self, repo: &str) -> Result<ForkInfo>;
    fn list_pull_requests(&self, repo: &str, state: PullRequestState) -> Result<Vec<PullRequest>>;
    fn create_pull_request(
        &self,
        repo: &str,
        base: &str,
        head: &str,
        title: &str,
    ) -> Result<PullRequest>;
    fn close_pull_request(&self, repo: &str, number: u64) -> Result<()>;
}

/// Provider backed by the `gh` CLI. The credential is handed in explicitly
/// and forwarded to the spawned process; core logic never reads the
/// environment itself.
pub struct GitHubCliProvider {
    token: Option<String>,
}

impl GitHubCliProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new("gh");
        command.args(args);
        if let Some(token) = &self.token {
            command.env("GH_TOKEN", token);
        }
        let output = command
            .output()
            .map_err(|e| PrkitError::Provider(format!("Failed to execute gh command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrkitError::Provider(format!(
                "gh {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitHubProvider for GitHubCliProvider {
    fn fork_repository(&self, repo: &str) -> Result<ForkInfo> {
        log::debug!("Forking {}", repo);
        let stdout = self.run_command(&["api", &format!("repos/{}/forks", repo), "-X", "POST"])?;
        let fork: ForkInfo = serde_json::from_str(&stdout)?;
        Ok(fork)
    }

    fn list_pull_requests(&self, repo: &str, state: PullRequestState) -> Result<Vec<PullRequest>> {
        log::debug!("Listing {} pull requests on {}", state.as_query(), repo);
        let stdout = self.run_command(&[
            "pr",
            "list",
            "--repo",
            repo,
            "--state",
            state.as_query(),
            "--json",
            "number,title,state",
        ])?;
        let pulls: Vec<PullRequest> = serde_json::from_str(&stdout)?;
        Ok(pulls)
    }

    fn create_pull_request(
        &self,
        repo: &str,
        base: &str,
        head: &str,
        title: &str,
    ) -> Result<PullRequest> {
        log::info!("Creating PR on {}: {} → {} (\"{}\")", repo, head, base, title);
        let stdout = self.run_command(&[
            "api",
            &format!("repos/{}/pulls", repo),
            "-X",
            "POST",
            "-f",
            &format!("base={}", base),
            "-f",
            &format!("head={}", head),
            "-f",
            &format!("title={}", title),
        ])?;
        let pull: PullRequest = serde_json::from_str(&stdout)?;
        Ok(pull)
    }

    fn close_pull_request(&self, repo: &str, number: u64) -> Result<()> {
        log::info!("Closing PR #{} on {}", number, repo);
        self.run_command(&[
            "api",
            &format!("repos/{}/pulls/{}", repo, number),
            "-X",
            "PATCH",
            "-f",
            "state=closed",
        ])?;
        Ok(())
    }
}

/// In-memory provider for tests: pull requests live behind a Mutex, numbers
/// are handed out sequentially, and every call is recorded.
pub struct MockGitHub {
    pub fork_ssh_url: String,
    state: Mutex<MockState>,
}

struct MockState {
    pulls: Vec<PullRequest>,
    next_number: u64,
    forked: Vec<String>,
    created: Vec<(String, String, String, String)>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            fork_ssh_url: "git@github.com:someone/fork.git".to_string(),
            state: Mutex::new(MockState {
                pulls: Vec::new(),
                next_number: 1,
                forked: Vec::new(),
                created: Vec::new(),
            }),
        }
    }

    pub fn with_open_pr(self, title: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let number = state.next_number;
            state.next_number += 1;
            state.pulls.push(PullRequest {
                number,
                title: title.to_string(),
                state: PullRequestState::Open,
            });
        }
        self
    }

    pub fn open_pulls(&self) -> Vec<PullRequest> {
        self.state
            .lock()
            .unwrap()
            .pulls
            .iter()
            .filter(|p| p.state == PullRequestState::Open)
            .cloned()
            .collect()
    }

    pub fn forked_repos(&self) -> Vec<String> {
        self.state.lock().unwrap().forked.clone()
    }

    pub fn created_pulls(&self) -> Vec<(String, String, String, String)> {
        self.state.lock().unwrap().created.clone()
    }
}

impl Default for MockGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubProvider for MockGitHub {
    fn fork_repository(&self, repo: &str) -> Result<ForkInfo> {
        self.state.lock().unwrap().forked.push(repo.to_string());
        Ok(ForkInfo {
            ssh_url: self.fork_ssh_url.clone(),
        })
    }

    fn list_pull_requests(&self, _repo: &str, state: PullRequestState) -> Result<Vec<PullRequest>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .pulls
            .iter()
            .filter(|p| p.state == state)
            .cloned()
            .collect())
    }

    fn create_pull_request(
        &self,
        repo: &str,
        base: &str,
        head: &str,
        title: &str,
    ) -> Result<PullRequest> {
        let mut state = self.state.lock().unwrap();
        let number = state.next_number;
        state.next_number += 1;
        let pull = PullRequest {
            number,
            title: title.to_string(),
            state: PullRequestState::Open,
        };
        state.pulls.push(pull.clone());
        state.created.push((
            repo.to_string(),
            base.to_string(),
            head.to_string(),
            title.to_string(),
        ));
        Ok(pull)
    }

    fn close_pull_request(&self, _repo: &str, number: u64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.pulls.iter_mut().find(|p| p.number == number) {
            Some(pull) => {
                pull.state = PullRequestState::Closed;
                Ok(())
            }
            None => Err(PrkitError::Provider(format!("PR #{} not found", number))),
        }
    }
}
