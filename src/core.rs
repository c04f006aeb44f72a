use crate::errors::{PrkitError, Result};
use crate::git::Git;
use crate::github::{GitHubProvider, PullRequest, PullRequestState};
use regex::Regex;
use std::path::Path;

pub const DEFAULT_TITLE: &str = "PRKit Pull Request";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Automated commit by PRKit";

/// Derive the `owner/name` slug from a git remote url, ssh or https.
///
/// `git@github.com:livingsocial/crispy-duck.git` -> `livingsocial/crispy-duck`
pub fn repo_slug(url: &str) -> Option<String> {
    let re = Regex::new(r"[:/]([^/:]+/[^/:]+?)(?:\.git)?/?$").ok()?;
    re.captures(url).map(|captures| captures[1].to_string())
}

/// The logical work branch for one run: its name, the PR title used as the
/// idempotency key, the canonical remote the PR targets and the remote the
/// branch is pushed to. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    pub title: String,
    pub remote: String,
    pub fork_to_remote: String,
}

impl Branch {
    pub fn new(name: &str, title: Option<&str>, remote: &str, fork_to_remote: &str) -> Self {
        Branch {
            name: name.to_string(),
            title: title.unwrap_or(DEFAULT_TITLE).to_string(),
            remote: remote.to_string(),
            fork_to_remote: fork_to_remote.to_string(),
        }
    }

    pub fn needs_fork(&self) -> bool {
        self.remote != self.fork_to_remote
    }
}

/// Recognized run configuration, all fields defaulted.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub base_branch: String,
    pub work_branch: String,
    pub remote: String,
    pub fork_to_remote: String,
    pub title: Option<String>,
    pub commit_message: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            base_branch: "master".to_string(),
            work_branch: "prkit".to_string(),
            remote: "origin".to_string(),
            fork_to_remote: "origin".to_string(),
            title: None,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        }
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub committed: bool,
    pub pr_created: bool,
    pub pr_number: Option<u64>,
    pub final_branch: String,
}

/// How the work branch gets checked out once stale state is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    /// New local branch tracking the surviving remote branch.
    Tracking,
    /// Plain local branch, created at the base branch head if absent.
    Fresh,
}

/// The pure decision core: given one consistent observation of PR state,
/// remote-tracking ref and local branch, which destructive and constructive
/// operations bring us to a branch ready to receive commits.
///
/// A remote or local branch with no open PR behind it is leftover from an
/// aborted or externally-closed prior run and must not be resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub delete_remote: bool,
    pub delete_local: bool,
    pub checkout: Checkout,
    pub pull_after: bool,
}

impl ReconcilePlan {
    pub fn compute(pr_open: bool, remote_branch: bool, local_branch: bool) -> Self {
        let remote_survives = remote_branch && pr_open;
        let local_survives = local_branch && pr_open;
        ReconcilePlan {
            delete_remote: remote_branch && !pr_open,
            delete_local: local_branch && !pr_open,
            checkout: if remote_survives && !local_survives {
                Checkout::Tracking
            } else {
                Checkout::Fresh
            },
            pull_after: remote_survives,
        }
    }
}

/// One full run: clean-tree guard, branch reconciliation, the caller's
/// change callback, commit, push, pull request.
pub struct PullRequestRun<'a, P: GitHubProvider> {
    git: Git,
    provider: &'a P,
    branch: Branch,
    base_branch: String,
    commit_message: String,
}

/// Entry point. Reconciles branch state in `directory`, runs `change`
/// against the checked-out work branch, and commits/pushes/opens a PR if the
/// callback produced a net change. Converges: repeated runs with the same
/// title end with exactly one open PR.
pub fn run<P, F>(
    directory: &Path,
    options: RunOptions,
    provider: &P,
    change: F,
) -> Result<RunResult>
where
    P: GitHubProvider,
    F: FnOnce(&Path) -> Result<()>,
{
    let git = Git::open(directory)?;
    let branch = Branch::new(
        &options.work_branch,
        options.title.as_deref(),
        &options.remote,
        &options.fork_to_remote,
    );
    let run = PullRequestRun {
        git,
        provider,
        branch,
        base_branch: options.base_branch,
        commit_message: options.commit_message,
    };
    run.execute(directory, change)
}

impl<'a, P: GitHubProvider> PullRequestRun<'a, P> {
    fn execute<F>(&self, directory: &Path, change: F) -> Result<RunResult>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        self.ensure_clean()?;
        self.prepare_branch()?;
        change(directory)?;
        self.commit_and_publish()
    }

    /// Precondition: a tracked-file change lying around would end up inside
    /// the automated commit, so the run refuses to start.
    fn ensure_clean(&self) -> Result<()> {
        let dirty = self.git.tracked_dirty()?;
        if dirty.is_empty() {
            Ok(())
        } else {
            Err(PrkitError::DirtyWorkingTree(dirty.join(", ")))
        }
    }

    /// Reconcile local branches, remote branches and open-PR state, leaving
    /// the work branch checked out and ready for commits.
    fn prepare_branch(&self) -> Result<()> {
        self.fork_and_add_remote()?;
        // Prune before any branch-existence check: the remote branch may have
        // been deleted externally (PR-merge auto-delete) and a stale
        // remote-tracking ref would give a false positive below.
        self.git.fetch_prune(&self.branch.fork_to_remote)?;

        self.git.checkout(&self.base_branch)?;
        log::info!("Pulling latest {} code...", self.git.workdir_name());
        self.git.pull(&self.branch.remote, &self.base_branch)?;

        let pr_open = self.existing_pull_request()?.is_some();
        let remote_branch = self
            .git
            .remote_branch_exists(&self.branch.fork_to_remote, &self.branch.name)?;
        let local_branch = self.git.local_branch_exists(&self.branch.name)?;
        let plan = ReconcilePlan::compute(pr_open, remote_branch, local_branch);

        if plan.delete_remote {
            log::info!(
                "No existing PR, removing remote branch {}/{}",
                self.branch.fork_to_remote,
                self.branch.name
            );
            self.git
                .delete_remote_branch(&self.branch.fork_to_remote, &self.branch.name)?;
            // Re-prune so the local tracking ref disappears too.
            self.git.fetch_prune(&self.branch.fork_to_remote)?;
        }

        if plan.delete_local {
            log::info!("No existing PR, removing local branch {}", self.branch.name);
            self.git.delete_local_branch(&self.branch.name)?;
        }

        match plan.checkout {
            Checkout::Tracking => {
                log::info!("Making tracking branch");
                self.git
                    .checkout_tracking(&self.branch.fork_to_remote, &self.branch.name)?;
            }
            Checkout::Fresh => self.git.checkout(&self.branch.name)?,
        }

        if plan.pull_after {
            self.git.pull(&self.branch.fork_to_remote, &self.branch.name)?;
        }

        Ok(())
    }

    fn commit_and_publish(&self) -> Result<RunResult> {
        // The authoritative "anything to commit" check happens after staging:
        // whitespace-only content updates can look dirty before `git add` and
        // resolve to clean after it.
        self.git.stage_all()?;
        if self.git.is_clean()? {
            log::info!("No changes to commit");
            self.git.checkout(&self.base_branch)?;
            return Ok(RunResult {
                committed: false,
                pr_created: false,
                pr_number: None,
                final_branch: self.base_branch.clone(),
            });
        }

        self.git.commit(&self.commit_message)?;
        let (pr_created, pr_number) = self.push_and_open_pr()?;
        Ok(RunResult {
            committed: true,
            pr_created,
            pr_number,
            final_branch: self.branch.name.clone(),
        })
    }

    fn push_and_open_pr(&self) -> Result<(bool, Option<u64>)> {
        log::info!(
            "Pushing {}/{}...",
            self.branch.fork_to_remote,
            self.branch.name
        );
        // A long-running process could have had the remote removed under it.
        self.fork_and_add_remote()?;
        self.git.push(&self.branch.fork_to_remote, &self.branch.name)?;

        if let Some(existing) = self.existing_pull_request()? {
            log::info!("PR #{} already open, push updated it", existing.number);
            return Ok((false, Some(existing.number)));
        }

        let repo = self.authoritative_repo(&self.branch.remote)?;
        let head = format!("{}:{}", self.branch.fork_to_remote, self.branch.name);
        let pull = self.provider.create_pull_request(
            &repo,
            &self.base_branch,
            &head,
            &self.branch.title,
        )?;
        log::info!("Created PR #{}", pull.number);
        Ok((true, Some(pull.number)))
    }

    /// Fork the canonical repo and register the fork remote. Only needed
    /// when pushing somewhere other than the canonical remote; re-adding an
    /// existing remote is an idempotent no-op.
    fn fork_and_add_remote(&self) -> Result<()> {
        if !self.branch.needs_fork() {
            return Ok(());
        }
        let repo = self.authoritative_repo(&self.branch.remote)?;
        let fork = self.provider.fork_repository(&repo)?;
        self.git.add_remote(&self.branch.fork_to_remote, &fork.ssh_url)
    }

    fn existing_pull_request(&self) -> Result<Option<PullRequest>> {
        let repo = self.authoritative_repo(&self.branch.remote)?;
        let pulls = self
            .provider
            .list_pull_requests(&repo, PullRequestState::Open)?;
        Ok(pulls.into_iter().find(|p| p.title == self.branch.title))
    }

    fn authoritative_repo(&self, remote: &str) -> Result<String> {
        let url = self.git.remote_url(remote)?;
        repo_slug(&url).ok_or(PrkitError::RemoteUrl {
            remote: remote.to_string(),
            url,
        })
    }
}
