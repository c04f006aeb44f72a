use crate::errors::{PrkitError, Result};
use auth_git2::GitAuthenticator;
use git2::build::CheckoutBuilder;
use git2::{
    BranchType, FetchOptions, FetchPrune, IndexAddOption, Oid, PushOptions, RemoteCallbacks,
    Repository, StatusOptions,
};
use std::path::Path;

/// Git collaborator: every repository mutation and query the workflow needs,
/// backed by libgit2 with credentials resolved by auth-git2.
pub struct Git {
    repository: Repository,
    auth: GitAuthenticator,
}

impl Git {
    pub fn open(path: &Path) -> Result<Self> {
        let repository = Repository::open(path).map_err(PrkitError::git("open"))?;
        Ok(Git {
            repository,
            auth: GitAuthenticator::default(),
        })
    }

    /// Basename of the working directory, for progress messages.
    pub fn workdir_name(&self) -> String {
        self.repository
            .workdir()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The cleanliness predicate the whole workflow hangs on: only tracked
    /// files that are changed, added or deleted count as dirty. Untracked
    /// files never do. Used both as the run precondition and as the
    /// post-stage "anything to commit" check.
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.tracked_dirty()?.is_empty())
    }

    /// Paths of tracked files with pending changes, for diagnostics.
    pub fn tracked_dirty(&self) -> Result<Vec<String>> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        let statuses = self
            .repository
            .statuses(Some(&mut options))
            .map_err(PrkitError::git("status"))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| entry.path().map(|p| p.to_string()))
            .collect())
    }

    pub fn current_branch(&self) -> Result<String> {
        let head = self.repository.head().map_err(PrkitError::git("head"))?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    /// Checkout a local branch, creating it at HEAD if it does not exist yet.
    pub fn checkout(&self, name: &str) -> Result<()> {
        if !self.local_branch_exists(name)? {
            let head = self
                .repository
                .head()
                .and_then(|h| h.peel_to_commit())
                .map_err(PrkitError::git("checkout"))?;
            self.repository
                .branch(name, &head, false)
                .map_err(PrkitError::git("checkout"))?;
        }
        self.set_head(name)
    }

    /// Checkout a new local branch tracking `remote/name`, starting from the
    /// remote-tracking ref's commit.
    pub fn checkout_tracking(&self, remote: &str, name: &str) -> Result<()> {
        let remote_ref = format!("{}/{}", remote, name);
        let commit = self
            .repository
            .find_branch(&remote_ref, BranchType::Remote)
            .and_then(|b| b.get().peel_to_commit())
            .map_err(PrkitError::git("checkout"))?;
        let mut branch = self
            .repository
            .branch(name, &commit, false)
            .map_err(PrkitError::git("checkout"))?;
        branch
            .set_upstream(Some(&remote_ref))
            .map_err(PrkitError::git("checkout"))?;
        self.set_head(name)
    }

    fn set_head(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", name);
        self.repository
            .set_head(&refname)
            .map_err(PrkitError::git("checkout"))?;
        self.repository
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .map_err(PrkitError::git("checkout"))
    }

    pub fn local_branch_exists(&self, name: &str) -> Result<bool> {
        self.branch_exists(name, BranchType::Local)
    }

    pub fn remote_branch_exists(&self, remote: &str, name: &str) -> Result<bool> {
        self.branch_exists(&format!("{}/{}", remote, name), BranchType::Remote)
    }

    fn branch_exists(&self, name: &str, kind: BranchType) -> Result<bool> {
        match self.repository.find_branch(name, kind) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(PrkitError::Git {
                operation: "branch lookup",
                source: e,
            }),
        }
    }

    pub fn local_branches(&self) -> Result<Vec<String>> {
        self.branch_names(BranchType::Local)
    }

    pub fn remote_tracking_branches(&self) -> Result<Vec<String>> {
        self.branch_names(BranchType::Remote)
    }

    fn branch_names(&self, kind: BranchType) -> Result<Vec<String>> {
        let branches = self
            .repository
            .branches(Some(kind))
            .map_err(PrkitError::git("branch list"))?;
        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.map_err(PrkitError::git("branch list"))?;
            if let Some(name) = branch.name().map_err(PrkitError::git("branch list"))? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn delete_local_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .repository
            .find_branch(name, BranchType::Local)
            .map_err(PrkitError::git("branch delete"))?;
        branch.delete().map_err(PrkitError::git("branch delete"))
    }

    /// Fetch a remote with remote-ref pruning, so refs deleted on the other
    /// side stop existing locally as remote-tracking branches.
    pub fn fetch_prune(&self, remote: &str) -> Result<()> {
        let mut remote = self
            .repository
            .find_remote(remote)
            .map_err(PrkitError::git("fetch"))?;
        let config = self.repository.config().map_err(PrkitError::git("fetch"))?;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(self.auth.credentials(&config));
        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks).prune(FetchPrune::On);
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(PrkitError::git("fetch"))
    }

    /// Fetch `remote/branch` and fast-forward the currently checked-out
    /// branch onto it. A pull that would need a real merge is surfaced as an
    /// error, not resolved.
    pub fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        {
            let mut remote = self
                .repository
                .find_remote(remote)
                .map_err(PrkitError::git("pull"))?;
            let config = self.repository.config().map_err(PrkitError::git("pull"))?;
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(self.auth.credentials(&config));
            let mut options = FetchOptions::new();
            options.remote_callbacks(callbacks);
            remote
                .fetch(&[branch], Some(&mut options), None)
                .map_err(PrkitError::git("pull"))?;
        }

        let fetch_head = self
            .repository
            .find_reference("FETCH_HEAD")
            .map_err(PrkitError::git("pull"))?;
        let fetched = self
            .repository
            .reference_to_annotated_commit(&fetch_head)
            .map_err(PrkitError::git("pull"))?;
        let (analysis, _) = self
            .repository
            .merge_analysis(&[&fetched])
            .map_err(PrkitError::git("pull"))?;

        if analysis.is_up_to_date() {
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(PrkitError::Git {
                operation: "pull",
                source: git2::Error::from_str(&format!(
                    "cannot fast-forward onto {}/{}",
                    remote, branch
                )),
            });
        }

        let refname = format!("refs/heads/{}", self.current_branch()?);
        let mut reference = self
            .repository
            .find_reference(&refname)
            .map_err(PrkitError::git("pull"))?;
        reference
            .set_target(fetched.id(), "pull: fast-forward")
            .map_err(PrkitError::git("pull"))?;
        self.repository
            .set_head(&refname)
            .map_err(PrkitError::git("pull"))?;
        self.repository
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .map_err(PrkitError::git("pull"))
    }

    /// Push a local branch to a remote. Never force-pushes.
    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        self.push_refspec(remote, &refspec)
    }

    /// Delete a branch on the remote by pushing an empty source refspec.
    pub fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!(":refs/heads/{branch}");
        self.push_refspec(remote, &refspec)
    }

    fn push_refspec(&self, remote: &str, refspec: &str) -> Result<()> {
        let mut remote = self
            .repository
            .find_remote(remote)
            .map_err(PrkitError::git("push"))?;
        let config = self.repository.config().map_err(PrkitError::git("push"))?;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(self.auth.credentials(&config));
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        remote
            .push(&[refspec], Some(&mut options))
            .map_err(PrkitError::git("push"))
    }

    /// Register a remote. Re-adding one that already exists is an expected
    /// idempotent no-op across repeated runs; any other failure is fatal.
    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        match self.repository.remote(name, url) {
            Ok(_) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::Exists => Ok(()),
            Err(e) => Err(PrkitError::RemoteRegistration {
                remote: name.to_string(),
                source: e,
            }),
        }
    }

    pub fn remote_url(&self, name: &str) -> Result<String> {
        let remote = self
            .repository
            .find_remote(name)
            .map_err(PrkitError::git("remote lookup"))?;
        Ok(remote.url().unwrap_or_default().to_string())
    }

    /// Stage every change in the working tree, deletions included.
    pub fn stage_all(&self) -> Result<()> {
        let mut index = self.repository.index().map_err(PrkitError::git("add"))?;
        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .map_err(PrkitError::git("add"))?;
        index.update_all(["*"], None).map_err(PrkitError::git("add"))?;
        index.write().map_err(PrkitError::git("add"))
    }

    /// Commit the staged index onto HEAD.
    pub fn commit(&self, message: &str) -> Result<Oid> {
        let mut index = self.repository.index().map_err(PrkitError::git("commit"))?;
        let tree_id = index.write_tree().map_err(PrkitError::git("commit"))?;
        let tree = self
            .repository
            .find_tree(tree_id)
            .map_err(PrkitError::git("commit"))?;
        let signature = self
            .repository
            .signature()
            .map_err(PrkitError::git("commit"))?;
        let parent = self
            .repository
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(PrkitError::git("commit"))?;
        self.repository
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &[&parent],
            )
            .map_err(PrkitError::git("commit"))
    }
}
