use crate::{
    core::{self, RunOptions},
    errors::{PrkitError, Result},
    github::GitHubCliProvider,
};
use clap::Args;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Args)]
pub struct Run {
    /// Directory of the git repository to operate in
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Base branch the pull request targets
    #[arg(long, default_value = "master")]
    pub base: String,

    /// Name of the work branch
    #[arg(long, default_value = "prkit")]
    pub branch: String,

    /// Canonical remote the pull request is filed against
    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Remote the work branch is pushed to (fork when different from --remote)
    #[arg(long, default_value = "origin")]
    pub fork_to_remote: String,

    /// Pull request title; runs with the same title reuse the same PR
    #[arg(long)]
    pub title: Option<String>,

    /// Commit message for the automated commit
    #[arg(long)]
    pub message: Option<String>,

    /// Shell command producing the changes, run on the work branch
    #[arg(long)]
    pub exec: Option<String>,

    /// GitHub access token, defaults to $PRKIT_GITHUB_ACCESS_TOKEN
    #[arg(long)]
    pub token: Option<String>,
}

impl Run {
    pub fn execute(&self) -> Result<()> {
        let options = RunOptions {
            base_branch: self.base.clone(),
            work_branch: self.branch.clone(),
            remote: self.remote.clone(),
            fork_to_remote: self.fork_to_remote.clone(),
            title: self.title.clone(),
            commit_message: self
                .message
                .clone()
                .unwrap_or_else(|| core::DEFAULT_COMMIT_MESSAGE.to_string()),
        };

        // Credential is resolved here, at the CLI edge, and handed to the
        // provider explicitly.
        let token = self
            .token
            .clone()
            .or_else(|| std::env::var("PRKIT_GITHUB_ACCESS_TOKEN").ok());
        let provider = GitHubCliProvider::new(token);

        let exec = self.exec.clone();
        let result = core::run(&self.dir, options, &provider, |dir| match &exec {
            Some(command) => run_change_command(command, dir),
            None => Ok(()),
        })?;

        match (result.committed, result.pr_created, result.pr_number) {
            (false, _, _) => println!("No changes to commit"),
            (true, true, Some(number)) => println!("✅ Created PR #{}", number),
            (true, false, Some(number)) => println!("✅ Updated existing PR #{}", number),
            (true, _, None) => println!("✅ Committed and pushed {}", result.final_branch),
        }

        Ok(())
    }
}

fn run_change_command(command: &str, dir: &Path) -> Result<()> {
    log::info!("Running change command: {}", command);
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(PrkitError::ChangeCommand(format!(
            "`{}` exited with {}",
            command, status
        )))
    }
}
