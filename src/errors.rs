use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrkitError {
    #[error("Directory does not have clean git status: {0}")]
    DirtyWorkingTree(String),

    #[error("Failed to register remote '{remote}': {source}")]
    RemoteRegistration {
        remote: String,
        source: git2::Error,
    },

    #[error("Git {operation} failed: {source}")]
    Git {
        operation: &'static str,
        source: git2::Error,
    },

    #[error("GitHub operation failed: {0}")]
    Provider(String),

    #[error("Cannot derive owner/name from remote '{remote}' url '{url}'")]
    RemoteUrl { remote: String, url: String },

    #[error("Change command failed: {0}")]
    ChangeCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrkitError {
    pub fn git(operation: &'static str) -> impl FnOnce(git2::Error) -> PrkitError {
        move |source| PrkitError::Git { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, PrkitError>;
