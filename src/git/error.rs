//! Core error type

use thiserror::Error;

/// Errors raised by repository queries and the services built on them
#[derive(Debug, Error)]
pub enum GitError {
    /// Local data needed for a snapshot could not be read
    #[error("failed to read {what} from the local repository: {source}")]
    LocalRead {
        what: &'static str,
        #[source]
        source: Box<GitError>,
    },

    #[error("repository unreadable: {0}")]
    Unreadable(String),

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("checkout conflict: {0}")]
    CheckoutConflict(String),

    #[error("diff between {from} and {to} unavailable: {reason}")]
    DiffUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error("repository task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl GitError {
    /// Wrap an error as a failed local read of `what`
    pub fn local_read(what: &'static str, source: GitError) -> Self {
        GitError::LocalRead {
            what,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitError>;
