// Error taxonomy shared by storage, engine and the HTTP layer

use std::path::PathBuf;
use thiserror::Error;

use crate::scope::Scope;

/// Errors surfaced by planner operations.
///
/// `Validation` and `NotFound` are caller mistakes (400 over HTTP).
/// `Config` (an unreadable persisted config), `Upstream` and `Io` are
/// server-side failures (500 over HTTP).
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("LLM request failed: {0:#}")]
    Upstream(#[source] anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlannerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Goals must be populated before a plan can be generated.
    pub fn empty_goals(scope: Scope) -> Self {
        Self::Validation(format!(
            "No goals found for scope '{}'. Edit data/goals/{}.md first.",
            scope, scope
        ))
    }

    /// Whether the caller (rather than a collaborator) caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
