//! Error types for deployment planning.

use std::time::Duration;

/// Result type alias using [`PlanError`].
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors surfaced by the planning pipeline.
///
/// Nothing in the pipeline retries; every variant reaches the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Project does not exist.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Environment does not exist.
    #[error("environment not found: {0}")]
    EnvironmentNotFound(String),

    /// Component does not exist.
    #[error("component not found: {0}")]
    ComponentNotFound(String),

    /// Caller input is inconsistent (e.g. component outside the project).
    #[error("validation error: {0}")]
    Validation(String),

    /// No selected component has a build status in the source environment.
    #[error("no build found for the selected components in environment {0}")]
    NoBuildFound(String),

    /// Planning produced zero requests.
    #[error("no deployment requests were produced")]
    NoRequestsProduced,

    /// Remote query or filesystem lookup matched no build or artifact.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Build definition label matched more than one definition.
    #[error("build definition '{label}' is ambiguous ({matches} matches)")]
    AmbiguousBuildDefinition {
        /// The label as supplied by the caller.
        label: String,
        /// Number of definitions that matched.
        matches: usize,
    },

    /// Remote build system answered with an error or an unexpected payload.
    #[error("build system error: {0}")]
    BuildSystem(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote call exceeded its time limit.
    #[error("remote call timed out after {limit:?}")]
    Timeout {
        /// The limit that was exceeded.
        limit: Duration,
    },

    /// A remote call was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Component tree exceeds the recursion bound.
    #[error("component tree below '{component}' is deeper than {limit} levels")]
    TreeTooDeep {
        /// Component at which the bound was hit.
        component: String,
        /// Configured bound.
        limit: usize,
    },

    /// Request document could not be written.
    #[error("serialisation error: {0}")]
    Serialisation(String),

    /// Request document could not be read back.
    #[error("parse error: {0}")]
    Parse(String),

    /// An external store or gateway failed.
    #[error("store error: {0}")]
    Store(String),

    /// A multi-request submission failed part-way through.
    ///
    /// `submitted` holds the identifiers already issued, in plan order.
    /// Those submissions are not rolled back.
    #[error("submission failed after {} request(s): {source}", submitted.len())]
    PartialSubmission {
        /// Identifiers of requests submitted before the failure.
        submitted: Vec<u64>,
        /// The failure that stopped the submission.
        #[source]
        source: Box<PlanError>,
    },
}

impl PlanError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a build system error.
    #[must_use]
    pub fn build_system(msg: impl Into<String>) -> Self {
        Self::BuildSystem(msg.into())
    }

    /// Whether this error reports a missing project, environment or component.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProjectNotFound(_) | Self::EnvironmentNotFound(_) | Self::ComponentNotFound(_)
        )
    }
}
