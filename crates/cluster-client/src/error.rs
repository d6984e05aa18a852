//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Object does not exist (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// Create raced with an existing object (HTTP 409, reason AlreadyExists)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Write raced with a concurrent update (HTTP 409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other Kubernetes API error
    #[error("api error: {0}")]
    Api(#[source] kube::Error),

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClusterError {
    /// True when the error means "the object is absent". Reconcilers branch
    /// on this rather than treating it as a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }

    /// True when a create lost the race against an identical create.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists(_))
    }
}

/// Classify a [`kube::Error`] into the variants reconcilers branch on.
/// Everything that is not a 404 or 409 stays an opaque API error.
pub(crate) fn classify(err: kube::Error, what: String) -> ClusterError {
    match &err {
        kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound(what),
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
            ClusterError::AlreadyExists(what)
        }
        kube::Error::Api(resp) if resp.code == 409 => ClusterError::Conflict(what),
        _ => ClusterError::Api(err),
    }
}
