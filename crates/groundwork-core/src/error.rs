//! Error types for Groundwork.

use std::time::Duration;
use thiserror::Error;

use crate::id::LogicalId;

#[derive(Debug, Error)]
pub enum Error {
    /// Ambient configuration is missing or invalid. Surfaced before any
    /// resource creation begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A resource referenced an output of a dependency that is not part of
    /// the composition or has not been applied yet.
    #[error("dependency ordering: {resource} requires {missing} which does not exist yet")]
    DependencyOrdering {
        resource: LogicalId,
        missing: LogicalId,
    },

    /// The dependency graph contains a cycle.
    #[error("cycle detected in resource dependencies: {0}")]
    CycleDetected(String),

    /// A logical id was registered twice with differing specifications.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The external provisioning engine rejected a resource.
    #[error("provisioning {resource} failed: {message}")]
    Provisioning {
        resource: LogicalId,
        message: String,
    },

    /// A scaling group failed to reach its launch success threshold.
    #[error(
        "scaling group {group} reached {observed_percent:.0}% launch success \
         after {elapsed:?}, below the required threshold"
    )]
    LaunchSignalTimeout {
        group: LogicalId,
        observed_percent: f64,
        elapsed: Duration,
    },

    /// A pipeline stage failed. Scoped to a single pipeline run.
    #[error("pipeline {pipeline} failed at stage {stage}: {message}")]
    PipelineStage {
        pipeline: String,
        stage: String,
        message: String,
    },

    /// A secret reference could not be resolved.
    #[error("secret not found: {0}")]
    SecretNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
