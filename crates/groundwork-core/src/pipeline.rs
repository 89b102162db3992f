//! Pipeline specifications and run-state types.
//!
//! A pipeline is a three-stage state machine (Source → Build → Deploy),
//! strictly ordered, no parallel stages, no retries at this layer.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::{LogicalId, RunId};
use crate::secret::SecretRef;
use crate::{Error, Result};

/// Fetches the repository at a branch and produces the source artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStage {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Resolved to a repository access token at execution time only.
    pub token: SecretRef,
}

/// Build-environment and phase description, consumed by the build stage as
/// an opaque configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Runtime name to version, e.g. "nodejs" -> "20.x".
    pub runtime_versions: BTreeMap<String, String>,
    pub install_commands: Vec<String>,
    pub build_commands: Vec<String>,
    pub artifacts: ArtifactSelection,
}

/// File-glob selection of what the build artifact contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSelection {
    pub base_directory: String,
    pub files: Vec<String>,
}

impl BuildSpec {
    /// Render the collaborator's recognized document shape
    /// (`runtime-versions`, `commands`, `artifacts.base-directory`,
    /// `artifacts.files`).
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({
            "version": "0.2",
            "phases": {
                "install": {
                    "runtime-versions": self.runtime_versions,
                    "commands": self.install_commands,
                },
                "build": {
                    "commands": self.build_commands,
                },
            },
            "artifacts": {
                "base-directory": self.artifacts.base_directory,
                "files": self.artifacts.files,
            },
        })
    }
}

/// Runs the build environment and produces the build artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStage {
    pub build_image: String,
    pub spec: BuildSpec,
}

/// Deploys the build artifact to every instance in the scaling group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployStage {
    pub scaling_group: LogicalId,
}

/// The fixed stage shape of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStages {
    pub source: SourceStage,
    pub build: BuildStage,
    pub deploy: DeployStage,
}

/// A release pipeline parameterized by branch, bucket and compute target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub pipeline_name: String,
    /// Bucket holding artifacts between stages.
    pub bucket: LogicalId,
    pub stages: PipelineStages,
}

impl Pipeline {
    pub fn branch(&self) -> &str {
        &self.stages.source.branch
    }

    /// Stage names in execution order.
    pub fn stage_names() -> [&'static str; 3] {
        ["source", "build", "deploy"]
    }
}

/// A single execution of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: RunId,
    pub pipeline: String,
    pub status: RunStatus,
    pub stages: Vec<StageResult>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, RunStatus::Succeeded)
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Succeeded,
    /// Halted at the named stage. Terminal for this run.
    Failed { stage: String },
}

/// Result of one stage within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub name: String,
    pub status: StageStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Status of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStatus {
    Pending,
    Running,
    Succeeded,
    Failed { message: String },
    /// Not executed because an earlier stage failed.
    Skipped { reason: String },
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Succeeded | StageStatus::Failed { .. } | StageStatus::Skipped { .. }
        )
    }
}

/// Executes the three pipeline stages against real infrastructure.
///
/// Implementations own authentication, sandboxing and retries; the runner
/// only sequences them.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Fetch the repository at the configured branch.
    async fn fetch_source(&self, source: &SourceStage) -> Result<Bytes>;

    /// Run the build phases over the source artifact.
    async fn build(&self, build: &BuildStage, source: Bytes) -> Result<Bytes>;

    /// Deploy the build artifact to every instance of the target group.
    async fn deploy(&self, deploy: &DeployStage, artifact: Bytes) -> Result<()>;
}

/// Convenience constructor for stage failures raised by executors.
pub fn stage_failure(pipeline: &str, stage: &str, message: impl Into<String>) -> Error {
    Error::PipelineStage {
        pipeline: pipeline.to_string(),
        stage: stage.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_spec_document_uses_recognized_keys() {
        let spec = BuildSpec {
            runtime_versions: BTreeMap::from([
                ("nodejs".to_string(), "20.x".to_string()),
                ("php".to_string(), "8.3".to_string()),
            ]),
            install_commands: vec!["npm install".to_string()],
            build_commands: vec!["npm run build".to_string()],
            artifacts: ArtifactSelection {
                base_directory: "./".to_string(),
                files: vec!["**/*".to_string()],
            },
        };

        let doc = spec.to_document();
        assert_eq!(doc["version"], "0.2");
        assert_eq!(doc["phases"]["install"]["runtime-versions"]["nodejs"], "20.x");
        assert_eq!(doc["artifacts"]["base-directory"], "./");
        assert_eq!(doc["artifacts"]["files"][0], "**/*");
    }

    #[test]
    fn stage_names_are_strictly_ordered() {
        assert_eq!(Pipeline::stage_names(), ["source", "build", "deploy"]);
    }
}
