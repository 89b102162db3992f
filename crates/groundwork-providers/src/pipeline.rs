//! Pipeline provider: a three-stage Source → Build → Deploy pipeline per
//! branch.

use std::collections::BTreeMap;

use groundwork_config::SourceLocation;
use groundwork_core::compute::ScalingGroup;
use groundwork_core::pipeline::{
    ArtifactSelection, BuildSpec, BuildStage, DeployStage, Pipeline, PipelineStages, SourceStage,
};
use groundwork_core::secret::SecretRef;
use groundwork_core::storage::Bucket;
use groundwork_core::{Composition, LogicalId, ResourceRef, Result};

/// Dependencies and parameters of one pipeline instance.
pub struct PipelineInputs<'a> {
    pub branch: String,
    pub scaling_group: &'a ResourceRef<ScalingGroup>,
    pub bucket: &'a ResourceRef<Bucket>,
    pub source: &'a SourceLocation,
    pub build: BuildSpec,
}

/// Create one pipeline. Pipelines sharing a scaling group and bucket hold
/// independent read-only references to them; nothing else is shared, so one
/// branch's failure cannot leak into another's.
pub fn create_pipeline(
    comp: &mut Composition,
    scope: &str,
    inputs: PipelineInputs<'_>,
) -> Result<ResourceRef<Pipeline>> {
    let PipelineInputs {
        branch,
        scaling_group,
        bucket,
        source,
        build,
    } = inputs;

    comp.add(
        LogicalId::new(scope, &format!("pipeline-{branch}")),
        Pipeline {
            pipeline_name: format!("{scope}-{branch}"),
            bucket: bucket.id().clone(),
            stages: PipelineStages {
                source: SourceStage {
                    owner: source.owner.clone(),
                    repo: source.repo.clone(),
                    branch,
                    token: SecretRef::new(&source.token_secret),
                },
                build: BuildStage {
                    build_image: "standard-linux".to_string(),
                    spec: build,
                },
                deploy: DeployStage {
                    scaling_group: scaling_group.id().clone(),
                },
            },
        },
    )
}

/// The stock web-application build: node + php runtimes, dependency
/// install, asset build, everything in the artifact.
pub fn default_build_spec() -> BuildSpec {
    BuildSpec {
        runtime_versions: BTreeMap::from([
            ("nodejs".to_string(), "20.x".to_string()),
            ("php".to_string(), "8.3".to_string()),
        ]),
        install_commands: vec![
            "npm install".to_string(),
            "curl -sS https://getcomposer.org/installer | php".to_string(),
            "php composer.phar install --no-dev --optimize-autoloader".to_string(),
        ],
        build_commands: vec!["npm run build".to_string()],
        artifacts: ArtifactSelection {
            base_directory: "./".to_string(),
            files: vec!["**/*".to_string()],
        },
    }
}
