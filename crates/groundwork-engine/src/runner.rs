//! Pipeline runner: drives one run through source, build and deploy.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use groundwork_core::artifact::{ArtifactKey, ArtifactStore};
use groundwork_core::pipeline::{
    Pipeline, PipelineRun, RunStatus, StageExecutor, StageResult, StageStatus,
};
use groundwork_core::id::RunId;

/// Executes pipeline runs stage by stage.
///
/// Stages run strictly in order. A stage failure marks the run failed and
/// skips everything after it; runs of other pipelines are unaffected since
/// each run owns its state. Retries belong to the executor, not here.
pub struct PipelineRunner {
    executor: Arc<dyn StageExecutor>,
    store: Arc<dyn ArtifactStore>,
}

impl PipelineRunner {
    pub fn new(executor: Arc<dyn StageExecutor>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { executor, store }
    }

    /// Run the pipeline once. Never returns an error: failures are recorded
    /// in the returned run's stage results.
    pub async fn run(&self, pipeline: &Pipeline) -> PipelineRun {
        let run_id = RunId::new();
        info!(pipeline = %pipeline.pipeline_name, run = %run_id, "starting pipeline run");

        let mut run = PipelineRun {
            id: run_id,
            pipeline: pipeline.pipeline_name.clone(),
            status: RunStatus::Running,
            stages: Pipeline::stage_names()
                .iter()
                .map(|name| StageResult {
                    name: name.to_string(),
                    status: StageStatus::Pending,
                    started_at: None,
                    finished_at: None,
                })
                .collect(),
            created_at: Utc::now(),
            finished_at: None,
        };

        let mut artifact = None;
        let mut failed_stage: Option<String> = None;

        for index in 0..run.stages.len() {
            let name = run.stages[index].name.clone();
            if let Some(failed) = &failed_stage {
                run.stages[index].status = StageStatus::Skipped {
                    reason: format!("stage {failed} failed"),
                };
                continue;
            }

            run.stages[index].status = StageStatus::Running;
            run.stages[index].started_at = Some(Utc::now());

            let outcome = self
                .execute_stage(&name, pipeline, &run.id, artifact.take())
                .await;
            run.stages[index].finished_at = Some(Utc::now());

            match outcome {
                Ok(output) => {
                    run.stages[index].status = StageStatus::Succeeded;
                    artifact = output;
                }
                Err(e) => {
                    error!(
                        pipeline = %pipeline.pipeline_name,
                        run = %run.id,
                        stage = %name,
                        error = %e,
                        "pipeline stage failed"
                    );
                    run.stages[index].status = StageStatus::Failed {
                        message: e.to_string(),
                    };
                    failed_stage = Some(name);
                }
            }
        }

        run.finished_at = Some(Utc::now());
        run.status = match failed_stage {
            Some(stage) => RunStatus::Failed { stage },
            None => RunStatus::Succeeded,
        };
        info!(
            pipeline = %pipeline.pipeline_name,
            run = %run.id,
            succeeded = run.succeeded(),
            "pipeline run finished"
        );
        run
    }

    async fn execute_stage(
        &self,
        name: &str,
        pipeline: &Pipeline,
        run_id: &RunId,
        input: Option<bytes::Bytes>,
    ) -> groundwork_core::Result<Option<bytes::Bytes>> {
        match name {
            "source" => {
                let data = self.executor.fetch_source(&pipeline.stages.source).await?;
                self.store
                    .put(&stage_key(run_id, "source"), data.clone())
                    .await?;
                Ok(Some(data))
            }
            "build" => {
                let source = input.unwrap_or_default();
                let data = self
                    .executor
                    .build(&pipeline.stages.build, source)
                    .await?;
                self.store
                    .put(&stage_key(run_id, "build"), data.clone())
                    .await?;
                Ok(Some(data))
            }
            "deploy" => {
                let artifact = input.unwrap_or_default();
                self.executor
                    .deploy(&pipeline.stages.deploy, artifact)
                    .await?;
                Ok(None)
            }
            other => Err(groundwork_core::pipeline::stage_failure(
                &pipeline.pipeline_name,
                other,
                "unknown stage",
            )),
        }
    }
}

fn stage_key(run_id: &RunId, stage: &str) -> ArtifactKey {
    ArtifactKey {
        run_id: *run_id,
        stage: stage.to_string(),
        name: "bundle.zip".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArtifactStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use groundwork_core::pipeline::{
        stage_failure, BuildStage, DeployStage, PipelineStages, SourceStage,
    };
    use groundwork_core::secret::SecretRef;
    use groundwork_core::LogicalId;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct MockStageExecutor {
        calls: Mutex<Vec<String>>,
        fail_stage: Option<&'static str>,
    }

    impl MockStageExecutor {
        fn new(fail_stage: Option<&'static str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_stage,
            }
        }

        fn record(&self, stage: &str) -> groundwork_core::Result<()> {
            self.calls.lock().unwrap().push(stage.to_string());
            if self.fail_stage == Some(stage) {
                return Err(stage_failure("test", stage, "injected failure"));
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StageExecutor for MockStageExecutor {
        async fn fetch_source(&self, _source: &SourceStage) -> groundwork_core::Result<Bytes> {
            self.record("source")?;
            Ok(Bytes::from_static(b"source-tree"))
        }

        async fn build(
            &self,
            _build: &BuildStage,
            _source: Bytes,
        ) -> groundwork_core::Result<Bytes> {
            self.record("build")?;
            Ok(Bytes::from_static(b"built-bundle"))
        }

        async fn deploy(
            &self,
            _deploy: &DeployStage,
            _artifact: Bytes,
        ) -> groundwork_core::Result<()> {
            self.record("deploy")
        }
    }

    fn pipeline(branch: &str) -> Pipeline {
        Pipeline {
            pipeline_name: format!("shop-{branch}"),
            bucket: LogicalId::new("shop", "artifacts"),
            stages: PipelineStages {
                source: SourceStage {
                    owner: "acme".to_string(),
                    repo: "storefront".to_string(),
                    branch: branch.to_string(),
                    token: SecretRef::new("storefront-source"),
                },
                build: BuildStage {
                    build_image: "standard-linux".to_string(),
                    spec: groundwork_core::pipeline::BuildSpec {
                        runtime_versions: BTreeMap::new(),
                        install_commands: vec![],
                        build_commands: vec![],
                        artifacts: groundwork_core::pipeline::ArtifactSelection {
                            base_directory: "./".to_string(),
                            files: vec!["**/*".to_string()],
                        },
                    },
                },
                deploy: DeployStage {
                    scaling_group: LogicalId::new("shop", "scaling-group"),
                },
            },
        }
    }

    #[tokio::test]
    async fn successful_run_executes_stages_in_order_and_stores_artifacts() {
        let executor = Arc::new(MockStageExecutor::new(None));
        let store = Arc::new(MemoryArtifactStore::default());
        let runner = PipelineRunner::new(executor.clone(), store.clone());

        let run = runner.run(&pipeline("master")).await;

        assert!(run.succeeded());
        assert_eq!(executor.calls(), vec!["source", "build", "deploy"]);
        // Source and build artifacts were persisted.
        assert_eq!(store.list(&run.id).await.unwrap().len(), 2);
        assert!(run.finished_at.is_some());
    }

    #[tokio::test]
    async fn build_failure_skips_deploy_and_fails_the_run() {
        let executor = Arc::new(MockStageExecutor::new(Some("build")));
        let store = Arc::new(MemoryArtifactStore::default());
        let runner = PipelineRunner::new(executor.clone(), store);

        let run = runner.run(&pipeline("dev")).await;

        assert_eq!(
            run.status,
            RunStatus::Failed {
                stage: "build".to_string()
            }
        );
        assert_eq!(executor.calls(), vec!["source", "build"]);
        assert!(matches!(run.stages[1].status, StageStatus::Failed { .. }));
        assert!(matches!(run.stages[2].status, StageStatus::Skipped { .. }));
    }

    #[tokio::test]
    async fn one_pipeline_failure_leaves_the_other_untouched() {
        let store = Arc::new(MemoryArtifactStore::default());
        let failing = PipelineRunner::new(
            Arc::new(MockStageExecutor::new(Some("build"))),
            store.clone(),
        );
        let healthy = PipelineRunner::new(Arc::new(MockStageExecutor::new(None)), store);

        let dev = failing.run(&pipeline("dev")).await;
        let master = healthy.run(&pipeline("master")).await;

        assert!(!dev.succeeded());
        assert!(master.succeeded());
        assert_ne!(dev.id, master.id);
    }
}
