//! Apply/destroy engine and pipeline runner for Groundwork.
//!
//! The engine walks a composition in topological order, feeds each resolved
//! specification to a [`Provisioner`](groundwork_core::provisioner::Provisioner),
//! and propagates outputs forward. The runner executes provisioned
//! pipelines stage by stage.

pub mod apply;
pub mod memory;
pub mod runner;
pub mod store;

pub use apply::{ApplyEngine, ApplyReport, Plan, PlanStep};
pub use memory::MemoryProvisioner;
pub use runner::PipelineRunner;
pub use store::MemoryArtifactStore;
