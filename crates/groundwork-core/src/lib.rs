//! Core domain types and traits for the Groundwork composition engine.
//!
//! This crate contains:
//! - Logical identifiers and deferred attribute references
//! - Typed resource specifications (network, distribution, storage,
//!   compute, pipeline)
//! - The composition graph and its ordering rules
//! - Provisioner trait (the seam to the external cloud engine)
//! - Artifact and secret storage abstractions
//! - Error taxonomy

pub mod artifact;
pub mod composition;
pub mod compute;
pub mod distribution;
pub mod error;
pub mod id;
pub mod network;
pub mod pipeline;
pub mod provisioner;
pub mod resource;
pub mod secret;
pub mod storage;

pub use composition::{Composition, ResourceSpec};
pub use error::{Error, Result};
pub use id::{Attr, AttrRef, LogicalId, ResourceRef, RunId};
pub use resource::{ResourceKind, ResourceProps, Value};
