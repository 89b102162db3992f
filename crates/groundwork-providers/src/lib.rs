//! Resource providers for the Groundwork web-hosting stack.
//!
//! Each provider registers a cluster of resource specifications into a
//! [`Composition`](groundwork_core::Composition) and returns typed handles
//! to the outputs its dependents need. The [`composer`] module wires all
//! providers together in the one valid order.

pub mod composer;
pub mod compute;
pub mod distribution;
pub mod network;
pub mod pipeline;
pub mod storage;

pub use composer::{compose_stack, ComposedStack, StackOutputs};
