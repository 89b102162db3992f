//! KDL configuration parsing for Groundwork stacks.
//!
//! This crate handles parsing of:
//! - The stack file (domain, region, account, source repository)
//! - Environment variants (NAT gateways, launch timeouts, bootstrap files)

pub mod error;
pub mod stack;

pub use error::{ConfigError, ConfigResult};
pub use stack::{
    parse_stack_config, BootstrapFile, EnvironmentVariant, SourceLocation, StackConfig,
};
