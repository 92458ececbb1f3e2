//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`
//! sockets. All functions are synchronous and take data in, returning data out.

pub mod cluster;
pub mod config;
pub mod error;
pub mod instance;
pub mod kubeconfig;
pub mod shell;
pub mod ssh;

pub use cluster::ClusterState;
pub use config::{
    Ec2K3sConfig, PollSettings, resolve_region, validate_instance_type, validate_region,
};
pub use error::{ConfigError, Interrupted, LocateError, PollError, ShellError, StateError};
pub use instance::{InstanceAddress, InstanceRecord, OwnerTag};
pub use shell::CommandResult;
