//! Core library for the `ec2ssh` tool.
//!
//! The crate resolves human-friendly EC2 instance names (the `Name` tag) to
//! running instances, plans an SSH connection for the match, pins the
//! instance's host keys, and provides the name completion used by shell
//! tab-completion. All cloud access goes through the `aws` CLI.

pub mod aws;
pub mod completion;
pub mod config;
pub mod host_keys;
pub mod inventory;
pub mod plan;
pub mod process;
pub mod resolver;
pub mod ssh;
pub mod test_support;
pub mod util;

pub use aws::{AwsCli, AwsCliError};
pub use completion::CompletionService;
pub use config::{ConfigError, Ec2sshConfig};
pub use host_keys::{Ec2HostKeyFetcher, HostKeyError, HostKeyFetcher, KnownHostsCache};
pub use inventory::{
    DEFAULT_NAME_TAG, Ec2Inventory, Instance, InstanceState, Inventory, InventoryError,
    NameFilter, RegionScope,
};
pub use plan::{
    ConnectOptions, ConnectionPlan, ConnectionPlanner, HostKeySource, IdentitySource,
    PlanDefaults, PlanError,
};
pub use process::{CommandOutput, CommandRunner, ProcessCommandRunner, ProcessError};
pub use resolver::{InstanceResolver, ResolutionResult, ResolveError};
pub use ssh::{SshArgsError, SshInvocation, SshTarget};
