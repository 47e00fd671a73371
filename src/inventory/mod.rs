//! Instance inventory: the observed snapshot of cloud instances and the
//! capability interface used to query it.
//!
//! Resolution and completion only depend on [`Inventory`], so both can be
//! exercised against an in-memory fake. [`Ec2Inventory`] is the production
//! implementation backed by the `aws` CLI.

use std::fmt;

use thiserror::Error;

use crate::aws::AwsCliError;
use crate::process::ProcessError;

mod ec2;
mod types;

pub use ec2::{DEFAULT_NAME_TAG, Ec2Inventory};

/// Lifecycle state reported by the provider.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum InstanceState {
    /// Booting; not yet reachable.
    Pending,
    /// Running and eligible for connection.
    Running,
    /// Shutting down towards `Stopped`.
    Stopping,
    /// Stopped but not terminated.
    Stopped,
    /// Shutting down towards `Terminated`.
    ShuttingDown,
    /// Terminated; visible in the API for a short while.
    Terminated,
    /// Any state this tool does not recognise.
    Other(String),
}

impl InstanceState {
    /// Maps a provider state name onto [`InstanceState`].
    #[must_use]
    pub fn from_provider(name: &str) -> Self {
        match name {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "shutting-down" => Self::ShuttingDown,
            "terminated" => Self::Terminated,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the provider spelling of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a single compute instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instance {
    /// Provider identifier (for example `i-0abc`).
    pub id: String,
    /// Values of the name tag, in provider order. May be empty.
    pub name_tags: Vec<String>,
    /// Public address, when one is assigned.
    pub public_address: Option<String>,
    /// Private address, when one is assigned.
    pub private_address: Option<String>,
    /// Lifecycle state at query time.
    pub state: InstanceState,
    /// Region the instance was found in.
    pub region: String,
    /// Owning account, used to build the instance ARN.
    pub owner_id: Option<String>,
    /// Platform description used to infer a login user (for example
    /// `Linux/UNIX` or `Ubuntu Pro`).
    pub platform_details: Option<String>,
}

impl Instance {
    /// Creates a running instance with no tags or addresses.
    pub fn new(id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name_tags: Vec::new(),
            public_address: None,
            private_address: None,
            state: InstanceState::Running,
            region: region.into(),
            owner_id: None,
            platform_details: None,
        }
    }

    /// Adds a name tag value.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name_tags.push(name.into());
        self
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub fn with_state(mut self, state: InstanceState) -> Self {
        self.state = state;
        self
    }

    /// Sets the public address.
    #[must_use]
    pub fn with_public_address(mut self, address: impl Into<String>) -> Self {
        self.public_address = Some(address.into());
        self
    }

    /// Sets the private address.
    #[must_use]
    pub fn with_private_address(mut self, address: impl Into<String>) -> Self {
        self.private_address = Some(address.into());
        self
    }

    /// Sets the owning account.
    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Sets the platform details.
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform_details = Some(platform.into());
        self
    }

    /// Returns `true` when the instance is eligible for connection.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, InstanceState::Running)
    }

    /// Returns the first name tag, falling back to the identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name_tags.first().map_or(self.id.as_str(), String::as_str)
    }

    /// Returns `true` when any name tag equals `name`.
    #[must_use]
    pub fn has_exact_name(&self, name: &str) -> bool {
        self.name_tags.iter().any(|tag| tag == name)
    }

    /// Returns `true` when any name tag starts with `prefix` (case-sensitive).
    #[must_use]
    pub fn has_name_prefix(&self, prefix: &str) -> bool {
        self.name_tags.iter().any(|tag| tag.starts_with(prefix))
    }

    /// Returns the preferred address for display: public first, then private.
    #[must_use]
    pub fn any_address(&self) -> Option<&str> {
        non_empty(self.public_address.as_deref())
            .or_else(|| non_empty(self.private_address.as_deref()))
    }

    /// Renders the instance ARN when the owning account is known.
    #[must_use]
    pub fn arn(&self) -> Option<String> {
        self.owner_id.as_ref().map(|owner| {
            format!("arn:aws:ec2:{}:{owner}:instance/{}", self.region, self.id)
        })
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

/// Regions covered by a query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegionScope {
    /// A single named region.
    Region(String),
    /// Every region enabled for the account.
    AllRegions,
}

impl fmt::Display for RegionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(name) => write!(f, "region {name}"),
            Self::AllRegions => f.write_str("all regions"),
        }
    }
}

/// Case-sensitive name-tag prefix filter.
///
/// An empty prefix selects every named instance and is only used by explicit
/// list and completion operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameFilter {
    prefix: String,
}

impl NameFilter {
    /// Creates a prefix filter.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the raw prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Returns `true` when `instance` carries a name tag with this prefix.
    #[must_use]
    pub fn matches(&self, instance: &Instance) -> bool {
        instance.has_name_prefix(&self.prefix)
    }

    /// Renders the prefix as a provider tag-filter value: wildcard characters
    /// in the user input are escaped, then a trailing `*` is appended.
    #[must_use]
    pub fn to_tag_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.prefix.len() + 1);
        for ch in self.prefix.chars() {
            if matches!(ch, '*' | '?' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('*');
        pattern
    }
}

/// Errors raised when the inventory cannot be queried.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InventoryError {
    /// Raised when the provider cannot be reached at all.
    #[error("inventory provider unreachable: {0}")]
    Unreachable(String),
    /// Raised when a bounded query does not finish in time.
    #[error("inventory query timed out: {0}")]
    Timeout(String),
    /// Raised when the provider rejects the query (for example invalid or
    /// expired credentials).
    #[error("inventory query rejected: {0}")]
    Rejected(String),
    /// Raised when the provider response cannot be understood.
    #[error("failed to parse {resource} inventory: {message}")]
    Parse {
        /// Resource type being parsed.
        resource: String,
        /// Parser error message.
        message: String,
    },
}

impl From<AwsCliError> for InventoryError {
    fn from(value: AwsCliError) -> Self {
        match value {
            AwsCliError::Process(err @ ProcessError::Timeout { .. }) => {
                Self::Timeout(err.to_string())
            }
            AwsCliError::Process(err @ ProcessError::Spawn { .. }) => {
                Self::Unreachable(err.to_string())
            }
            err @ AwsCliError::CommandFailure { .. } => Self::Rejected(err.to_string()),
            AwsCliError::Parse { resource, message } => Self::Parse { resource, message },
        }
    }
}

/// Read-only query interface over a provider's instance inventory.
pub trait Inventory {
    /// Returns the instances in `scope` whose name tag matches `filter`.
    ///
    /// Implementations should restrict results to running instances when the
    /// provider supports it; callers still re-check the state. A fresh query
    /// is issued on every call.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError`] when the provider is unreachable, rejects
    /// the caller's credentials, times out, or returns malformed data.
    fn query_instances(
        &self,
        scope: &RegionScope,
        filter: &NameFilter,
    ) -> Result<Vec<Instance>, InventoryError>;
}

impl<T: Inventory + ?Sized> Inventory for &T {
    fn query_instances(
        &self,
        scope: &RegionScope,
        filter: &NameFilter,
    ) -> Result<Vec<Instance>, InventoryError> {
        (**self).query_instances(scope, filter)
    }
}

#[cfg(test)]
mod tests;
