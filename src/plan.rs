//! Connection planning: turns a resolved [`Instance`] into the address,
//! user, identity and host-key source needed to open an SSH session.
//!
//! Planning is pure. Host keys are only described here; fetching them is the
//! job of [`crate::host_keys`].

use std::fmt;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::inventory::{Instance, non_empty};

/// Per-invocation overrides supplied on the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectOptions {
    /// Login user, from `user@name` or `-l user`.
    pub username: Option<String>,
    /// Private key passed with `-i`.
    pub identity_file: Option<Utf8PathBuf>,
    /// Connect to the private address even when a public one exists.
    pub force_private: bool,
}

/// Configured defaults applied when no override is given.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PlanDefaults {
    /// Fallback login user.
    pub default_user: Option<String>,
    /// Fallback private key.
    pub identity_file: Option<Utf8PathBuf>,
    /// Bucket holding per-instance host keys published at boot.
    pub pubkey_bucket: Option<String>,
    /// Whether host keys should be pinned from console output when no bucket
    /// is configured.
    pub pin_host_keys: bool,
}

/// Private key used for authentication.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IdentitySource {
    /// Key file passed to ssh with `-i`.
    LocalKey(Utf8PathBuf),
    /// Let ssh pick keys from its agent and default locations.
    SshDefault,
}

/// Where the instance's host keys are obtained from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HostKeySource {
    /// Parse the keys cloud-init prints to the instance console.
    ConsoleOutput,
    /// Download the keys the instance uploaded to object storage.
    ObjectStorage {
        /// Bucket name.
        bucket: String,
        /// Object key, `<arn>/sshkeys`.
        object_key: String,
    },
    /// Do not pin; ssh uses the user's own known-hosts files.
    Unpinned,
}

impl fmt::Display for HostKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsoleOutput => f.write_str("console output"),
            Self::ObjectStorage { bucket, object_key } => {
                write!(f, "s3://{bucket}/{object_key}")
            }
            Self::Unpinned => f.write_str("unpinned"),
        }
    }
}

/// Everything needed to open one SSH session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectionPlan {
    /// Instance being connected to.
    pub instance_id: String,
    /// Region the instance lives in.
    pub region: String,
    /// Target host address; never empty.
    pub address: String,
    /// Login user.
    pub username: String,
    /// Authentication key.
    pub identity: IdentitySource,
    /// Host key origin.
    pub host_keys: HostKeySource,
}

/// Errors raised while planning a connection.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PlanError {
    /// Raised when the instance has neither a usable public nor private
    /// address.
    #[error("instance {instance_id} has no reachable address")]
    NoReachableAddress {
        /// Instance identifier.
        instance_id: String,
    },
    /// Raised when no login user was supplied and none can be inferred.
    #[error(
        "cannot infer a login user for instance {instance_id} (platform: {platform}); \
         pass user@name, -l USER, or set EC2SSH_DEFAULT_USER"
    )]
    UnknownUser {
        /// Instance identifier.
        instance_id: String,
        /// Platform details reported by the provider.
        platform: String,
    },
}

/// Builds [`ConnectionPlan`]s using configured defaults.
#[derive(Clone, Debug, Default)]
pub struct ConnectionPlanner {
    defaults: PlanDefaults,
}

impl ConnectionPlanner {
    /// Creates a planner.
    #[must_use]
    pub const fn new(defaults: PlanDefaults) -> Self {
        Self { defaults }
    }

    /// Derives the connection plan for `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::NoReachableAddress`] when no address can be used
    /// and [`PlanError::UnknownUser`] when no login user is known.
    pub fn build_plan(
        &self,
        instance: &Instance,
        options: &ConnectOptions,
    ) -> Result<ConnectionPlan, PlanError> {
        let address = Self::select_address(instance, options.force_private)?;
        let username = self.select_user(instance, options)?;
        let identity = options
            .identity_file
            .clone()
            .or_else(|| self.defaults.identity_file.clone())
            .map_or(IdentitySource::SshDefault, IdentitySource::LocalKey);

        Ok(ConnectionPlan {
            instance_id: instance.id.clone(),
            region: instance.region.clone(),
            address,
            username,
            identity,
            host_keys: self.select_host_keys(instance),
        })
    }

    fn select_address(instance: &Instance, force_private: bool) -> Result<String, PlanError> {
        let public = non_empty(instance.public_address.as_deref()).filter(|_| !force_private);
        public
            .or_else(|| non_empty(instance.private_address.as_deref()))
            .map(str::to_owned)
            .ok_or_else(|| PlanError::NoReachableAddress {
                instance_id: instance.id.clone(),
            })
    }

    fn select_user(
        &self,
        instance: &Instance,
        options: &ConnectOptions,
    ) -> Result<String, PlanError> {
        if let Some(user) = non_empty(options.username.as_deref())
            .or_else(|| non_empty(self.defaults.default_user.as_deref()))
        {
            return Ok(user.to_owned());
        }

        instance
            .platform_details
            .as_deref()
            .and_then(infer_user)
            .map(str::to_owned)
            .ok_or_else(|| PlanError::UnknownUser {
                instance_id: instance.id.clone(),
                platform: instance
                    .platform_details
                    .clone()
                    .unwrap_or_else(|| String::from("unknown")),
            })
    }

    fn select_host_keys(&self, instance: &Instance) -> HostKeySource {
        let bucket = non_empty(self.defaults.pubkey_bucket.as_deref());
        if let Some(name) = bucket
            && let Some(arn) = instance.arn()
        {
            return HostKeySource::ObjectStorage {
                bucket: name.to_owned(),
                object_key: format!("{arn}/sshkeys"),
            };
        }
        if bucket.is_some() || self.defaults.pin_host_keys {
            HostKeySource::ConsoleOutput
        } else {
            HostKeySource::Unpinned
        }
    }
}

/// Maps provider platform details onto the distribution's default user.
///
/// Plain `Linux/UNIX` is reported by Amazon Linux, Ubuntu and Debian images
/// alike, so it names no user.
fn infer_user(platform: &str) -> Option<&'static str> {
    const USERS: &[(&str, &str)] = &[
        ("Ubuntu", "ubuntu"),
        ("Debian", "admin"),
        ("Red Hat", "ec2-user"),
        ("SUSE", "ec2-user"),
    ];
    USERS
        .iter()
        .find(|(prefix, _)| platform.starts_with(prefix))
        .map(|(_, user)| *user)
}
