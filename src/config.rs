//! Configuration loading via `ortho-config`.
//!
//! Values merge defaults, `ec2ssh.toml` discovery and `EC2SSH_*` environment
//! variables. Command-line flags are applied on top by the binary.

use std::ffi::OsString;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::aws::{AwsCli, DEFAULT_AWS_BIN};
use crate::inventory::{DEFAULT_NAME_TAG, RegionScope};
use crate::plan::PlanDefaults;
use crate::process::CommandRunner;
use crate::util::expand_tilde;

/// Default directory for pinned host-key files.
pub const DEFAULT_PUBKEY_DIR: &str = "~/.ec2ssh";

/// Default bound on the completion inventory query, in milliseconds.
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 3000;

/// Environment variables consulted when no region is configured.
pub const AWS_REGION_ENV_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Settings for inventory queries, planning and host-key pinning.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "EC2SSH",
    discovery(
        app_name = "ec2ssh",
        env_var = "EC2SSH_CONFIG_PATH",
        config_file_name = "ec2ssh.toml",
        dotfile_name = ".ec2ssh.toml",
        project_file_name = "ec2ssh.toml"
    )
)]
pub struct Ec2sshConfig {
    /// Path to the `aws` executable.
    #[ortho_config(default = DEFAULT_AWS_BIN.to_owned())]
    pub aws_bin: String,
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Named AWS profile forwarded as `--profile`.
    pub profile: Option<String>,
    /// Region to query. Falls back to `AWS_REGION` and `AWS_DEFAULT_REGION`.
    pub region: Option<String>,
    /// Query every enabled region instead of a single one. Defaults to off.
    pub all_regions: Option<bool>,
    /// Tag key holding instance names.
    #[ortho_config(default = DEFAULT_NAME_TAG.to_owned())]
    pub name_tag: String,
    /// Connect to private addresses by default (for example over a VPN).
    /// Defaults to off.
    pub private_ip: Option<bool>,
    /// Login user used when none is given and none can be inferred.
    pub default_user: Option<String>,
    /// Private key used when `-i` is not given. Supports `~/`.
    pub identity_file: Option<String>,
    /// Bucket where instances publish their host keys at boot.
    pub pubkey_bucket: Option<String>,
    /// Directory holding pinned known-hosts files. Supports `~/`.
    #[ortho_config(default = DEFAULT_PUBKEY_DIR.to_owned())]
    pub pubkey_dir: String,
    /// Pin host keys from console output when no bucket is configured.
    /// Defaults to on.
    pub pin_host_keys: Option<bool>,
    /// Pass `StrictHostKeyChecking=yes` alongside pinned keys. Defaults to on.
    pub strict_host_key_checking: Option<bool>,
    /// Bound on the completion inventory query, in milliseconds.
    #[ortho_config(default = DEFAULT_COMPLETION_TIMEOUT_MS)]
    pub completion_timeout_ms: u64,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to ec2ssh.toml",
            self.description, self.env_var, self.toml_key
        ))
    }
}

const AWS_BIN: FieldMetadata = FieldMetadata::new("AWS CLI binary", "EC2SSH_AWS_BIN", "aws_bin");
const SSH_BIN: FieldMetadata = FieldMetadata::new("ssh binary", "EC2SSH_SSH_BIN", "ssh_bin");
const NAME_TAG: FieldMetadata = FieldMetadata::new("name tag key", "EC2SSH_NAME_TAG", "name_tag");
const PUBKEY_DIR: FieldMetadata =
    FieldMetadata::new("host key directory", "EC2SSH_PUBKEY_DIR", "pubkey_dir");
const REGION: FieldMetadata = FieldMetadata::new(
    "AWS region (or AWS_REGION, or EC2SSH_ALL_REGIONS=true)",
    "EC2SSH_REGION",
    "region",
);

impl Ec2sshConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("ec2ssh")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and TOML key that supply the missing value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required value is blank
    /// and [`ConfigError::Invalid`] when an optional value is present but
    /// blank or out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require(&self.aws_bin, &AWS_BIN)?;
        Self::require(&self.ssh_bin, &SSH_BIN)?;
        Self::require(&self.name_tag, &NAME_TAG)?;
        Self::require(&self.pubkey_dir, &PUBKEY_DIR)?;
        Self::reject_blank(self.profile.as_deref(), "profile")?;
        Self::reject_blank(self.region.as_deref(), "region")?;
        Self::reject_blank(self.default_user.as_deref(), "default_user")?;
        Self::reject_blank(self.identity_file.as_deref(), "identity_file")?;
        Self::reject_blank(self.pubkey_bucket.as_deref(), "pubkey_bucket")?;
        if self.completion_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: String::from("completion_timeout_ms"),
                reason: String::from("must be greater than zero"),
            });
        }
        Ok(())
    }

    fn require(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(metadata.missing());
        }
        Ok(())
    }

    fn reject_blank(value: Option<&str>, field: &str) -> Result<(), ConfigError> {
        match value {
            Some(text) if text.trim().is_empty() => Err(ConfigError::Invalid {
                field: field.to_owned(),
                reason: String::from("must not be blank when set"),
            }),
            _ => Ok(()),
        }
    }

    /// Whether every enabled region is queried.
    #[must_use]
    pub const fn all_regions(&self) -> bool {
        matches!(self.all_regions, Some(true))
    }

    /// Whether private addresses are preferred.
    #[must_use]
    pub const fn private_ip(&self) -> bool {
        matches!(self.private_ip, Some(true))
    }

    /// Whether host keys are pinned from console output.
    #[must_use]
    pub const fn pin_host_keys(&self) -> bool {
        !matches!(self.pin_host_keys, Some(false))
    }

    /// Whether strict host key checking accompanies pinned keys.
    #[must_use]
    pub const fn strict_host_key_checking(&self) -> bool {
        !matches!(self.strict_host_key_checking, Some(false))
    }

    /// Returns the query scope, falling back to the AWS CLI's own region
    /// variables when no region is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when neither a region nor
    /// all-regions mode is configured.
    pub fn region_scope(&self) -> Result<RegionScope, ConfigError> {
        self.region_scope_from(|key| std::env::var(key).ok())
    }

    /// Variant of [`Ec2sshConfig::region_scope`] with an injectable
    /// environment lookup.
    ///
    /// # Errors
    ///
    /// See [`Ec2sshConfig::region_scope`].
    pub fn region_scope_from<F>(&self, lookup: F) -> Result<RegionScope, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.all_regions() {
            return Ok(RegionScope::AllRegions);
        }
        self.region
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                AWS_REGION_ENV_VARS
                    .iter()
                    .filter_map(|key| lookup(key))
                    .find(|name| !name.trim().is_empty())
            })
            .map(|name| RegionScope::Region(name.trim().to_owned()))
            .ok_or_else(|| REGION.missing())
    }

    /// Bound applied to completion queries.
    #[must_use]
    pub const fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    /// Planner defaults derived from this configuration.
    #[must_use]
    pub fn plan_defaults(&self) -> PlanDefaults {
        PlanDefaults {
            default_user: self.default_user.clone(),
            identity_file: self
                .identity_file
                .as_deref()
                .map(|path| Utf8PathBuf::from(expand_tilde(path))),
            pubkey_bucket: self.pubkey_bucket.clone(),
            pin_host_keys: self.pin_host_keys(),
        }
    }

    /// Directory holding pinned known-hosts files, with `~/` expanded.
    #[must_use]
    pub fn known_hosts_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(expand_tilde(&self.pubkey_dir))
    }

    /// Builds an [`AwsCli`] wrapper for this configuration.
    pub fn aws_cli<R: CommandRunner>(&self, runner: R) -> AwsCli<R> {
        AwsCli::new(self.aws_bin.clone(), self.profile.clone(), runner)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configured value is unusable.
    #[error("invalid configuration for {field}: {reason}")]
    Invalid {
        /// TOML key of the offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
