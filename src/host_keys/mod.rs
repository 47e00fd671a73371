//! Host key pinning.
//!
//! Instances publish their SSH host keys either on the serial console
//! (cloud-init prints them between well-known markers) or by uploading them
//! to object storage at boot. The keys are written once into a per-instance
//! known-hosts file which ssh is then pointed at, so the first connection is
//! verified without trust-on-first-use prompts.

use std::ffi::OsString;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::aws::{AwsCli, AwsCliError};
use crate::plan::{ConnectionPlan, HostKeySource};
use crate::process::CommandRunner;

/// Marker that opens the host key block in console output.
pub const HOST_KEYS_BEGIN: &str = "-----BEGIN SSH HOST KEY KEYS-----";
/// Marker that closes the host key block in console output.
pub const HOST_KEYS_END: &str = "-----END SSH HOST KEY KEYS-----";

/// Errors raised while pinning host keys.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HostKeyError {
    /// Raised when the keys cannot be downloaded.
    #[error("failed to fetch host keys: {0}")]
    Fetch(#[from] AwsCliError),
    /// Raised when the instance has not published console output yet.
    #[error(
        "console output for {instance_id} is not available yet; EC2 can take several \
         minutes to publish it after boot"
    )]
    ConsoleOutputPending {
        /// Instance identifier.
        instance_id: String,
    },
    /// Raised when the fetched data carries no host keys.
    #[error("no SSH host keys found for {instance_id} in {origin}")]
    MissingHostKeys {
        /// Instance identifier.
        instance_id: String,
        /// Where the keys were looked for.
        origin: String,
    },
    /// Raised when the known-hosts file cannot be written.
    #[error("known hosts file error at {path}: {message}")]
    Io {
        /// File or directory involved.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}

/// Retrieves the raw host key lines for a planned connection.
pub trait HostKeyFetcher {
    /// Returns one public key per entry (for example
    /// `ssh-ed25519 AAAA... root@host`).
    ///
    /// # Errors
    ///
    /// Returns [`HostKeyError`] when the keys cannot be retrieved.
    fn fetch(&self, plan: &ConnectionPlan) -> Result<Vec<String>, HostKeyError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsoleOutput {
    #[serde(default)]
    output: Option<String>,
}

/// Fetches host keys through the `aws` CLI.
#[derive(Clone, Debug)]
pub struct Ec2HostKeyFetcher<R: CommandRunner> {
    aws: AwsCli<R>,
}

impl<R: CommandRunner> Ec2HostKeyFetcher<R> {
    /// Creates a fetcher.
    pub const fn new(aws: AwsCli<R>) -> Self {
        Self { aws }
    }

    fn console_keys(&self, plan: &ConnectionPlan) -> Result<Vec<String>, HostKeyError> {
        let args = [
            OsString::from("--instance-id"),
            OsString::from(&plan.instance_id),
        ];
        let response: ConsoleOutput = self.aws.run_json(
            "ec2",
            "get-console-output",
            Some(&plan.region),
            &args,
            "console output",
        )?;
        let text = response
            .output
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| HostKeyError::ConsoleOutputPending {
                instance_id: plan.instance_id.clone(),
            })?;
        parse_console_host_keys(&text).ok_or_else(|| HostKeyError::MissingHostKeys {
            instance_id: plan.instance_id.clone(),
            origin: String::from("console output"),
        })
    }

    fn bucket_keys(
        &self,
        plan: &ConnectionPlan,
        bucket: &str,
        object_key: &str,
    ) -> Result<Vec<String>, HostKeyError> {
        let url = format!("s3://{bucket}/{object_key}");
        let args = [OsString::from(&url), OsString::from("-")];
        let body = self.aws.run("s3", "cp", None, &args)?;
        let keys = key_lines(&body);
        if keys.is_empty() {
            return Err(HostKeyError::MissingHostKeys {
                instance_id: plan.instance_id.clone(),
                origin: url,
            });
        }
        Ok(keys)
    }
}

impl<R: CommandRunner> HostKeyFetcher for Ec2HostKeyFetcher<R> {
    fn fetch(&self, plan: &ConnectionPlan) -> Result<Vec<String>, HostKeyError> {
        match &plan.host_keys {
            HostKeySource::ConsoleOutput => self.console_keys(plan),
            HostKeySource::ObjectStorage { bucket, object_key } => {
                self.bucket_keys(plan, bucket, object_key)
            }
            HostKeySource::Unpinned => Ok(Vec::new()),
        }
    }
}

/// Extracts the host keys cloud-init printed to the console.
///
/// Returns `None` when the marker block is absent or empty.
#[must_use]
pub fn parse_console_host_keys(output: &str) -> Option<Vec<String>> {
    let (_, after_begin) = output.split_once(HOST_KEYS_BEGIN)?;
    let (block, _) = after_begin.split_once(HOST_KEYS_END)?;
    let keys = key_lines(block);
    (!keys.is_empty()).then_some(keys)
}

fn key_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Directory of pinned known-hosts files, one per instance and address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KnownHostsCache {
    dir: Utf8PathBuf,
}

impl KnownHostsCache {
    /// Creates a cache rooted at `dir`. The directory is created on first
    /// write.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the known-hosts path for a plan.
    #[must_use]
    pub fn path_for(&self, plan: &ConnectionPlan) -> Utf8PathBuf {
        self.dir.join(file_name(plan))
    }

    /// Makes sure a pinned known-hosts file exists for `plan`, fetching keys
    /// when it does not. Returns `None` for unpinned plans.
    ///
    /// # Errors
    ///
    /// Returns [`HostKeyError`] when keys cannot be fetched or written.
    pub fn ensure<F: HostKeyFetcher + ?Sized>(
        &self,
        plan: &ConnectionPlan,
        fetcher: &F,
    ) -> Result<Option<Utf8PathBuf>, HostKeyError> {
        if plan.host_keys == HostKeySource::Unpinned {
            return Ok(None);
        }

        let path = self.path_for(plan);
        let dir = self.open_dir()?;
        let name = file_name(plan);
        if dir.try_exists(&name).map_err(|err| io_error(&path, &err))? {
            debug!(path = %path, "using cached host keys");
            return Ok(Some(path));
        }

        let keys = fetcher.fetch(plan)?;
        if keys.is_empty() {
            return Err(HostKeyError::MissingHostKeys {
                instance_id: plan.instance_id.clone(),
                origin: plan.host_keys.to_string(),
            });
        }

        let contents: String = keys
            .iter()
            .map(|key| format!("{} {key}\n", plan.address))
            .collect();
        let temp_name = format!(".{name}.{}.tmp", Uuid::new_v4().simple());
        dir.write(&temp_name, contents)
            .map_err(|err| io_error(&self.dir.join(&temp_name), &err))?;
        if let Err(err) = dir.rename(&temp_name, &dir, &name) {
            dir.remove_file(&temp_name).ok();
            return Err(io_error(&path, &err));
        }
        debug!(path = %path, count = keys.len(), "pinned host keys");
        Ok(Some(path))
    }

    fn open_dir(&self) -> Result<Dir, HostKeyError> {
        Dir::create_ambient_dir_all(&self.dir, ambient_authority())
            .map_err(|err| io_error(&self.dir, &err))?;
        Dir::open_ambient_dir(&self.dir, ambient_authority())
            .map_err(|err| io_error(&self.dir, &err))
    }
}

fn file_name(plan: &ConnectionPlan) -> String {
    format!("pubkey-{}-{}", plan.instance_id, plan.address)
}

fn io_error(path: &Utf8Path, err: &io::Error) -> HostKeyError {
    HostKeyError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
