//! Thin wrapper around the `aws` command-line client.
//!
//! Inventory queries and host-key retrieval shell out to `aws` rather than
//! linking an SDK, so credentials, profiles, SSO sessions and endpoint
//! overrides behave exactly as they do for the user's own CLI invocations.

use std::ffi::OsString;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::process::{CommandRunner, ProcessError};

/// Default AWS CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

/// Errors raised while talking to the AWS CLI.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AwsCliError {
    /// Raised when the CLI cannot be started or does not finish in time.
    #[error(transparent)]
    Process(#[from] ProcessError),
    /// Raised when `aws` returns a non-zero exit status.
    #[error("{program} {operation} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Program that failed (typically `aws`).
        program: String,
        /// Service and operation that was invoked, for example
        /// `ec2 describe-instances`.
        operation: String,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when JSON output from the CLI cannot be parsed.
    #[error("failed to parse {resource} output: {message}")]
    Parse {
        /// Resource being parsed (for example `instances`).
        resource: String,
        /// Parser error message.
        message: String,
    },
}

/// Invokes `aws <service> <operation>` through a [`CommandRunner`].
#[derive(Clone, Debug)]
pub struct AwsCli<R: CommandRunner> {
    bin: String,
    profile: Option<String>,
    runner: R,
}

impl<R: CommandRunner> AwsCli<R> {
    /// Creates a wrapper around `bin`, forwarding `--profile` when set.
    pub fn new(bin: impl Into<String>, profile: Option<String>, runner: R) -> Self {
        Self {
            bin: bin.into(),
            profile,
            runner,
        }
    }

    /// Runs an operation and returns its raw standard output.
    ///
    /// # Errors
    ///
    /// Returns [`AwsCliError::Process`] when the CLI cannot run and
    /// [`AwsCliError::CommandFailure`] on a non-zero exit status.
    pub fn run(
        &self,
        service: &str,
        operation: &str,
        region: Option<&str>,
        args: &[OsString],
    ) -> Result<String, AwsCliError> {
        let argv = self.build_args(service, operation, region, args);
        let output = self.runner.run(&self.bin, &argv)?;
        if output.is_success() {
            return Ok(output.stdout);
        }

        debug!(
            program = %self.bin,
            service,
            operation,
            status = %output.status_text(),
            "aws invocation failed"
        );
        Err(AwsCliError::CommandFailure {
            program: self.bin.clone(),
            operation: format!("{service} {operation}"),
            status_text: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }

    /// Runs an operation with `--output json` and deserialises the result.
    ///
    /// # Errors
    ///
    /// Returns any error from [`AwsCli::run`], or [`AwsCliError::Parse`] when
    /// the output is not the expected JSON document.
    pub fn run_json<T>(
        &self,
        service: &str,
        operation: &str,
        region: Option<&str>,
        args: &[OsString],
        resource: &str,
    ) -> Result<T, AwsCliError>
    where
        T: DeserializeOwned,
    {
        let mut json_args = args.to_vec();
        json_args.push(OsString::from("--output"));
        json_args.push(OsString::from("json"));
        let stdout = self.run(service, operation, region, &json_args)?;
        serde_json::from_str::<T>(&stdout).map_err(|err| AwsCliError::Parse {
            resource: resource.to_owned(),
            message: err.to_string(),
        })
    }

    fn build_args(
        &self,
        service: &str,
        operation: &str,
        region: Option<&str>,
        args: &[OsString],
    ) -> Vec<OsString> {
        let mut argv = vec![OsString::from(service), OsString::from(operation)];
        argv.extend(args.iter().cloned());
        if let Some(name) = region {
            argv.push(OsString::from("--region"));
            argv.push(OsString::from(name));
        }
        if let Some(profile) = &self.profile {
            argv.push(OsString::from("--profile"));
            argv.push(OsString::from(profile));
        }
        argv
    }
}
