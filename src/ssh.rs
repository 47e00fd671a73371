//! ssh command-line handling.
//!
//! `ec2ssh` accepts ssh's own arguments so it can stand in for `ssh`
//! (including as `rsync -e ec2ssh`). The first operand is the instance name;
//! it is replaced by the planned address and pinning options are prepended.

use std::borrow::Cow;
use std::ffi::OsString;
use std::process::Command;

use camino::Utf8Path;
use shell_escape::unix::escape;
use thiserror::Error;
use tracing::debug;

use crate::plan::{ConnectOptions, ConnectionPlan, IdentitySource};
use crate::process::ProcessError;

/// ssh short options that consume a value.
const OPTIONS_WITH_VALUE: &str = "BbcDEeFIiJLlmOoPpRSWw";

/// Errors raised while interpreting ssh arguments.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SshArgsError {
    /// Raised when no operand names an instance.
    #[error("instance name is required")]
    MissingInstanceName,
    /// Raised when an option that takes a value ends the argument list.
    #[error("option -{option} requires a value")]
    MissingOptionValue {
        /// Option letter.
        option: char,
    },
}

/// ssh arguments split around the instance name.
///
/// ssh keeps reading options after the destination until the remote command
/// starts, and honours the first login user it sees. `-l` and `-i` are lifted
/// out of both option runs with the same precedence.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SshTarget {
    /// Name as typed, without any `user@` prefix.
    pub instance_name: String,
    /// Login user: the first of `-l` before the name, a `user@` prefix, or
    /// `-l` after the name.
    pub user: Option<String>,
    /// First key given with `-i`. Further `-i` options pass through.
    pub identity_file: Option<String>,
    /// Options before the name, with the lifted `-l` and `-i` removed.
    pub leading: Vec<String>,
    /// Options after the name (lifted ones removed) and the remote command.
    pub trailing: Vec<String>,
}

impl SshTarget {
    /// Splits ssh arguments around the first operand.
    ///
    /// # Errors
    ///
    /// Returns [`SshArgsError::MissingInstanceName`] when there is no operand
    /// and [`SshArgsError::MissingOptionValue`] when an option is truncated.
    pub fn parse(args: &[String]) -> Result<Self, SshArgsError> {
        let mut target = Self::default();
        let mut leading = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            if arg == "--" {
                let operand = iter.next().ok_or(SshArgsError::MissingInstanceName)?;
                target.set_operand(operand);
                target.leading = leading;
                target.trailing = iter.cloned().collect();
                return Ok(target);
            }
            let Some(flags) = arg.strip_prefix('-').filter(|rest| !rest.is_empty()) else {
                target.set_operand(arg);
                target.leading = leading;
                target.take_trailing(&mut iter)?;
                return Ok(target);
            };
            target.take_option(arg, flags, &mut iter, &mut leading)?;
        }

        Err(SshArgsError::MissingInstanceName)
    }

    fn set_operand(&mut self, operand: &str) {
        match operand.split_once('@') {
            Some((user, name)) => {
                if self.user.is_none() && !user.is_empty() {
                    self.user = Some(user.to_owned());
                }
                name.clone_into(&mut self.instance_name);
            }
            None => operand.clone_into(&mut self.instance_name),
        }
    }

    /// Reads the options that follow the name, up to the remote command or
    /// `--`, then keeps the rest verbatim.
    fn take_trailing<'a>(
        &mut self,
        rest: &mut impl Iterator<Item = &'a String>,
    ) -> Result<(), SshArgsError> {
        let mut trailing = Vec::new();
        while let Some(arg) = rest.next() {
            let option = arg.strip_prefix('-').filter(|rest_of_arg| !rest_of_arg.is_empty());
            match option {
                Some(flags) if arg != "--" => {
                    self.take_option(arg, flags, rest, &mut trailing)?;
                }
                _ => {
                    trailing.push(arg.clone());
                    trailing.extend(rest.by_ref().cloned());
                }
            }
        }
        self.trailing = trailing;
        Ok(())
    }

    fn take_option<'a>(
        &mut self,
        arg: &str,
        flags: &str,
        rest: &mut impl Iterator<Item = &'a String>,
        out: &mut Vec<String>,
    ) -> Result<(), SshArgsError> {
        for (offset, flag) in flags.char_indices() {
            if !OPTIONS_WITH_VALUE.contains(flag) {
                continue;
            }
            let attached = flags.get(offset + flag.len_utf8()..).unwrap_or_default();
            let value = if attached.is_empty() {
                rest.next()
                    .cloned()
                    .ok_or(SshArgsError::MissingOptionValue { option: flag })?
            } else {
                attached.to_owned()
            };

            // Only standalone -l/-i are lifted; bundles pass through.
            match (flag, offset) {
                ('l', 0) => {
                    if self.user.is_none() {
                        self.user = Some(value);
                    }
                }
                ('i', 0) if self.identity_file.is_none() => self.identity_file = Some(value),
                _ => {
                    out.push(arg.to_owned());
                    if attached.is_empty() {
                        out.push(value);
                    }
                }
            }
            return Ok(());
        }
        out.push(arg.to_owned());
        Ok(())
    }

    /// Converts the lifted user and key into planner overrides.
    #[must_use]
    pub fn connect_options(&self, force_private: bool) -> ConnectOptions {
        ConnectOptions {
            username: self.user.clone(),
            identity_file: self
                .identity_file
                .as_deref()
                .map(|path| crate::util::expand_tilde(path).into()),
            force_private,
        }
    }
}

/// Fully resolved ssh command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshInvocation {
    program: String,
    args: Vec<String>,
}

impl SshInvocation {
    /// Builds the ssh command for `plan`.
    ///
    /// `known_hosts` is the pinned known-hosts file, if any. Strict host key
    /// checking is only requested alongside a pinned file.
    #[must_use]
    pub fn new(
        ssh_bin: &str,
        plan: &ConnectionPlan,
        known_hosts: Option<&Utf8Path>,
        strict_host_key_checking: bool,
        target: &SshTarget,
    ) -> Self {
        let mut args = Vec::new();
        if let Some(path) = known_hosts {
            args.push(String::from("-o"));
            args.push(format!("UserKnownHostsFile={path}"));
            if strict_host_key_checking {
                args.push(String::from("-o"));
                args.push(String::from("StrictHostKeyChecking=yes"));
            }
        }
        if let IdentitySource::LocalKey(key) = &plan.identity {
            args.push(String::from("-i"));
            args.push(key.to_string());
        }
        args.push(String::from("-l"));
        args.push(plan.username.clone());
        args.extend(target.leading.iter().cloned());
        args.push(plan.address.clone());
        args.extend(target.trailing.iter().cloned());

        Self {
            program: ssh_bin.to_owned(),
            args,
        }
    }

    /// Returns the ssh binary.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the ssh arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Renders the command as a shell-escaped string.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| escape(Cow::Borrowed(part.as_str())).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replaces the current process with ssh. On non-Unix platforms ssh is
    /// run as a child and its exit code is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] when ssh cannot be started.
    pub fn launch(&self) -> Result<i32, ProcessError> {
        debug!(command = %self.render(), "launching ssh");
        let mut command = Command::new(&self.program);
        command.args(self.args.iter().map(OsString::from));
        self.exec(command)
    }

    #[cfg(unix)]
    fn exec(&self, mut command: Command) -> Result<i32, ProcessError> {
        use std::os::unix::process::CommandExt;

        let err = command.exec();
        Err(ProcessError::Spawn {
            program: self.program.clone(),
            message: err.to_string(),
        })
    }

    #[cfg(not(unix))]
    fn exec(&self, mut command: Command) -> Result<i32, ProcessError> {
        command
            .status()
            .map(|status| status.code().unwrap_or(255))
            .map_err(|err| ProcessError::Spawn {
                program: self.program.clone(),
                message: err.to_string(),
            })
    }
}
