//! Fake `aws` executable for exercising the binary end to end.
//!
//! Integration tests are compiled as separate crates, so this helper is pulled
//! in next to the command builder it relies on:
//!
//! ```rust
//! #[path = "common/ec2ssh_command.rs"]
//! mod ec2ssh_command;
//! #[path = "common/fake_aws.rs"]
//! mod fake_aws;
//! ```

use std::fs;
use std::os::unix::fs::PermissionsExt;

use assert_cmd::Command;
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Host key printed by the fake console output.
pub const HOST_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIFAKEKEY root@web-1";

/// Scratch home directory holding a scripted `aws` binary.
pub struct FakeAws {
    tmp: TempDir,
    root: Utf8PathBuf,
}

impl FakeAws {
    /// Creates a fake that answers each `aws` operation with the given body.
    /// Unknown operations fail the way the real CLI does on bad credentials.
    pub fn new(responses: &[(&str, &str)]) -> Self {
        Self::with_delay(responses, None)
    }

    /// Like [`FakeAws::new`], but every answer waits `seconds` first.
    pub fn slow(responses: &[(&str, &str)], seconds: &str) -> Self {
        Self::with_delay(responses, Some(seconds))
    }

    fn with_delay(responses: &[(&str, &str)], delay: Option<&str>) -> Self {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp dir should be utf8: {}", path.display()));

        let mut script = String::from("#!/bin/sh\n");
        if let Some(seconds) = delay {
            script.push_str(&format!("sleep {seconds}\n"));
        }
        script.push_str("case \"$*\" in\n");
        for (operation, body) in responses {
            script.push_str(&format!(
                "  *\"{operation}\"*)\n    cat <<'EC2SSH_JSON'\n{body}\nEC2SSH_JSON\n    ;;\n"
            ));
        }
        script.push_str(
            "  *)\n    echo \"Unable to locate credentials ($*)\" >&2\n    exit 253\n    ;;\nesac\n",
        );

        let bin = root.join("aws");
        fs::write(&bin, script).unwrap_or_else(|err| panic!("write fake aws: {err}"));
        fs::set_permissions(&bin, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|err| panic!("chmod fake aws: {err}"));

        Self { tmp, root }
    }

    /// Path of the scripted binary.
    pub fn bin(&self) -> Utf8PathBuf {
        self.root.join("aws")
    }

    /// Directory used for pinned known-hosts files.
    pub fn keys_dir(&self) -> Utf8PathBuf {
        self.root.join("keys")
    }

    /// Builds an `ec2ssh` command isolated from the caller's environment and
    /// configuration files.
    pub fn command(&self) -> Command {
        crate::ec2ssh_command::command_in(
            self.tmp.path().to_string_lossy().as_ref(),
            self.bin().as_str(),
            self.keys_dir().as_str(),
        )
    }
}
