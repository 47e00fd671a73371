//! Builds `ec2ssh` commands isolated from the caller's environment.
//!
//! Pulled into integration tests with:
//!
//! ```rust
//! #[path = "common/ec2ssh_command.rs"]
//! mod ec2ssh_command;
//! ```

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;

/// Builds an `ec2ssh` command rooted at `home` that runs `aws_bin` and pins
/// host keys under `keys_dir`. Configuration files and `EC2SSH_*` settings
/// from the caller are ignored.
pub fn command_in(home: &str, aws_bin: &str, keys_dir: &str) -> Command {
    let mut cmd = cargo_bin_cmd!("ec2ssh");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", format!("{home}/.config"))
        .env("EC2SSH_AWS_BIN", aws_bin)
        .env("EC2SSH_REGION", "us-east-1")
        .env("EC2SSH_PUBKEY_DIR", keys_dir);
    for name in [
        "EC2SSH_CONFIG_PATH",
        "EC2SSH_DEBUG",
        "EC2SSH_PROFILE",
        "EC2SSH_DEFAULT_USER",
        "EC2SSH_IDENTITY_FILE",
        "EC2SSH_PUBKEY_BUCKET",
        "EC2SSH_ALL_REGIONS",
        "EC2SSH_PRIVATE_IP",
        "EC2SSH_PIN_HOST_KEYS",
        "EC2SSH_STRICT_HOST_KEY_CHECKING",
        "EC2SSH_COMPLETION_TIMEOUT_MS",
        "RUST_LOG",
    ] {
        cmd.env_remove(name);
    }
    cmd
}
