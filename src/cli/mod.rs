//! Command-line interface definitions for the `ec2ssh` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `ec2ssh` binary.
///
/// Everything after the first argument `ec2ssh` does not recognise is handed
/// to ssh, with the instance name replaced by its address.
#[derive(Debug, Parser)]
#[command(
    name = "ec2ssh",
    version,
    about = "SSH to EC2 instances by Name tag, with pinned host keys",
    after_help = "Examples:\n  ec2ssh web-1\n  ec2ssh ubuntu@web-1 uptime\n  \
                  ec2ssh -l ubuntu -i ~/.ssh/ops.pem web-1\n  rsync -e ec2ssh -av src/ web-1:src/",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Print instance names completing WORD, one per line, and exit.
    #[arg(long, value_name = "WORD", conflicts_with_all = ["list", "ssh_args"])]
    pub(crate) complete: Option<String>,
    /// List running named instances (optionally only those starting with
    /// PREFIX) as name, id, region and address.
    #[arg(
        long,
        value_name = "PREFIX",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "ssh_args"
    )]
    pub(crate) list: Option<String>,
    /// Query this region instead of the configured one.
    #[arg(long, value_name = "REGION", conflicts_with = "all_regions")]
    pub(crate) region: Option<String>,
    /// Query every enabled region.
    #[arg(long)]
    pub(crate) all_regions: bool,
    /// Connect to the private address.
    #[arg(long)]
    pub(crate) private: bool,
    /// Print the ssh command instead of running it.
    #[arg(long)]
    pub(crate) print: bool,
    /// ssh options, [USER@]NAME, and an optional remote command.
    #[arg(
        value_name = "SSH_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) ssh_args: Vec<String>,
}
