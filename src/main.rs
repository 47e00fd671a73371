//! Binary entry point for the `ec2ssh` CLI.

use std::env;
use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::debug;

use ec2ssh::{
    CompletionService, ConfigError, ConnectionPlanner, Ec2HostKeyFetcher, Ec2Inventory,
    Ec2sshConfig, HostKeyError, Instance, InstanceResolver, KnownHostsCache, PlanError,
    ProcessCommandRunner, ProcessError, RegionScope, ResolveError, SshArgsError, SshInvocation,
    SshTarget,
};

mod cli;

use cli::Cli;


/// Exit code for a pattern that matches nothing.
const EXIT_NO_MATCH: i32 = 1;
/// Exit code for a pattern that matches several instances. Argument errors
/// never use it; clap's own usage failures are remapped to [`EXIT_USAGE`].
const EXIT_AMBIGUOUS: i32 = 2;
/// Exit code for inventory, network and credential failures.
const EXIT_INVENTORY: i32 = 3;
/// Exit code for invalid input, configuration and planning failures.
const EXIT_USAGE: i32 = 4;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Args(#[from] SshArgsError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    HostKeys(#[from] HostKeyError),
    #[error("failed to launch ssh: {0}")]
    Launch(#[from] ProcessError),
    #[error("failed to write output: {0}")]
    Output(String),
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Resolve(ResolveError::NoMatch { .. }) => EXIT_NO_MATCH,
            Self::Resolve(ResolveError::AmbiguousMatch { .. }) => EXIT_AMBIGUOUS,
            Self::Resolve(ResolveError::InventoryUnavailable(_))
            | Self::HostKeys(HostKeyError::Fetch(_)) => EXIT_INVENTORY,
            Self::Resolve(ResolveError::InvalidQuery { .. })
            | Self::Config(_)
            | Self::Args(_)
            | Self::Plan(_)
            | Self::HostKeys(_)
            | Self::Launch(_)
            | Self::Output(_) => EXIT_USAGE,
        }
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Output(value.to_string())
    }
}

fn main() {
    init_logging();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            process::exit(usage_exit_code(&err));
        }
    };
    let exit_code = match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

/// Help and version requests succeed; every other argument error is a usage
/// failure.
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() { EXIT_USAGE } else { 0 }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default_filter = if debug_requested(env::var("EC2SSH_DEBUG").ok().as_deref()) {
        "ec2ssh=debug,warn"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

fn debug_requested(value: Option<&str>) -> bool {
    value.is_some_and(|flag| {
        matches!(
            flag.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn dispatch(cli: &Cli) -> Result<i32, CliError> {
    let mut stdout = io::stdout().lock();
    if let Some(word) = cli.complete.as_deref() {
        return Ok(complete(cli, word, &mut stdout));
    }

    let config = load_config(cli)?;
    let scope = config.region_scope()?;
    if let Some(prefix) = cli.list.as_deref() {
        return list(&config, scope, prefix, &mut stdout);
    }
    connect(cli, &config, scope, &mut stdout)
}

fn load_config(cli: &Cli) -> Result<Ec2sshConfig, ConfigError> {
    let mut config = Ec2sshConfig::load_without_cli_args()?;
    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut Ec2sshConfig, cli: &Cli) {
    if let Some(region) = &cli.region {
        config.region = Some(region.clone());
        config.all_regions = Some(false);
    }
    if cli.all_regions {
        config.all_regions = Some(true);
    }
    if cli.private {
        config.private_ip = Some(true);
    }
}

/// Prints completion candidates. Never fails: shell completion has no way to
/// show diagnostics, so every problem yields an empty list.
fn complete(cli: &Cli, word: &str, out: &mut impl Write) -> i32 {
    let candidates = load_config(cli)
        .and_then(|config| config.region_scope().map(|scope| (config, scope)))
        .map_or_else(
            |err| {
                debug!(error = %err, "completion unavailable");
                Vec::new()
            },
            |(config, scope)| {
                let runner = ProcessCommandRunner::with_timeout(config.completion_timeout());
                let inventory = Ec2Inventory::new(config.aws_cli(runner), config.name_tag.clone());
                CompletionService::new(inventory, scope).complete_names(word)
            },
        );

    for candidate in candidates {
        if writeln!(out, "{candidate}").is_err() {
            break;
        }
    }
    0
}

fn list(
    config: &Ec2sshConfig,
    scope: RegionScope,
    prefix: &str,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let inventory = Ec2Inventory::new(
        config.aws_cli(ProcessCommandRunner::new()),
        config.name_tag.clone(),
    );
    let instances = InstanceResolver::new(inventory, scope).list(prefix)?;
    for instance in &instances {
        writeln!(out, "{}", instance_row(instance, prefix))?;
    }
    Ok(0)
}

fn connect(
    cli: &Cli,
    config: &Ec2sshConfig,
    scope: RegionScope,
    out: &mut impl Write,
) -> Result<i32, CliError> {
    let target = SshTarget::parse(&cli.ssh_args)?;
    let runner = ProcessCommandRunner::new();
    let inventory = Ec2Inventory::new(config.aws_cli(runner.clone()), config.name_tag.clone());
    let instance = InstanceResolver::new(inventory, scope).resolve_one(&target.instance_name)?;

    let plan = ConnectionPlanner::new(config.plan_defaults())
        .build_plan(&instance, &target.connect_options(config.private_ip()))?;
    let fetcher = Ec2HostKeyFetcher::new(config.aws_cli(runner));
    let known_hosts = KnownHostsCache::new(config.known_hosts_dir()).ensure(&plan, &fetcher)?;

    let invocation = SshInvocation::new(
        &config.ssh_bin,
        &plan,
        known_hosts.as_deref(),
        config.strict_host_key_checking(),
        &target,
    );
    debug!(instance = %plan.instance_id, address = %plan.address, "connecting");
    if cli.print {
        writeln!(out, "{}", invocation.render())?;
        return Ok(0);
    }
    Ok(invocation.launch()?)
}

/// Formats `name<TAB>id<TAB>region<TAB>address` for listings and ambiguity
/// reports.
fn instance_row(instance: &Instance, prefix: &str) -> String {
    let name = instance
        .name_tags
        .iter()
        .find(|tag| tag.starts_with(prefix))
        .map_or_else(|| instance.display_name(), String::as_str);
    let address = instance.any_address().unwrap_or("-");
    format!("{name}\t{}\t{}\t{address}", instance.id, instance.region)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "ec2ssh: {err}").ok();
    if let CliError::Resolve(ResolveError::AmbiguousMatch {
        pattern,
        candidates,
    }) = err
    {
        for candidate in candidates {
            writeln!(target, "  {}", instance_row(candidate, pattern)).ok();
        }
    }
}
