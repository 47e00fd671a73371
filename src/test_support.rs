//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::rc::Rc;

use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard};

use crate::inventory::{Instance, Inventory, InventoryError, NameFilter, RegionScope};
use crate::process::{CommandOutput, CommandRunner, ProcessError};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic command outcomes without spawning processes.
/// Running out of responses behaves like a missing binary.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<Result<CommandOutput, ProcessError>>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(Ok(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }));
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes a timeout for the next invocation.
    pub fn push_timeout(&self, timeout_ms: u128) {
        self.responses
            .borrow_mut()
            .push_back(Err(ProcessError::Timeout {
                program: String::from("aws"),
                timeout_ms,
            }));
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, ProcessError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProcessError::Spawn {
                    program: program.to_owned(),
                    message: String::from("no scripted response available"),
                })
            })
    }
}

/// In-memory [`Inventory`] returning instances whose name matches the
/// filter, regardless of state or scope.
#[derive(Clone, Debug, Default)]
pub struct FakeInventory {
    instances: Rc<Vec<Instance>>,
    failure: Rc<RefCell<Option<InventoryError>>>,
    queries: Rc<RefCell<Vec<(RegionScope, NameFilter)>>>,
}

impl FakeInventory {
    /// Creates an inventory holding `instances`.
    #[must_use]
    pub fn new(instances: Vec<Instance>) -> Self {
        Self {
            instances: Rc::new(instances),
            ..Self::default()
        }
    }

    /// Makes every subsequent query fail with `error`.
    pub fn fail_with(&self, error: InventoryError) {
        self.failure.replace(Some(error));
    }

    /// Returns the queries issued so far.
    #[must_use]
    pub fn queries(&self) -> Vec<(RegionScope, NameFilter)> {
        self.queries.borrow().clone()
    }
}

impl Inventory for FakeInventory {
    fn query_instances(
        &self,
        scope: &RegionScope,
        filter: &NameFilter,
    ) -> Result<Vec<Instance>, InventoryError> {
        self.queries
            .borrow_mut()
            .push((scope.clone(), filter.clone()));
        if let Some(error) = self.failure.borrow().clone() {
            return Err(error);
        }
        Ok(self
            .instances
            .iter()
            .filter(|instance| filter.matches(instance))
            .cloned()
            .collect())
    }
}

/// Renders `aws ec2 describe-instances` output with a single reservation.
/// The instances' regions are ignored; the CLI does not report them.
#[must_use]
pub fn describe_instances_json(owner_id: &str, instances: &[Instance]) -> String {
    let rendered: Vec<Value> = instances.iter().map(instance_json).collect();
    json!({
        "Reservations": [
            { "OwnerId": owner_id, "Instances": rendered }
        ]
    })
    .to_string()
}

fn instance_json(instance: &Instance) -> Value {
    let tags: Vec<Value> = instance
        .name_tags
        .iter()
        .map(|name| json!({ "Key": "Name", "Value": name }))
        .chain(std::iter::once(json!({ "Key": "team", "Value": "platform" })))
        .collect();
    let mut rendered = json!({
        "InstanceId": instance.id,
        "State": { "Code": 16, "Name": instance.state.as_str() },
        "Tags": tags,
    });
    if let Some(object) = rendered.as_object_mut() {
        for (key, value) in [
            ("PublicIpAddress", &instance.public_address),
            ("PrivateIpAddress", &instance.private_address),
            ("PlatformDetails", &instance.platform_details),
        ] {
            if let Some(text) = value {
                object.insert(key.to_owned(), json!(text));
            }
        }
    }
    rendered
}

/// Renders `aws ec2 describe-regions` output.
#[must_use]
pub fn describe_regions_json(regions: &[&str]) -> String {
    let rendered: Vec<Value> = regions
        .iter()
        .map(|name| json!({ "RegionName": name, "OptInStatus": "opt-in-not-required" }))
        .collect();
    json!({ "Regions": rendered }).to_string()
}

/// Renders `aws ec2 get-console-output` output.
#[must_use]
pub fn console_output_json(instance_id: &str, output: Option<&str>) -> String {
    let mut rendered = json!({ "InstanceId": instance_id });
    if let (Some(text), Some(object)) = (output, rendered.as_object_mut()) {
        object.insert(String::from("Output"), json!(text));
    }
    rendered.to_string()
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and restores variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    /// An empty value removes the variable instead.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe {
                if value.is_empty() {
                    env::remove_var(key);
                } else {
                    env::set_var(key, value);
                }
            }
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
