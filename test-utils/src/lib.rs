//! Test doubles shared by the devhost integration tests.
//!
//! - [`MockDriver`]: in-memory driver with scriptable state transitions
//! - [`ScriptedRunner`]: command runner that records instead of executing
//! - [`LoopbackTransport`]: driver transport that serves calls in-process
//! - [`Sandbox`]: temporary directory standing in for the host filesystem

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use devhost::drivers::{Driver, DriverTransport, serve_call};
use devhost::os::{CommandOutput, CommandRunner};
use devhost::preflight::HostPaths;
use devhost_shared::errors::{DevhostError, DevhostResult, DriverError, DriverResult};
use devhost_shared::state::State;
use parking_lot::Mutex;
use tempfile::TempDir;

// ============================================================================
// MOCK DRIVER
// ============================================================================

#[derive(Debug)]
struct Transition {
    target: State,
    remaining: u32,
}

#[derive(Debug)]
struct MockState {
    state: State,
    transition: Option<Transition>,
    settle_after: u32,
    never_settle: bool,
    fail_next: VecDeque<DriverError>,
    fail_state_queries: bool,
    calls: Vec<String>,
    polls: usize,
    configs: Vec<Vec<u8>>,
    url: String,
}

/// Driver whose machine changes state only when polled.
///
/// Actions schedule a transition that completes on the `settle_after`-th
/// `get_state` call (immediately when zero). Inspect and reconfigure it
/// through a [`MockHandle`] once it is owned by a `Host`.
pub struct MockDriver {
    name: String,
    inner: Arc<Mutex<MockState>>,
}

/// Shared view of a [`MockDriver`].
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<Mutex<MockState>>,
}

impl MockDriver {
    pub fn new(initial: State) -> Self {
        Self {
            name: "mock".to_string(),
            inner: Arc::new(Mutex::new(MockState {
                state: initial,
                transition: None,
                settle_after: 0,
                never_settle: false,
                fail_next: VecDeque::new(),
                fail_state_queries: false,
                calls: Vec::new(),
                polls: 0,
                configs: Vec::new(),
                url: "tcp://192.168.130.11:2376".to_string(),
            })),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    fn act(&self, call: &str, intermediate: State, target: State) -> DriverResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(call.to_string());
        if let Some(err) = inner.fail_next.pop_front() {
            return Err(err);
        }

        if inner.settle_after == 0 && !inner.never_settle {
            inner.state = target;
        } else {
            inner.state = intermediate;
            inner.transition = Some(Transition {
                target,
                remaining: inner.settle_after,
            });
        }
        Ok(())
    }
}

impl Driver for MockDriver {
    fn driver_name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> DriverResult<()> {
        self.act("start", State::Starting, State::Running)
    }

    fn stop(&mut self) -> DriverResult<()> {
        self.act("stop", State::Stopping, State::Stopped)
    }

    fn kill(&mut self) -> DriverResult<()> {
        self.act("kill", State::Stopping, State::Stopped)
    }

    fn restart(&mut self) -> DriverResult<()> {
        self.act("restart", State::Starting, State::Running)
    }

    fn get_state(&self) -> DriverResult<State> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.polls += 1;
        if inner.fail_state_queries {
            return Err(DriverError::Backend("state query failed".to_string()));
        }

        if !inner.never_settle
            && let Some(transition) = inner.transition.as_mut()
        {
            transition.remaining = transition.remaining.saturating_sub(1);
            if transition.remaining == 0 {
                inner.state = transition.target;
                inner.transition = None;
            }
        }
        Ok(inner.state)
    }

    fn get_url(&self) -> DriverResult<String> {
        Ok(self.inner.lock().url.clone())
    }

    fn update_config_raw(&mut self, raw: &[u8]) -> DriverResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push("update_config_raw".to_string());
        if let Some(err) = inner.fail_next.pop_front() {
            return Err(err);
        }
        inner.configs.push(raw.to_vec());
        Ok(())
    }
}

impl MockHandle {
    /// Driver actions invoked so far, in order. State queries are not
    /// included, see [`MockHandle::polls`].
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.inner.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn polls(&self) -> usize {
        self.inner.lock().polls
    }

    /// Configurations accepted by `update_config_raw`.
    pub fn configs(&self) -> Vec<Vec<u8>> {
        self.inner.lock().configs.clone()
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    pub fn set_state(&self, state: State) {
        let mut inner = self.inner.lock();
        inner.state = state;
        inner.transition = None;
    }

    pub fn set_url(&self, url: &str) {
        self.inner.lock().url = url.to_string();
    }

    /// Complete transitions on the `polls`-th state query after an action.
    pub fn settle_after(&self, polls: u32) {
        self.inner.lock().settle_after = polls;
    }

    /// Leave the machine in the intermediate state forever.
    pub fn never_settle(&self) {
        self.inner.lock().never_settle = true;
    }

    /// Fail the next action or configuration update with `err`.
    pub fn fail_next(&self, err: DriverError) {
        self.inner.lock().fail_next.push_back(err);
    }

    pub fn fail_state_queries(&self, fail: bool) {
        self.inner.lock().fail_state_queries = fail;
    }
}

// ============================================================================
// SCRIPTED COMMAND RUNNER
// ============================================================================

/// One command issued through a [`ScriptedRunner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub command_line: String,
    /// Reason given for privileged commands.
    pub privilege_reason: Option<String>,
    pub default_locale: bool,
}

impl Invocation {
    pub fn is_privileged(&self) -> bool {
        self.privilege_reason.is_some()
    }
}

#[derive(Clone, Debug)]
enum Response {
    Stdout(String),
    Failure(String),
}

/// [`CommandRunner`] that records invocations and answers from a script.
///
/// Rules match when their pattern is a prefix of the command line
/// (`command arg1 arg2 ...`); the first registered match wins. Unmatched
/// commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<(String, Response)>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `pattern` with `stdout`.
    pub fn respond(mut self, pattern: &str, stdout: &str) -> Self {
        self.rules
            .push((pattern.to_string(), Response::Stdout(stdout.to_string())));
        self
    }

    /// Fail commands starting with `pattern`.
    pub fn fail(mut self, pattern: &str, message: &str) -> Self {
        self.rules
            .push((pattern.to_string(), Response::Failure(message.to_string())));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .map(|i| i.command_line.clone())
            .collect()
    }

    pub fn privileged_command_lines(&self) -> Vec<String> {
        self.invocations
            .lock()
            .iter()
            .filter(|i| i.is_privileged())
            .map(|i| i.command_line.clone())
            .collect()
    }

    fn answer(
        &self,
        command: &str,
        args: &[&str],
        privilege_reason: Option<&str>,
        default_locale: bool,
    ) -> DevhostResult<CommandOutput> {
        let command_line = std::iter::once(command)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        self.invocations.lock().push(Invocation {
            command_line: command_line.clone(),
            privilege_reason: privilege_reason.map(str::to_string),
            default_locale,
        });

        let rule = self
            .rules
            .iter()
            .find(|(pattern, _)| command_line.starts_with(pattern.as_str()));

        match rule {
            Some((_, Response::Stdout(stdout))) => Ok(CommandOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            Some((_, Response::Failure(message))) => Err(DevhostError::Command {
                command: command_line,
                message: message.clone(),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput> {
        self.answer(command, args, None, false)
    }

    fn run_with_default_locale(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput> {
        self.answer(command, args, None, true)
    }

    fn run_with_privilege(
        &self,
        reason: &str,
        command: &str,
        args: &[&str],
    ) -> DevhostResult<CommandOutput> {
        self.answer(command, args, Some(reason), false)
    }
}

// ============================================================================
// LOOPBACK TRANSPORT
// ============================================================================

/// [`DriverTransport`] answering through [`serve_call`] in the same process.
#[derive(Clone)]
pub struct LoopbackTransport {
    driver: Arc<Mutex<Box<dyn Driver>>>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl LoopbackTransport {
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self {
            driver: Arc::new(Mutex::new(Box::new(driver))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Encoded requests seen so far.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().clone()
    }
}

impl DriverTransport for LoopbackTransport {
    fn round_trip(&self, request: &[u8]) -> DevhostResult<Vec<u8>> {
        self.requests.lock().push(request.to_vec());
        let mut driver = self.driver.lock();
        serve_call(driver.as_mut(), request)
    }
}

// ============================================================================
// SANDBOXED HOST FILESYSTEM
// ============================================================================

/// Temporary directory laid out like the host paths checks touch.
pub struct Sandbox {
    pub paths: HostPaths,
    temp_dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let paths = HostPaths::rooted_at(temp_dir.path());
        Self {
            paths,
            temp_dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}
