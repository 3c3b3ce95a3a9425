//! Driver proxied over a serialization boundary.
//!
//! [`RemoteDriver`] turns every [`Driver`] call into a [`DriverCall`]
//! document, hands it to a [`DriverTransport`] and maps the
//! [`DriverReply`] back. Plugins answer with [`serve_call`].

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use devhost_shared::constants::driver::SERVE_ARG;
use devhost_shared::errors::{DevhostError, DevhostResult, DriverError, DriverResult};
use devhost_shared::protocol::{self, DriverCall, DriverReply, ErrorKind};
use devhost_shared::state::State;

use super::Driver;

/// Moves one encoded request to a plugin and returns the encoded reply.
pub trait DriverTransport: Send {
    fn round_trip(&self, request: &[u8]) -> DevhostResult<Vec<u8>>;
}

/// Transport that runs the plugin executable once per call.
///
/// The request is written to the plugin's stdin and the reply read from
/// its stdout.
#[derive(Clone, Debug)]
pub struct PluginTransport {
    executable: PathBuf,
}

impl PluginTransport {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl DriverTransport for PluginTransport {
    fn round_trip(&self, request: &[u8]) -> DevhostResult<Vec<u8>> {
        let command = format!("{} {}", self.executable.display(), SERVE_ARG);
        let mut child = Command::new(&self.executable)
            .arg(SERVE_ARG)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DevhostError::Command {
                command: command.clone(),
                message: e.to_string(),
            })?;

        // Dropping stdin closes the pipe so the plugin sees end of input
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(request),
            None => Ok(()),
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(DevhostError::Command {
                command,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        Ok(output.stdout)
    }
}

/// [`Driver`] whose backend lives on the other side of a transport.
pub struct RemoteDriver<T> {
    name: String,
    transport: T,
}

impl<T: DriverTransport> RemoteDriver<T> {
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    fn call(&self, call: DriverCall) -> DriverResult<DriverReply> {
        let rpc = |e: DevhostError| DriverError::Rpc(e.to_string());

        let request = protocol::encode(&call).map_err(rpc)?;
        let response = self.transport.round_trip(&request).map_err(rpc)?;
        let reply: DriverReply = protocol::decode(&response).map_err(rpc)?;

        tracing::trace!(driver = %self.name, call = call.name(), "Driver call returned");

        match reply {
            DriverReply::Error { kind, message } => Err(kind.into_error(message)),
            other => Ok(other),
        }
    }

    fn call_done(&self, call: DriverCall) -> DriverResult<()> {
        let name = call.name();
        match self.call(call)? {
            DriverReply::Done => Ok(()),
            other => Err(unexpected_reply(name, &other)),
        }
    }
}

fn unexpected_reply(call: &str, reply: &DriverReply) -> DriverError {
    DriverError::Rpc(format!("unexpected reply to {}: {:?}", call, reply))
}

impl<T: DriverTransport> Driver for RemoteDriver<T> {
    fn driver_name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> DriverResult<()> {
        self.call_done(DriverCall::Start)
    }

    fn stop(&mut self) -> DriverResult<()> {
        self.call_done(DriverCall::Stop)
    }

    fn kill(&mut self) -> DriverResult<()> {
        self.call_done(DriverCall::Kill)
    }

    fn restart(&mut self) -> DriverResult<()> {
        self.call_done(DriverCall::Restart)
    }

    fn get_state(&self) -> DriverResult<State> {
        match self.call(DriverCall::GetState)? {
            DriverReply::State { state } => Ok(state),
            other => Err(unexpected_reply("get_state", &other)),
        }
    }

    fn get_url(&self) -> DriverResult<String> {
        match self.call(DriverCall::GetUrl)? {
            DriverReply::Url { url } => Ok(url),
            other => Err(unexpected_reply("get_url", &other)),
        }
    }

    fn update_config_raw(&mut self, raw: &[u8]) -> DriverResult<()> {
        self.call_done(DriverCall::update_config_raw(raw))
    }
}

/// Answer one encoded [`DriverCall`] with `driver`.
///
/// Driver failures become error replies. Only a reply that cannot be
/// encoded is an `Err`.
pub fn serve_call(driver: &mut dyn Driver, request: &[u8]) -> DevhostResult<Vec<u8>> {
    let reply = match protocol::decode::<DriverCall>(request) {
        Ok(call) => dispatch(driver, call),
        Err(e) => DriverReply::Error {
            kind: ErrorKind::Rpc,
            message: format!("malformed driver call: {}", e),
        },
    };
    protocol::encode(&reply)
}

/// Serve a single call read from stdin, writing the reply to stdout.
///
/// Entry point for plugin executables invoked by [`PluginTransport`].
pub fn serve_stdio(driver: &mut dyn Driver) -> DevhostResult<()> {
    let mut request = Vec::new();
    std::io::stdin().read_to_end(&mut request)?;
    let reply = serve_call(driver, &request)?;
    let mut stdout = std::io::stdout();
    stdout.write_all(&reply)?;
    stdout.flush()?;
    Ok(())
}

fn dispatch(driver: &mut dyn Driver, call: DriverCall) -> DriverReply {
    let result = match call {
        DriverCall::Start => driver.start().map(|_| DriverReply::Done),
        DriverCall::Stop => driver.stop().map(|_| DriverReply::Done),
        DriverCall::Kill => driver.kill().map(|_| DriverReply::Done),
        DriverCall::Restart => driver.restart().map(|_| DriverReply::Done),
        DriverCall::GetState => driver.get_state().map(|state| DriverReply::State { state }),
        DriverCall::GetUrl => driver.get_url().map(|url| DriverReply::Url { url }),
        DriverCall::UpdateConfigRaw { config } => match protocol::decode_config(&config) {
            Ok(raw) => driver.update_config_raw(&raw).map(|_| DriverReply::Done),
            Err(e) => Err(DriverError::Rpc(e.to_string())),
        },
    };
    result.unwrap_or_else(DriverReply::from)
}
