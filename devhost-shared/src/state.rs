//! Machine lifecycle state as reported by a driver.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the virtual machine behind a driver.
///
/// The runtime never owns this value. It only reads it from the driver
/// and compares it against the state an operation is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Driver could not tell.
    None,
    Running,
    Paused,
    Saved,
    Stopped,
    Stopping,
    Starting,
    Error,
    Timeout,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::None => "none",
            State::Running => "running",
            State::Paused => "paused",
            State::Saved => "saved",
            State::Stopped => "stopped",
            State::Stopping => "stopping",
            State::Starting => "starting",
            State::Error => "error",
            State::Timeout => "timeout",
        }
    }
}

impl std::str::FromStr for State {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(State::None),
            "running" => Ok(State::Running),
            "paused" => Ok(State::Paused),
            "saved" => Ok(State::Saved),
            "stopped" => Ok(State::Stopped),
            "stopping" => Ok(State::Stopping),
            "starting" => Ok(State::Starting),
            "error" => Ok(State::Error),
            "timeout" => Ok(State::Timeout),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
