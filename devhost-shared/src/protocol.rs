//! Wire protocol between `devhost` and out-of-process driver plugins.
//!
//! One call is one JSON document in each direction. Raw driver
//! configuration travels base64 encoded so the document stays text.

use crate::errors::{DevhostError, DevhostResult, DriverError};
use crate::state::State;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Request sent to a driver plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DriverCall {
    Start,
    Stop,
    Kill,
    Restart,
    GetState,
    GetUrl,
    UpdateConfigRaw { config: String },
}

impl DriverCall {
    pub fn update_config_raw(raw: &[u8]) -> Self {
        DriverCall::UpdateConfigRaw {
            config: STANDARD.encode(raw),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DriverCall::Start => "start",
            DriverCall::Stop => "stop",
            DriverCall::Kill => "kill",
            DriverCall::Restart => "restart",
            DriverCall::GetState => "get_state",
            DriverCall::GetUrl => "get_url",
            DriverCall::UpdateConfigRaw { .. } => "update_config_raw",
        }
    }
}

/// Error classification carried by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CapabilityUnsupported,
    Rpc,
    Backend,
}

/// Reply sent back by a driver plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum DriverReply {
    Done,
    State { state: State },
    Url { url: String },
    Error { kind: ErrorKind, message: String },
}

impl From<DriverError> for DriverReply {
    fn from(err: DriverError) -> Self {
        let (kind, message) = match err {
            DriverError::Unsupported(m) => (ErrorKind::CapabilityUnsupported, m),
            DriverError::Rpc(m) => (ErrorKind::Rpc, m),
            DriverError::Backend(m) => (ErrorKind::Backend, m),
        };
        DriverReply::Error { kind, message }
    }
}

impl ErrorKind {
    pub fn into_error(self, message: String) -> DriverError {
        match self {
            ErrorKind::CapabilityUnsupported => DriverError::Unsupported(message),
            ErrorKind::Rpc => DriverError::Rpc(message),
            ErrorKind::Backend => DriverError::Backend(message),
        }
    }
}

/// Decode the base64 configuration of an `UpdateConfigRaw` call.
pub fn decode_config(config: &str) -> DevhostResult<Vec<u8>> {
    STANDARD
        .decode(config)
        .map_err(|e| DevhostError::InvalidArgument(format!("bad config encoding: {}", e)))
}

pub fn encode<T: Serialize>(message: &T) -> DevhostResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> DevhostResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
