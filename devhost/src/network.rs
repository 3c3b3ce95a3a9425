//! Network transport between the host and the machine.

use devhost_shared::errors::DevhostError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the host talks to the machine's network.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Bridged libvirt network with NetworkManager/dnsmasq on the host.
    #[default]
    Default,
    /// User-mode networking tunnelled over virtio-vsock.
    #[serde(rename = "vsock")]
    VSock,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Default => "default",
            NetworkMode::VSock => "vsock",
        }
    }
}

impl FromStr for NetworkMode {
    type Err = DevhostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(NetworkMode::Default),
            "vsock" => Ok(NetworkMode::VSock),
            _ => Err(DevhostError::InvalidArgument(format!(
                "Unknown network mode: '{}'. Supported: default, vsock",
                s
            ))),
        }
    }
}

impl std::fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
