//! Options a host record carries for its driver and the engine inside.
//!
//! The lifecycle code never looks into these values. They are persisted
//! with the host and handed to whoever provisions the machine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::vm_defaults;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostOptions {
    pub driver: String,
    /// Memory in MiB
    pub memory: u64,
    /// Disk size in GB
    pub disk: u64,
    #[serde(default)]
    pub engine_options: EngineOptions,
    #[serde(default)]
    pub swarm_options: SwarmOptions,
    #[serde(default)]
    pub auth_options: AuthOptions,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            driver: "libvirt".to_string(),
            memory: vm_defaults::DEFAULT_MEMORY_MIB,
            disk: vm_defaults::DEFAULT_DISK_SIZE_GB,
            engine_options: EngineOptions::default(),
            swarm_options: SwarmOptions::default(),
            auth_options: AuthOptions::default(),
        }
    }
}

/// Container engine settings inside the machine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EngineOptions {
    #[serde(default)]
    pub arbitrary_flags: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub insecure_registry: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub registry_mirror: Vec<String>,
    pub log_level: Option<String>,
    pub storage_driver: Option<String>,
    #[serde(default)]
    pub tls_verify: bool,
}

/// Cluster membership of the machine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SwarmOptions {
    #[serde(default)]
    pub is_swarm: bool,
    #[serde(default)]
    pub master: bool,
    pub address: Option<String>,
    pub discovery: Option<String>,
    pub host: Option<String>,
    #[serde(default)]
    pub arbitrary_flags: HashMap<String, String>,
}

/// Certificates used to talk to the machine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthOptions {
    pub cert_dir: Option<PathBuf>,
    pub ca_cert_path: Option<PathBuf>,
    pub ca_private_key_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    pub server_cert_path: Option<PathBuf>,
    pub server_key_path: Option<PathBuf>,
    #[serde(default)]
    pub server_cert_sans: Vec<String>,
}
