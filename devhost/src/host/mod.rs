//! Host lifecycle management
//!
//! A [`Host`] pairs one driver with the metadata of the machine it runs and
//! turns the driver's asynchronous start/stop/kill/restart into verified
//! transitions: every action is followed by a wait until the driver reports
//! the target state.

pub mod options;

use std::path::PathBuf;
use std::sync::LazyLock;

use devhost_shared::constants::driver::NOT_IMPLEMENTED;
use devhost_shared::constants::host::CONFIG_VERSION;
use devhost_shared::errors::{DevhostError, DevhostResult, DriverError, DriverResult};
use devhost_shared::state::State;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::drivers::{Driver, machine_in_state};
use crate::util::wait::{WaitOptions, wait_for_with};
pub use options::{AuthOptions, EngineOptions, HostOptions, SwarmOptions};

static VALID_HOST_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-.]*$").expect("host name pattern is valid")
});

/// Whether `name` can be used as a host name.
pub fn validate_host_name(name: &str) -> bool {
    VALID_HOST_NAME.is_match(name)
}

/// Persisted summary of a host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    pub config_version: i32,
    pub driver_name: String,
    pub host_options: HostOptions,
}

/// A managed machine and the driver that runs it.
///
/// Serializes to the host record without the driver handle and without the
/// last applied raw driver configuration.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Host {
    pub config_version: i32,
    #[serde(skip)]
    driver: Box<dyn Driver>,
    pub driver_name: String,
    pub driver_path: PathBuf,
    pub host_options: HostOptions,
    name: String,
    #[serde(skip)]
    raw_driver: Vec<u8>,
    #[serde(skip)]
    wait: WaitOptions,
}

impl Host {
    /// Create a host around `driver`.
    ///
    /// `raw_driver` is the serialized configuration the driver was built
    /// from.
    pub fn new(
        name: impl Into<String>,
        driver: Box<dyn Driver>,
        driver_path: impl Into<PathBuf>,
        host_options: HostOptions,
        raw_driver: Vec<u8>,
    ) -> DevhostResult<Self> {
        let name = name.into();
        if !validate_host_name(&name) {
            return Err(DevhostError::InvalidArgument(format!(
                "invalid host name \"{}\": must match [a-zA-Z0-9][a-zA-Z0-9.-]*",
                name
            )));
        }

        Ok(Self {
            config_version: CONFIG_VERSION,
            driver_name: driver.driver_name().to_string(),
            driver,
            driver_path: driver_path.into(),
            host_options,
            name,
            raw_driver,
            wait: WaitOptions::default(),
        })
    }

    /// Override the polling budget used by lifecycle operations.
    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last driver configuration the driver accepted.
    pub fn raw_driver(&self) -> &[u8] {
        &self.raw_driver
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            config_version: self.config_version,
            driver_name: self.driver_name.clone(),
            host_options: self.host_options.clone(),
        }
    }

    fn in_state(&self, desired: State) -> bool {
        machine_in_state(self.driver.as_ref(), desired)
    }

    fn wait_for_state(&self, desired: State) -> DevhostResult<()> {
        wait_for_with(&self.wait, || self.in_state(desired))
    }

    /// Run `action` unless the machine already is in `desired`, then wait
    /// for `desired`.
    fn run_action_for_state<F>(&mut self, action: F, desired: State) -> DevhostResult<()>
    where
        F: FnOnce(&mut dyn Driver) -> DriverResult<()>,
    {
        if self.in_state(desired) {
            return Err(DevhostError::AlreadyInState {
                name: self.name.clone(),
                state: desired,
            });
        }

        action(self.driver.as_mut())?;

        self.wait_for_state(desired)
    }

    pub fn start(&mut self) -> DevhostResult<()> {
        tracing::info!("Starting {:?}...", self.name);
        self.run_action_for_state(|d| d.start(), State::Running)?;
        tracing::info!("Machine {:?} was started.", self.name);
        Ok(())
    }

    pub fn stop(&mut self) -> DevhostResult<()> {
        tracing::info!("Stopping {:?}...", self.name);
        self.run_action_for_state(|d| d.stop(), State::Stopped)?;
        tracing::info!("Machine {:?} was stopped.", self.name);
        Ok(())
    }

    pub fn kill(&mut self) -> DevhostResult<()> {
        tracing::info!("Killing {:?}...", self.name);
        self.run_action_for_state(|d| d.kill(), State::Stopped)?;
        tracing::info!("Machine {:?} was killed.", self.name);
        Ok(())
    }

    /// Restart the machine.
    ///
    /// A stopped machine is started. A running machine is restarted by the
    /// driver. In any other state nothing happens and `Ok(())` is returned.
    pub fn restart(&mut self) -> DevhostResult<()> {
        tracing::info!("Restarting {:?}...", self.name);

        if self.in_state(State::Stopped) {
            return self.start();
        }

        if self.in_state(State::Running) {
            self.driver.restart()?;
            return self.wait_for_state(State::Running);
        }

        tracing::debug!(host = %self.name, "Machine neither running nor stopped, not restarting");
        Ok(())
    }

    /// Hand a new raw configuration to the driver.
    ///
    /// The stored raw configuration only changes once the driver accepted
    /// the new one.
    pub fn update_config(&mut self, raw_config: Vec<u8>) -> DevhostResult<()> {
        match self.driver.update_config_raw(&raw_config) {
            Ok(()) => {
                self.raw_driver = raw_config;
                Ok(())
            }
            Err(DriverError::Unsupported(_)) => Err(DevhostError::NotImplemented),
            Err(DriverError::Rpc(message)) if message == NOT_IMPLEMENTED => {
                Err(DevhostError::NotImplemented)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn url(&self) -> DevhostResult<String> {
        Ok(self.driver.get_url()?)
    }

    pub fn state(&self) -> DevhostResult<State> {
        Ok(self.driver.get_state()?)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("driver_name", &self.driver_name)
            .field("driver_path", &self.driver_path)
            .field("config_version", &self.config_version)
            .finish_non_exhaustive()
    }
}
