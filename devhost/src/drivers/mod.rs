//! Driver abstraction for virtualization backends.
//!
//! A [`Driver`] is everything the host lifecycle needs from a backend.
//! Backends either implement the trait in-process or live in a plugin
//! executable reached through [`remote::RemoteDriver`].

pub mod remote;

pub use devhost_shared::errors::{DriverError, DriverResult};
pub use devhost_shared::state::State;
pub use remote::{DriverTransport, PluginTransport, RemoteDriver, serve_call};

/// Capabilities a virtualization backend must expose.
///
/// Start, stop, kill and restart may return before the machine actually
/// reached the new state. Callers observe the outcome through `get_state`,
/// which must be cheap and free of side effects.
pub trait Driver: Send {
    /// Backend identifier, e.g. `libvirt`.
    fn driver_name(&self) -> &str;

    fn start(&mut self) -> DriverResult<()>;

    fn stop(&mut self) -> DriverResult<()>;

    /// Hard termination path for machines that do not answer `stop`.
    fn kill(&mut self) -> DriverResult<()>;

    fn restart(&mut self) -> DriverResult<()>;

    fn get_state(&self) -> DriverResult<State>;

    /// Connection URL of the running machine.
    fn get_url(&self) -> DriverResult<String>;

    /// Apply a new serialized driver configuration.
    fn update_config_raw(&mut self, raw: &[u8]) -> DriverResult<()>;
}

/// Whether `driver` currently reports `desired`.
///
/// A failing state query counts as "not in state".
pub fn machine_in_state(driver: &dyn Driver, desired: State) -> bool {
    match driver.get_state() {
        Ok(current) => current == desired,
        Err(e) => {
            tracing::debug!(driver = driver.driver_name(), error = %e, "Cannot query machine state");
            false
        }
    }
}
