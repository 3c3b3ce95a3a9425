//! Lifecycle management and host preflight checks for a local development VM.
//!
//! [`Host`] drives a virtualization backend through the [`Driver`] trait and
//! waits for every state transition to be observable. The [`preflight`]
//! module verifies, fixes and tears down what the host machine needs before
//! a VM can run.

pub mod constants;
pub mod drivers;
pub mod host;
pub mod network;
pub mod options;
pub mod os;
pub mod preflight;
pub mod util;

pub use devhost_shared::errors::{DevhostError, DevhostResult, DriverError, DriverResult};
pub use devhost_shared::state::State;
pub use drivers::{Driver, DriverTransport, PluginTransport, RemoteDriver};
pub use host::{Host, HostOptions, Metadata, validate_host_name};
pub use network::NetworkMode;
pub use options::DevhostOptions;
pub use util::wait::WaitOptions;
