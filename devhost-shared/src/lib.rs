//! devhost Core - Shared code for the host runtime and driver plugins
//!
//! This crate contains the types that cross the driver boundary: the
//! machine state enumeration, the error taxonomy and the wire protocol
//! spoken between `devhost` and out-of-process driver plugins.

pub mod constants;
pub mod errors;
pub mod protocol;
pub mod state;

pub use errors::{DevhostError, DevhostResult, DriverError, DriverResult};
pub use protocol::{DriverCall, DriverReply, ErrorKind};
pub use state::State;
