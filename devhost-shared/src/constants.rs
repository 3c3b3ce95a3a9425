//! Shared constants between the host runtime and driver plugins
//!
//! These constants must be identical on both sides of the driver boundary.

/// Driver boundary constants
pub mod driver {
    /// Error text legacy plugins return for calls they do not support.
    ///
    /// Newer plugins reply with `ErrorKind::CapabilityUnsupported` instead.
    pub const NOT_IMPLEMENTED: &str = "Not Implemented";

    /// Argument passed to a plugin executable to serve a single call.
    pub const SERVE_ARG: &str = "serve-call";
}

/// Host record constants
pub mod host {
    /// Schema version written into new host records.
    pub const CONFIG_VERSION: i32 = 3;
}
