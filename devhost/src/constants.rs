//! Constants for the devhost runtime
//!
//! Centralized location for hardcoded names, paths and defaults.

pub use devhost_shared::constants::{driver, host};

pub mod envs {
    pub const DEVHOST_HOME: &str = "DEVHOST_HOME";
}

pub mod dirs {
    /// Directory under the user's home holding all runtime state
    pub const DEVHOST_DIR: &str = ".devhost";
    pub const MACHINES_DIR: &str = "machines";
    pub const BIN_DIR: &str = "bin";
    pub const LOGS_DIR: &str = "logs";
}

/// Polling budget used while waiting for a driver to reach a state.
pub mod wait {
    use std::time::Duration;

    pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
    pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(3);
}

pub mod libvirt {
    /// Machine driver plugin installed into the bin dir
    pub const DRIVER_BINARY: &str = "crc-driver-libvirt";
    /// Location of system-wide plugins installed by older releases
    pub const OBSOLETE_DRIVER_DIR: &str = "/usr/local/bin";
    pub const GROUP: &str = "libvirt";
    pub const SYSTEM_URI: &str = "qemu:///system";
    pub const NETWORK_NAME: &str = "crc";
    pub const DOMAIN_NAME: &str = "crc";
    pub const DAEMON_UNIT: &str = "libvirtd";
    /// Oldest libvirt release the driver works with
    pub const MIN_VERSION: (u64, u64, u64) = (3, 4, 0);
}

pub mod vsock {
    pub const DEVICE: &str = "/dev/vsock";
    pub const KERNEL_MODULE: &str = "vhost_vsock";
    /// Capability as printed by `getcap`
    pub const CAPABILITY_GRANTED: &str = "cap_net_bind_service+eip";
    /// Capability as accepted by `setcap`
    pub const CAPABILITY_REQUEST: &str = "cap_net_bind_service=+eip";
}

pub mod host_paths {
    pub const KVM_DEVICE: &str = "/dev/kvm";
    pub const CPUINFO: &str = "/proc/cpuinfo";
    pub const OS_RELEASE: &str = "/etc/os-release";
    pub const OS_RELEASE_FALLBACK: &str = "/usr/lib/os-release";
    pub const NM_DNSMASQ_CONFIG: &str = "/etc/NetworkManager/conf.d/crc-nm-dnsmasq.conf";
    pub const NM_DNSMASQ_DOMAIN_CONFIG: &str = "/etc/NetworkManager/dnsmasq.d/crc.conf";
}

/// Virtual machine resource defaults
pub mod vm_defaults {
    /// Memory in MiB the VM is given by default
    pub const DEFAULT_MEMORY_MIB: u64 = 9216;
    pub const DEFAULT_DISK_SIZE_GB: u64 = 31;
}
