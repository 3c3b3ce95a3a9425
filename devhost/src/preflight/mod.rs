//! Host preflight checks.
//!
//! A [`Check`] describes one precondition of the host: how to detect it,
//! optionally how to fix it and how to undo the fix. Checks live in
//! immutable tables ([`CheckTables`]); the [`RegistryBuilder`] picks the
//! tables that apply to a distribution and network mode, and the
//! [`runner`] executes the result in order.

pub mod checks;
pub mod config;
pub mod registry;
pub mod runner;

use std::ops::BitOr;
use std::path::{Path, PathBuf};

use devhost_shared::errors::DevhostResult;

use crate::constants::{host_paths, libvirt, vsock};
use crate::options::DevhostOptions;
use crate::os::{CommandRunner, OsType};

pub use config::PreflightConfig;
pub use registry::{CheckList, CheckTables, RegistryBuilder, config_keys, detect_distro};

/// Detection, remediation or teardown step of a check.
pub type CheckFn = fn(&PreflightContext<'_>) -> DevhostResult<()>;

/// When during a run a check applies.
///
/// No flag means the check applies to both setup and cleanup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CheckFlags(u8);

impl CheckFlags {
    pub const NONE: CheckFlags = CheckFlags(0);
    /// Only run while setting the host up, never during cleanup or start.
    pub const SETUP_ONLY: CheckFlags = CheckFlags(1);
    /// Only run while cleaning the host up.
    pub const CLEANUP_ONLY: CheckFlags = CheckFlags(1 << 1);

    pub const fn contains(self, other: CheckFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CheckFlags {
    type Output = CheckFlags;

    fn bitor(self, rhs: CheckFlags) -> CheckFlags {
        CheckFlags(self.0 | rhs.0)
    }
}

/// One host precondition.
#[derive(Clone, Copy, Debug)]
pub struct Check {
    /// Suffix of the `skip-<suffix>` configuration key. Empty for checks
    /// that cannot be skipped.
    pub config_key_suffix: &'static str,
    pub check_description: &'static str,
    pub check: Option<CheckFn>,
    pub fix_description: &'static str,
    pub fix: Option<CheckFn>,
    pub cleanup_description: &'static str,
    pub cleanup: Option<CheckFn>,
    pub flags: CheckFlags,
}

impl Check {
    /// Base value for table entries.
    pub const EMPTY: Check = Check {
        config_key_suffix: "",
        check_description: "",
        check: None,
        fix_description: "",
        fix: None,
        cleanup_description: "",
        cleanup: None,
        flags: CheckFlags::NONE,
    };

    /// Configuration key that disables this check, if it has one.
    pub fn config_key(&self) -> Option<String> {
        if self.config_key_suffix.is_empty() {
            None
        } else {
            Some(format!("skip-{}", self.config_key_suffix))
        }
    }

    pub fn is_setup_only(&self) -> bool {
        self.flags.contains(CheckFlags::SETUP_ONLY)
    }

    pub fn is_cleanup_only(&self) -> bool {
        self.flags.contains(CheckFlags::CLEANUP_ONLY)
    }
}

/// Filesystem locations checks inspect or modify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPaths {
    /// The running executable.
    pub executable: PathBuf,
    pub bin_dir: PathBuf,
    pub machines_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub kvm_device: PathBuf,
    pub vsock_device: PathBuf,
    pub cpuinfo: PathBuf,
    pub obsolete_driver_dir: PathBuf,
    pub nm_dnsmasq_config: PathBuf,
    pub nm_dnsmasq_domain_config: PathBuf,
}

impl HostPaths {
    /// System locations, with runtime directories taken from `options`.
    pub fn new(options: &DevhostOptions) -> DevhostResult<Self> {
        Ok(Self {
            executable: std::env::current_exe()?,
            bin_dir: options.bin_dir(),
            machines_dir: options.machines_dir(),
            logs_dir: options.logs_dir(),
            kvm_device: PathBuf::from(host_paths::KVM_DEVICE),
            vsock_device: PathBuf::from(vsock::DEVICE),
            cpuinfo: PathBuf::from(host_paths::CPUINFO),
            obsolete_driver_dir: PathBuf::from(libvirt::OBSOLETE_DRIVER_DIR),
            nm_dnsmasq_config: PathBuf::from(host_paths::NM_DNSMASQ_CONFIG),
            nm_dnsmasq_domain_config: PathBuf::from(host_paths::NM_DNSMASQ_DOMAIN_CONFIG),
        })
    }

    /// Every location relocated under `root`, for sandboxed runs.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            executable: root.join("devhost"),
            bin_dir: root.join("bin"),
            machines_dir: root.join("machines"),
            logs_dir: root.join("logs"),
            kvm_device: root.join("dev/kvm"),
            vsock_device: root.join("dev/vsock"),
            cpuinfo: root.join("proc/cpuinfo"),
            obsolete_driver_dir: root.join("usr/local/bin"),
            nm_dnsmasq_config: root.join("etc/NetworkManager/conf.d/crc-nm-dnsmasq.conf"),
            nm_dnsmasq_domain_config: root.join("etc/NetworkManager/dnsmasq.d/crc.conf"),
        }
    }
}

/// Everything a check function may touch.
pub struct PreflightContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub distro: OsType,
    pub paths: HostPaths,
    /// Memory the host needs, in MiB.
    pub min_memory_mib: u64,
}

impl<'a> PreflightContext<'a> {
    pub fn new(runner: &'a dyn CommandRunner, distro: OsType, paths: HostPaths) -> Self {
        Self {
            runner,
            distro,
            paths,
            min_memory_mib: crate::constants::vm_defaults::DEFAULT_MEMORY_MIB,
        }
    }

    pub fn with_min_memory_mib(mut self, min_memory_mib: u64) -> Self {
        self.min_memory_mib = min_memory_mib;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_contains() {
        let both = CheckFlags::SETUP_ONLY | CheckFlags::CLEANUP_ONLY;
        assert!(both.contains(CheckFlags::SETUP_ONLY));
        assert!(both.contains(CheckFlags::CLEANUP_ONLY));
        assert!(!CheckFlags::NONE.contains(CheckFlags::SETUP_ONLY));
        assert!(CheckFlags::SETUP_ONLY.contains(CheckFlags::NONE));
    }

    #[test]
    fn test_config_key() {
        let check = Check {
            config_key_suffix: "check-vsock",
            ..Check::EMPTY
        };
        assert_eq!(check.config_key().as_deref(), Some("skip-check-vsock"));
        assert_eq!(Check::EMPTY.config_key(), None);
    }

    #[test]
    fn test_host_paths_follow_options() {
        let options = DevhostOptions::with_home_dir("/srv/devhost");
        let paths = HostPaths::new(&options).unwrap();

        assert_eq!(paths.bin_dir, PathBuf::from("/srv/devhost/bin"));
        assert_eq!(paths.machines_dir, PathBuf::from("/srv/devhost/machines"));
        assert_eq!(paths.vsock_device, PathBuf::from("/dev/vsock"));
        assert_eq!(paths.obsolete_driver_dir, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_cleanup_only_is_not_setup_only() {
        let check = Check {
            flags: CheckFlags::CLEANUP_ONLY,
            ..Check::EMPTY
        };
        assert!(check.is_cleanup_only());
        assert!(!check.is_setup_only());
    }
}
