//! Assembling the ordered list of checks that apply to this host.

use crate::network::NetworkMode;
use crate::os::{OsType, get_os_release};

use super::Check;
use super::checks::{
    GENERIC_CHECKS, LIBVIRT_CHECKS, NON_WINDOWS_CHECKS, REDHAT_CHECKS, VSOCK_CHECK,
};

/// The immutable check tables the builder draws from.
#[derive(Clone, Copy, Debug)]
pub struct CheckTables {
    /// Platform independent conditions.
    pub generic: &'static [Check],
    /// Conditions only meaningful on POSIX hosts.
    pub non_windows: &'static [Check],
    pub libvirt: &'static [Check],
    /// Required when the machine network runs over vsock.
    pub vsock: &'static Check,
    /// NetworkManager/dnsmasq setup of the Red Hat family.
    pub redhat: &'static [Check],
}

impl CheckTables {
    pub fn linux() -> Self {
        Self {
            generic: GENERIC_CHECKS,
            non_windows: NON_WINDOWS_CHECKS,
            libvirt: LIBVIRT_CHECKS,
            vsock: &VSOCK_CHECK,
            redhat: REDHAT_CHECKS,
        }
    }
}

impl Default for CheckTables {
    fn default() -> Self {
        Self::linux()
    }
}

/// Ordered checks for one host, plus what the builder had to warn about.
#[derive(Clone, Debug, Default)]
pub struct CheckList {
    pub checks: Vec<&'static Check>,
    pub warnings: Vec<String>,
}

impl CheckList {
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    fn extend(&mut self, table: &'static [Check]) {
        self.checks.extend(table.iter());
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Decides which checks apply to a distribution and network mode.
///
/// The builder only picks checks. Whether a check runs during setup or
/// cleanup is decided by the runner from the check's flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryBuilder {
    tables: CheckTables,
}

impl RegistryBuilder {
    pub fn new(tables: CheckTables) -> Self {
        Self { tables }
    }

    fn common_checks(&self) -> CheckList {
        let mut list = CheckList::default();
        list.extend(self.tables.generic);
        list.extend(self.tables.non_windows);
        list.extend(self.tables.libvirt);
        list
    }

    /// Checks for `distro` in `mode`.
    ///
    /// Distributions without dedicated handling are treated like the Red
    /// Hat family.
    pub fn checks_for_distro(&self, distro: &OsType, mode: NetworkMode) -> CheckList {
        let mut list = self.common_checks();

        if mode == NetworkMode::VSock {
            list.checks.push(self.tables.vsock);
        }

        match distro {
            OsType::Ubuntu => {}
            d if d.is_redhat_family() => {
                if mode == NetworkMode::Default {
                    list.extend(self.tables.redhat);
                }
            }
            _ => {
                list.warn(format!(
                    "distribution-specific preflight checks are not implemented for {}",
                    distro
                ));
                if mode == NetworkMode::Default {
                    list.extend(self.tables.redhat);
                }
            }
        }

        list
    }

    /// Every check that may apply to `distro`, regardless of network mode.
    ///
    /// Used to enumerate configuration keys.
    pub fn all_checks(&self, distro: &OsType) -> CheckList {
        let mut list = self.checks_for_distro(distro, NetworkMode::Default);
        list.checks.push(self.tables.vsock);
        list
    }
}

/// Distribution of the running host.
///
/// An unreadable `os-release` yields `Other("unknown")`.
pub fn detect_distro() -> OsType {
    match get_os_release() {
        Ok(release) => release.id,
        Err(e) => {
            tracing::warn!("cannot get distribution name: {}", e);
            OsType::Other("unknown".to_string())
        }
    }
}

/// `skip-*` configuration keys of `checks`, in order.
pub fn config_keys(checks: &[&Check]) -> Vec<String> {
    checks.iter().filter_map(|c| c.config_key()).collect()
}
