//! Check tables for Linux hosts.

mod generic;
mod libvirt;
mod redhat;
mod vsock;

use super::{Check, CheckFlags};

pub static GENERIC_CHECKS: &[Check] = &[
    Check {
        config_key_suffix: "check-ram",
        check_description: "Checking minimum RAM requirements",
        check: Some(generic::check_ram),
        fix_description: "The host does not have enough memory to run the VM",
        ..Check::EMPTY
    },
    Check {
        cleanup_description: "Removing machine instance directory",
        cleanup: Some(generic::remove_machines_dir),
        flags: CheckFlags::CLEANUP_ONLY,
        ..Check::EMPTY
    },
    Check {
        cleanup_description: "Removing older logs",
        cleanup: Some(generic::remove_old_logs),
        flags: CheckFlags::CLEANUP_ONLY,
        ..Check::EMPTY
    },
];

pub static NON_WINDOWS_CHECKS: &[Check] = &[Check {
    config_key_suffix: "check-root-user",
    check_description: "Checking if running as non-root",
    check: Some(generic::check_not_root),
    fix_description: "Must be run as a normal user",
    ..Check::EMPTY
}];

pub static LIBVIRT_CHECKS: &[Check] = &[
    Check {
        config_key_suffix: "check-virt-enabled",
        check_description: "Checking if Virtualization is enabled",
        check: Some(libvirt::check_virtualization_enabled),
        fix_description: "Enable VT-x (Intel) or AMD-V (AMD) in your BIOS/UEFI settings",
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-kvm-enabled",
        check_description: "Checking if KVM is enabled",
        check: Some(libvirt::check_kvm_enabled),
        fix_description: "Setting up KVM",
        fix: Some(libvirt::fix_kvm_enabled),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-libvirt-installed",
        check_description: "Checking if libvirt is installed",
        check: Some(libvirt::check_libvirt_installed),
        fix_description: "Installing libvirt service and dependencies",
        fix: Some(libvirt::fix_libvirt_installed),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-user-in-libvirt-group",
        check_description: "Checking if user is part of libvirt group",
        check: Some(libvirt::check_user_in_libvirt_group),
        fix_description: "Adding user to libvirt group",
        fix: Some(libvirt::fix_user_in_libvirt_group),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-libvirt-running",
        check_description: "Checking if libvirt daemon is running",
        check: Some(libvirt::check_libvirt_running),
        fix_description: "Starting libvirt service",
        fix: Some(libvirt::fix_libvirt_running),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-libvirt-version",
        check_description: "Checking if a supported libvirt version is installed",
        check: Some(libvirt::check_libvirt_version),
        fix_description: "A newer libvirt must be installed manually",
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-libvirt-driver",
        check_description: "Checking if crc-driver-libvirt is installed",
        check: Some(libvirt::check_machine_driver_installed),
        fix_description: "Installing crc-driver-libvirt",
        fix: Some(libvirt::fix_machine_driver_installed),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-obsolete-libvirt-driver",
        check_description: "Checking for obsolete crc-driver-libvirt",
        check: Some(libvirt::check_obsolete_driver_absent),
        fix_description: "Removing older system-wide crc-driver-libvirt",
        fix: Some(libvirt::fix_obsolete_driver_absent),
        flags: CheckFlags::SETUP_ONLY,
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-crc-network",
        check_description: "Checking if libvirt 'crc' network is available",
        check: Some(libvirt::check_network_available),
        fix_description: "Setting up libvirt 'crc' network",
        fix: Some(libvirt::fix_network_available),
        cleanup_description: "Removing 'crc' network from libvirt",
        cleanup: Some(libvirt::remove_network),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-crc-network-active",
        check_description: "Checking if libvirt 'crc' network is active",
        check: Some(libvirt::check_network_active),
        fix_description: "Starting libvirt 'crc' network",
        fix: Some(libvirt::fix_network_active),
        ..Check::EMPTY
    },
    Check {
        cleanup_description: "Removing the crc VM if exists",
        cleanup: Some(libvirt::remove_vm),
        flags: CheckFlags::CLEANUP_ONLY,
        ..Check::EMPTY
    },
];

pub static VSOCK_CHECK: Check = Check {
    config_key_suffix: "check-vsock",
    check_description: "Checking if vsock is correctly configured",
    check: Some(vsock::check_vsock),
    fix_description: "Setting up vsock support",
    fix: Some(vsock::fix_vsock),
    ..Check::EMPTY
};

pub static REDHAT_CHECKS: &[Check] = &[
    Check {
        config_key_suffix: "check-systemd-networkd-running",
        check_description: "Checking if systemd-networkd is running",
        check: Some(redhat::check_systemd_networkd_not_running),
        fix_description: "Network configuration with systemd-networkd is not supported",
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-network-manager-installed",
        check_description: "Checking if NetworkManager is installed",
        check: Some(redhat::check_network_manager_installed),
        fix_description: "NetworkManager is required and must be installed manually",
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-network-manager-running",
        check_description: "Checking if NetworkManager service is running",
        check: Some(redhat::check_network_manager_running),
        fix_description: "NetworkManager is required. Please make sure it is installed and running manually",
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-network-manager-config",
        check_description: "Checking if NetworkManager uses dnsmasq",
        check: Some(redhat::check_nm_dnsmasq_config),
        fix_description: "Writing NetworkManager config for dnsmasq",
        fix: Some(redhat::fix_nm_dnsmasq_config),
        cleanup_description: "Removing NetworkManager config for dnsmasq",
        cleanup: Some(redhat::remove_nm_dnsmasq_config),
        ..Check::EMPTY
    },
    Check {
        config_key_suffix: "check-dnsmasq-network-manager-config",
        check_description: "Checking if dnsmasq resolves the crc domains",
        check: Some(redhat::check_nm_dnsmasq_domain_config),
        fix_description: "Writing dnsmasq config for the crc domains",
        fix: Some(redhat::fix_nm_dnsmasq_domain_config),
        cleanup_description: "Removing dnsmasq config for the crc domains",
        cleanup: Some(redhat::remove_nm_dnsmasq_domain_config),
        ..Check::EMPTY
    },
];
