//! Integration tests for the Linux check tables, run against a scripted
//! command runner and a sandboxed filesystem.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use devhost::network::NetworkMode;
use devhost::os::OsType;
use devhost::preflight::checks::{LIBVIRT_CHECKS, REDHAT_CHECKS, VSOCK_CHECK};
use devhost::preflight::runner::{cleanup_checks, setup_checks, start_checks};
use devhost::preflight::{Check, PreflightConfig, PreflightContext, RegistryBuilder, config_keys};
use devhost::DevhostError;
use devhost_test_utils::{Sandbox, ScriptedRunner};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn find(table: &'static [Check], suffix: &str) -> &'static Check {
    table
        .iter()
        .find(|c| c.config_key_suffix == suffix)
        .unwrap_or_else(|| panic!("no check {}", suffix))
}

fn context<'a>(runner: &'a ScriptedRunner, sandbox: &Sandbox) -> PreflightContext<'a> {
    PreflightContext::new(runner, OsType::Fedora, sandbox.paths.clone())
}

fn detect(check: &Check, ctx: &PreflightContext<'_>) -> Result<(), DevhostError> {
    (check.check.unwrap())(ctx)
}

fn fix(check: &Check, ctx: &PreflightContext<'_>) -> Result<(), DevhostError> {
    (check.fix.unwrap())(ctx)
}

fn cleanup(check: &Check, ctx: &PreflightContext<'_>) -> Result<(), DevhostError> {
    (check.cleanup.unwrap())(ctx)
}

// ============================================================================
// VSOCK
// ============================================================================

#[test]
fn vsock_fix_issues_privileged_steps_in_order() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);

    fix(&VSOCK_CHECK, &ctx).unwrap();

    let exe = sandbox.paths.executable.display().to_string();
    let device = sandbox.paths.vsock_device.display().to_string();
    assert_eq!(
        runner.privileged_command_lines(),
        vec![
            format!("setcap cap_net_bind_service=+eip {}", exe),
            "modprobe vhost_vsock".to_string(),
            format!("chown root:libvirt {}", device),
            format!("chmod g+rw {}", device),
        ]
    );
}

#[test]
fn vsock_fix_stops_at_first_failure() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new().fail("modprobe", "module not found");
    let ctx = context(&runner, &sandbox);

    let err = fix(&VSOCK_CHECK, &ctx).unwrap_err();

    assert!(matches!(err, DevhostError::Command { .. }));
    assert_eq!(runner.privileged_command_lines().len(), 2);
}

#[test]
fn vsock_check_requires_capability() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new().respond("getcap", "");
    let ctx = context(&runner, &sandbox);

    let err = detect(&VSOCK_CHECK, &ctx).unwrap_err();

    assert!(err.to_string().contains("capabilities are not correct"));
    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].default_locale);
}

#[test]
fn vsock_check_inspects_device_group_and_mode() {
    let sandbox = Sandbox::new();
    let exe = sandbox.paths.executable.display().to_string();
    let runner = ScriptedRunner::new().respond("getcap", &format!("{} cap_net_bind_service+eip\n", exe));
    let ctx = context(&runner, &sandbox);

    // Device missing
    assert!(matches!(detect(&VSOCK_CHECK, &ctx), Err(DevhostError::Io(_))));

    // Device present with mode 0600: wrong group or missing permissions
    let device = sandbox.write("dev/vsock", "");
    fs::set_permissions(&device, fs::Permissions::from_mode(0o600)).unwrap();
    assert!(matches!(detect(&VSOCK_CHECK, &ctx), Err(DevhostError::Preflight(_))));
}

// ============================================================================
// LIBVIRT
// ============================================================================

#[test]
fn virtualization_check_reads_cpu_flags() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let check = find(LIBVIRT_CHECKS, "check-virt-enabled");

    sandbox.write("proc/cpuinfo", "processor\t: 0\nflags\t\t: fpu vme de\n");
    assert!(detect(check, &ctx).is_err());

    sandbox.write("proc/cpuinfo", "processor\t: 0\nflags\t\t: fpu vme de svm\n");
    assert!(detect(check, &ctx).is_ok());
}

#[test]
fn kvm_check_requires_device() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let check = find(LIBVIRT_CHECKS, "check-kvm-enabled");

    let err = detect(check, &ctx).unwrap_err();
    assert!(err.to_string().contains("does not exist"));

    sandbox.write("dev/kvm", "");
    assert!(detect(check, &ctx).is_ok());
}

#[test]
fn kvm_fix_loads_vendor_module() {
    let sandbox = Sandbox::new();
    sandbox.write("proc/cpuinfo", "flags\t\t: fpu vmx\n");
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);

    fix(find(LIBVIRT_CHECKS, "check-kvm-enabled"), &ctx).unwrap();

    assert_eq!(
        runner.privileged_command_lines(),
        vec!["modprobe kvm", "modprobe kvm_intel"]
    );
}

#[test]
fn libvirt_install_uses_distribution_package_manager() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let check = find(LIBVIRT_CHECKS, "check-libvirt-installed");

    let ubuntu = PreflightContext::new(&runner, OsType::Ubuntu, sandbox.paths.clone());
    fix(check, &ubuntu).unwrap();
    let fedora = context(&runner, &sandbox);
    fix(check, &fedora).unwrap();

    let lines = runner.privileged_command_lines();
    assert!(lines[0].starts_with("apt-get install -y"));
    assert!(lines[1].starts_with("dnf install -y"));
}

#[test]
fn libvirt_version_must_be_recent_enough() {
    let sandbox = Sandbox::new();
    let check = find(LIBVIRT_CHECKS, "check-libvirt-version");

    let old = ScriptedRunner::new().respond("virsh -v", "3.3.0\n");
    let err = detect(check, &context(&old, &sandbox)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "libvirt v3.4.0 or newer is required and v3.3.0 is installed"
    );

    let current = ScriptedRunner::new().respond("virsh -v", "9.0.0\n");
    assert!(detect(check, &context(&current, &sandbox)).is_ok());
}

#[test]
fn user_must_be_in_libvirt_group() {
    let sandbox = Sandbox::new();
    let check = find(LIBVIRT_CHECKS, "check-user-in-libvirt-group");

    let outside = ScriptedRunner::new().respond("id -Gn", "user wheel\n");
    assert!(detect(check, &context(&outside, &sandbox)).is_err());

    let member = ScriptedRunner::new().respond("id -Gn", "user wheel libvirt\n");
    assert!(detect(check, &context(&member, &sandbox)).is_ok());
}

#[test]
fn libvirt_daemon_must_be_active() {
    let sandbox = Sandbox::new();
    let check = find(LIBVIRT_CHECKS, "check-libvirt-running");

    let inactive = ScriptedRunner::new().fail("systemctl is-active libvirtd", "inactive");
    assert!(detect(check, &context(&inactive, &sandbox)).is_err());

    let active = ScriptedRunner::new().respond("systemctl is-active libvirtd", "active\n");
    assert!(detect(check, &context(&active, &sandbox)).is_ok());
}

#[test]
fn machine_driver_fix_installs_bundled_binary() {
    let sandbox = Sandbox::new();
    sandbox.write("crc-driver-libvirt", "#!/bin/sh\n");
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let check = find(LIBVIRT_CHECKS, "check-libvirt-driver");

    assert!(detect(check, &ctx).is_err());
    fix(check, &ctx).unwrap();
    detect(check, &ctx).unwrap();

    let installed = sandbox.paths.bin_dir.join("crc-driver-libvirt");
    let mode = fs::metadata(installed).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn obsolete_driver_is_removed_with_privilege() {
    let sandbox = Sandbox::new();
    let obsolete = sandbox.write("usr/local/bin/crc-driver-libvirt", "");
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let check = find(LIBVIRT_CHECKS, "check-obsolete-libvirt-driver");

    assert!(check.is_setup_only());
    assert!(detect(check, &ctx).is_err());
    fix(check, &ctx).unwrap();

    assert_eq!(
        runner.privileged_command_lines(),
        vec![format!("rm -f {}", obsolete.display())]
    );
}

#[test]
fn network_checks_use_system_connection() {
    let sandbox = Sandbox::new();
    let check = find(LIBVIRT_CHECKS, "check-crc-network-active");

    let inactive = ScriptedRunner::new().respond(
        "virsh --connect qemu:///system net-info crc",
        "Name:           crc\nActive:         no\n",
    );
    let ctx = context(&inactive, &sandbox);
    assert!(detect(check, &ctx).is_err());
    fix(check, &ctx).unwrap();
    assert_eq!(
        inactive.command_lines()[1..],
        [
            "virsh --connect qemu:///system net-start crc",
            "virsh --connect qemu:///system net-autostart crc",
        ]
    );

    let active = ScriptedRunner::new().respond(
        "virsh --connect qemu:///system net-info crc",
        "Name:           crc\nActive:         yes\n",
    );
    assert!(detect(check, &context(&active, &sandbox)).is_ok());
}

#[test]
fn network_fix_defines_network_from_file() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);

    fix(find(LIBVIRT_CHECKS, "check-crc-network"), &ctx).unwrap();

    let lines = runner.command_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("virsh --connect qemu:///system net-define "));
    assert!(lines[0].ends_with(".xml"));
}

// ============================================================================
// RED HAT FAMILY
// ============================================================================

#[test]
fn systemd_networkd_must_not_run() {
    let sandbox = Sandbox::new();
    let check = find(REDHAT_CHECKS, "check-systemd-networkd-running");

    let running = ScriptedRunner::new().respond("systemctl is-active systemd-networkd", "active\n");
    assert!(detect(check, &context(&running, &sandbox)).is_err());

    let stopped = ScriptedRunner::new().fail("systemctl is-active systemd-networkd", "inactive");
    assert!(detect(check, &context(&stopped, &sandbox)).is_ok());
}

#[test]
fn dnsmasq_config_fix_installs_file_and_reloads() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let check = find(REDHAT_CHECKS, "check-network-manager-config");
    let target = sandbox.paths.nm_dnsmasq_config.display().to_string();

    assert!(detect(check, &ctx).is_err());
    fix(check, &ctx).unwrap();

    let lines = runner.privileged_command_lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("mkdir -p "));
    assert!(lines[1].starts_with("cp ") && lines[1].ends_with(&target));
    assert_eq!(lines[2], format!("chmod 0644 {}", target));
    assert_eq!(lines[3], "systemctl reload NetworkManager");
}

#[test]
fn dnsmasq_config_check_accepts_expected_content() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "etc/NetworkManager/dnsmasq.d/crc.conf",
        "server=/apps-crc.testing/192.168.130.11\nserver=/crc.testing/192.168.130.11\n",
    );
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);

    detect(find(REDHAT_CHECKS, "check-dnsmasq-network-manager-config"), &ctx).unwrap();
}

#[test]
fn dnsmasq_config_cleanup_only_touches_existing_file() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let check = find(REDHAT_CHECKS, "check-network-manager-config");

    cleanup(check, &ctx).unwrap();
    assert!(runner.invocations().is_empty());

    sandbox.write("etc/NetworkManager/conf.d/crc-nm-dnsmasq.conf", "[main]\ndns=dnsmasq\n");
    cleanup(check, &ctx).unwrap();
    assert_eq!(
        runner.privileged_command_lines(),
        vec![
            format!("rm -f {}", sandbox.paths.nm_dnsmasq_config.display()),
            "systemctl reload NetworkManager".to_string(),
        ]
    );
}

// ============================================================================
// REGISTRY AND RUNNER
// ============================================================================

#[test]
fn skipped_checks_are_never_evaluated() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new().fail("", "nothing may run");
    let ctx = context(&runner, &sandbox);

    let builder = RegistryBuilder::default();
    let list = builder.checks_for_distro(&OsType::Fedora, NetworkMode::VSock);
    let mut config = PreflightConfig::new();
    for key in config_keys(&builder.all_checks(&OsType::Fedora).checks) {
        config = config.skip(key);
    }

    start_checks(&list.checks, &ctx, &config).unwrap();
    setup_checks(&list.checks, &ctx, &config, false).unwrap();
    assert!(runner.invocations().is_empty());
}

#[test]
fn setup_check_only_reports_first_failure() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new();
    let ctx = context(&runner, &sandbox);
    let checks: Vec<&Check> = vec![find(LIBVIRT_CHECKS, "check-kvm-enabled")];

    let err = setup_checks(&checks, &ctx, &PreflightConfig::new(), true).unwrap_err();

    assert!(err.to_string().contains("does not exist"));
    assert!(runner.invocations().is_empty());
}

#[test]
fn setup_without_fix_reports_hint() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new().respond("virsh -v", "1.0.0\n");
    let ctx = context(&runner, &sandbox);
    let checks: Vec<&Check> = vec![find(LIBVIRT_CHECKS, "check-libvirt-version")];

    let err = setup_checks(&checks, &ctx, &PreflightConfig::new(), false).unwrap_err();

    match err {
        DevhostError::FixUnavailable { failure, hint } => {
            assert!(failure.contains("v1.0.0 is installed"));
            assert_eq!(hint, "A newer libvirt must be installed manually");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn vm_removal_undefines_even_if_destroy_fails() {
    let sandbox = Sandbox::new();
    let runner = ScriptedRunner::new()
        .respond("virsh --connect qemu:///system domstate crc", "running\n")
        .fail("virsh --connect qemu:///system destroy crc", "domain is locked");
    let ctx = context(&runner, &sandbox);
    let remove_vm = LIBVIRT_CHECKS
        .iter()
        .find(|c| c.is_cleanup_only())
        .unwrap();

    cleanup(remove_vm, &ctx).unwrap();

    assert_eq!(
        runner.command_lines(),
        vec![
            "virsh --connect qemu:///system domstate crc",
            "virsh --connect qemu:///system destroy crc",
            "virsh --connect qemu:///system undefine crc",
        ]
    );
}

#[test]
fn cleanup_runs_every_step_despite_failures() {
    let sandbox = Sandbox::new();
    sandbox.write("machines/crc/crc.qcow2", "");
    let runner = ScriptedRunner::new()
        .respond("virsh --connect qemu:///system domstate crc", "running\n")
        .fail("virsh --connect qemu:///system destroy crc", "domain is locked")
        .fail("virsh --connect qemu:///system undefine crc", "domain is busy")
        .fail("virsh --connect qemu:///system net-info crc", "network not found");
    let ctx = context(&runner, &sandbox);

    let list = RegistryBuilder::default().checks_for_distro(&OsType::Fedora, NetworkMode::Default);
    let err = cleanup_checks(&list.checks, &ctx).unwrap_err();

    assert!(matches!(err, DevhostError::Preflight(_)));
    assert!(err.to_string().contains("domain is busy"));
    assert!(!err.to_string().contains("domain is locked"));
    // Runs before the failing VM removal in the list, so after it in cleanup
    assert!(!sandbox.paths.machines_dir.exists());
    let lines = runner.command_lines();
    assert!(lines.contains(&"virsh --connect qemu:///system undefine crc".to_string()));
    assert!(lines.contains(&"virsh --connect qemu:///system net-info crc".to_string()));
}
