//! KVM and libvirt checks.
//!
//! Order matters: every check assumes the ones before it passed, e.g. the
//! version check runs `virsh` that the install check made available.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use devhost_shared::errors::{DevhostError, DevhostResult};

use crate::constants::libvirt::{
    DAEMON_UNIT, DOMAIN_NAME, DRIVER_BINARY, GROUP, MIN_VERSION, NETWORK_NAME, SYSTEM_URI,
};
use crate::os::OsType;
use crate::preflight::PreflightContext;

/// Definition of the libvirt network the machine is attached to.
pub const NETWORK_XML: &str = r#"<network>
  <name>crc</name>
  <forward mode='nat'>
    <nat>
      <port start='1024' end='65535'/>
    </nat>
  </forward>
  <bridge name='crc' stp='on' delay='0'/>
  <mac address='52:54:00:fd:be:d0'/>
  <ip family='ipv4' address='192.168.130.1' prefix='24'>
    <dhcp>
      <host mac='52:fd:fc:07:21:82' ip='192.168.130.11'/>
    </dhcp>
  </ip>
</network>
"#;

fn preflight_err(message: impl Into<String>) -> DevhostError {
    DevhostError::Preflight(message.into())
}

fn virsh(ctx: &PreflightContext<'_>, args: &[&str]) -> DevhostResult<String> {
    let mut full = vec!["--connect", SYSTEM_URI];
    full.extend_from_slice(args);
    Ok(ctx.runner.run_with_default_locale("virsh", &full)?.stdout)
}

/// CPU vendor extension advertised in `/proc/cpuinfo`, if any.
fn virtualization_flag(cpuinfo: &str) -> Option<&'static str> {
    for line in cpuinfo.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() != "flags" {
            continue;
        }
        for flag in value.split_whitespace() {
            match flag {
                "vmx" => return Some("vmx"),
                "svm" => return Some("svm"),
                _ => {}
            }
        }
    }
    None
}

pub(super) fn check_virtualization_enabled(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let cpuinfo = fs::read_to_string(&ctx.paths.cpuinfo)?;
    if virtualization_flag(&cpuinfo).is_none() {
        return Err(preflight_err(
            "Virtualization is not available for your CPU\n\n\
             Suggestions:\n\
             - Enable VT-x (Intel) or AMD-V (AMD) in your BIOS/UEFI settings",
        ));
    }
    Ok(())
}

pub(super) fn check_kvm_enabled(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let kvm = &ctx.paths.kvm_device;
    if kvm.exists() {
        return Ok(());
    }

    let mut message = format!(
        "{} does not exist\n\n\
         Suggestions:\n\
         - Ensure your kernel is compiled with KVM support\n\
         - Check if kvm module is loaded: lsmod | grep kvm",
        kvm.display()
    );

    if Path::new("/proc/sys/fs/binfmt_misc/WSLInterop").exists() {
        message.push_str(
            "\n\nWSL2 detected:\n\
             - Enable nested virtualization: add 'nestedVirtualization=true' to .wslconfig\n\
             - Restart WSL: wsl --shutdown",
        );
    }

    Err(preflight_err(message))
}

pub(super) fn fix_kvm_enabled(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    ctx.runner
        .run_with_privilege("modprobe kvm", "modprobe", &["kvm"])?;

    let cpuinfo = fs::read_to_string(&ctx.paths.cpuinfo)?;
    let vendor_module = match virtualization_flag(&cpuinfo) {
        Some("vmx") => "kvm_intel",
        Some(_) => "kvm_amd",
        None => return Err(preflight_err("cannot load KVM: no virtualization support")),
    };
    ctx.runner.run_with_privilege(
        &format!("modprobe {}", vendor_module),
        "modprobe",
        &[vendor_module],
    )?;
    Ok(())
}

pub(super) fn check_libvirt_installed(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    ctx.runner
        .run("virsh", &["--version"])
        .map_err(|e| preflight_err(format!("libvirt v{} or newer is required: {}", version_string(MIN_VERSION), e)))?;
    Ok(())
}

fn libvirt_packages(distro: &OsType) -> (&'static str, &'static [&'static str]) {
    match distro {
        OsType::Ubuntu => (
            "apt-get",
            &["install", "-y", "libvirt-daemon-system", "libvirt-clients", "qemu-kvm"],
        ),
        _ => (
            "dnf",
            &["install", "-y", "libvirt", "libvirt-daemon-kvm", "qemu-kvm"],
        ),
    }
}

pub(super) fn fix_libvirt_installed(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let (manager, args) = libvirt_packages(&ctx.distro);
    ctx.runner
        .run_with_privilege("Installing virtualization packages", manager, args)?;
    Ok(())
}

pub(super) fn check_user_in_libvirt_group(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let groups = ctx.runner.run("id", &["-Gn"])?.stdout;
    if !groups.split_whitespace().any(|g| g == GROUP) {
        return Err(preflight_err(format!("user is not a member of the {} group", GROUP)));
    }
    Ok(())
}

fn current_user_name() -> DevhostResult<String> {
    let uid = nix::unistd::getuid();
    match nix::unistd::User::from_uid(uid) {
        Ok(Some(user)) => Ok(user.name),
        Ok(None) => Err(DevhostError::Internal(format!("no user entry for uid {}", uid))),
        Err(e) => Err(DevhostError::Internal(format!("cannot look up uid {}: {}", uid, e))),
    }
}

pub(super) fn fix_user_in_libvirt_group(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let user = current_user_name()?;
    ctx.runner.run_with_privilege(
        &format!("Adding {} to the {} group", user, GROUP),
        "usermod",
        &["-a", "-G", GROUP, &user],
    )?;
    Ok(())
}

pub(super) fn check_libvirt_running(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    // is-active exits non-zero for inactive units
    let active = ctx
        .runner
        .run_with_default_locale("systemctl", &["is-active", DAEMON_UNIT])
        .map(|out| out.stdout.trim() == "active")
        .unwrap_or(false);
    if !active {
        return Err(preflight_err(format!("{} service is not running", DAEMON_UNIT)));
    }
    Ok(())
}

pub(super) fn fix_libvirt_running(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    ctx.runner.run_with_privilege(
        &format!("Starting {}", DAEMON_UNIT),
        "systemctl",
        &["start", DAEMON_UNIT],
    )?;
    Ok(())
}

/// Parse `virsh -v` output such as `9.0.0`.
pub fn parse_libvirt_version(output: &str) -> Option<(u64, u64, u64)> {
    let mut parts = output.trim().split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    Some((major, minor, patch))
}

fn version_string((major, minor, patch): (u64, u64, u64)) -> String {
    format!("{}.{}.{}", major, minor, patch)
}

pub(super) fn check_libvirt_version(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let output = ctx.runner.run_with_default_locale("virsh", &["-v"])?.stdout;
    let version = parse_libvirt_version(&output)
        .ok_or_else(|| preflight_err(format!("cannot parse libvirt version '{}'", output.trim())))?;

    if version < MIN_VERSION {
        return Err(preflight_err(format!(
            "libvirt v{} or newer is required and v{} is installed",
            version_string(MIN_VERSION),
            version_string(version)
        )));
    }
    Ok(())
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

pub(super) fn check_machine_driver_installed(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let driver = ctx.paths.bin_dir.join(DRIVER_BINARY);
    if !is_executable(&driver) {
        return Err(preflight_err(format!("{} is not installed", driver.display())));
    }
    Ok(())
}

/// Install the driver plugin shipped next to the running executable.
pub(super) fn fix_machine_driver_installed(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let bundled = ctx
        .paths
        .executable
        .parent()
        .map(|dir| dir.join(DRIVER_BINARY))
        .filter(|p| p.exists())
        .ok_or_else(|| {
            preflight_err(format!(
                "{} not found next to {}",
                DRIVER_BINARY,
                ctx.paths.executable.display()
            ))
        })?;

    fs::create_dir_all(&ctx.paths.bin_dir)?;
    let target = ctx.paths.bin_dir.join(DRIVER_BINARY);
    fs::copy(&bundled, &target)?;
    fs::set_permissions(&target, fs::Permissions::from_mode(0o755))?;

    tracing::debug!(driver = %target.display(), "Installed machine driver");
    Ok(())
}

pub(super) fn check_obsolete_driver_absent(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let obsolete = ctx.paths.obsolete_driver_dir.join(DRIVER_BINARY);
    if obsolete.exists() {
        return Err(preflight_err(format!("{} is obsolete", obsolete.display())));
    }
    Ok(())
}

pub(super) fn fix_obsolete_driver_absent(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let obsolete = ctx.paths.obsolete_driver_dir.join(DRIVER_BINARY);
    let obsolete = obsolete.to_string_lossy();
    ctx.runner.run_with_privilege(
        &format!("rm {}", obsolete),
        "rm",
        &["-f", &obsolete],
    )?;
    Ok(())
}

pub(super) fn check_network_available(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    virsh(ctx, &["net-info", NETWORK_NAME])
        .map_err(|_| preflight_err(format!("libvirt network {} is not available", NETWORK_NAME)))?;
    Ok(())
}

pub(super) fn fix_network_available(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let mut definition = tempfile::Builder::new()
        .prefix("devhost-network-")
        .suffix(".xml")
        .tempfile()?;
    definition.write_all(NETWORK_XML.as_bytes())?;
    definition.flush()?;

    let path = definition.path().to_string_lossy().into_owned();
    virsh(ctx, &["net-define", &path])?;
    Ok(())
}

pub(super) fn remove_network(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    if virsh(ctx, &["net-info", NETWORK_NAME]).is_err() {
        return Ok(());
    }

    // Fails when the network is defined but not running
    if let Err(e) = virsh(ctx, &["net-destroy", NETWORK_NAME]) {
        tracing::debug!("{}", e);
    }
    virsh(ctx, &["net-undefine", NETWORK_NAME])?;
    Ok(())
}

fn network_is_active(net_info: &str) -> bool {
    net_info.lines().any(|line| {
        line.split_once(':')
            .is_some_and(|(key, value)| key.trim() == "Active" && value.trim() == "yes")
    })
}

pub(super) fn check_network_active(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let info = virsh(ctx, &["net-info", NETWORK_NAME])?;
    if !network_is_active(&info) {
        return Err(preflight_err(format!("libvirt network {} is not active", NETWORK_NAME)));
    }
    Ok(())
}

pub(super) fn fix_network_active(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    virsh(ctx, &["net-start", NETWORK_NAME])?;
    virsh(ctx, &["net-autostart", NETWORK_NAME])?;
    Ok(())
}

pub(super) fn remove_vm(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let state = match virsh(ctx, &["domstate", DOMAIN_NAME]) {
        Ok(state) => state,
        Err(_) => return Ok(()),
    };

    if state.trim() != "shut off"
        && let Err(e) = virsh(ctx, &["destroy", DOMAIN_NAME])
    {
        tracing::debug!("{}", e);
    }
    virsh(ctx, &["undefine", DOMAIN_NAME])?;
    Ok(())
}
