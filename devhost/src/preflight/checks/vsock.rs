//! Permissions needed by the vsock network mode.

use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};

use devhost_shared::errors::{DevhostError, DevhostResult};
use nix::unistd::{Gid, Group};

use crate::constants::libvirt::GROUP;
use crate::constants::vsock::{CAPABILITY_GRANTED, CAPABILITY_REQUEST, KERNEL_MODULE};
use crate::preflight::PreflightContext;

const GROUP_READ_WRITE: u32 = 0o060;

pub(super) fn check_vsock(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let executable = ctx.paths.executable.to_string_lossy();
    let output = ctx
        .runner
        .run_with_default_locale("getcap", &[&executable])?;
    if !output.stdout.contains(CAPABILITY_GRANTED) {
        return Err(DevhostError::Preflight(format!(
            "capabilities are not correct for {}",
            executable
        )));
    }

    let device = &ctx.paths.vsock_device;
    let metadata = fs::metadata(device)?;

    let group = Group::from_gid(Gid::from_raw(metadata.gid()))
        .map_err(|e| DevhostError::Internal(format!("cannot look up group {}: {}", metadata.gid(), e)))?;
    if group.map(|g| g.name).as_deref() != Some(GROUP) {
        return Err(DevhostError::Preflight(format!(
            "{} is not in the correct group",
            device.display()
        )));
    }

    if !has_group_read_write(metadata.permissions().mode()) {
        return Err(DevhostError::Preflight(format!(
            "{} doesn't have the right permissions",
            device.display()
        )));
    }
    Ok(())
}

fn has_group_read_write(mode: u32) -> bool {
    mode & GROUP_READ_WRITE == GROUP_READ_WRITE
}

/// Grant the capability, load the module and open the device to the group.
///
/// Stops at the first failing step.
pub(super) fn fix_vsock(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let executable = ctx.paths.executable.to_string_lossy();
    let device = ctx.paths.vsock_device.to_string_lossy();
    let owner = format!("root:{}", GROUP);

    ctx.runner.run_with_privilege(
        "Setting capabilities for vsock",
        "setcap",
        &[CAPABILITY_REQUEST, &executable],
    )?;
    ctx.runner.run_with_privilege(
        &format!("Loading {} kernel module", KERNEL_MODULE),
        "modprobe",
        &[KERNEL_MODULE],
    )?;
    ctx.runner.run_with_privilege(
        &format!("Changing group of {}", device),
        "chown",
        &[&owner, &device],
    )?;
    ctx.runner.run_with_privilege(
        &format!("Changing permissions of {}", device),
        "chmod",
        &["g+rw", &device],
    )?;
    Ok(())
}
