//! Platform independent checks.

use std::fs;
use std::path::Path;

use devhost_shared::errors::{DevhostError, DevhostResult};
use sysinfo::System;

use crate::preflight::PreflightContext;

const LOG_FILE_PREFIX: &str = "devhost.log";

pub(super) fn check_ram(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let mut sys = System::new();
    sys.refresh_memory();
    let total_mib = sys.total_memory() / 1024 / 1024;

    validate_enough_memory(total_mib, ctx.min_memory_mib)
}

fn validate_enough_memory(total_mib: u64, required_mib: u64) -> DevhostResult<()> {
    if total_mib < required_mib {
        return Err(DevhostError::Preflight(format!(
            "only {} MiB of memory found ({} MiB required)",
            total_mib, required_mib
        )));
    }
    Ok(())
}

pub(super) fn check_not_root(_ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    ensure_not_root(nix::unistd::geteuid().as_raw())
}

fn ensure_not_root(euid: u32) -> DevhostResult<()> {
    if euid == 0 {
        return Err(DevhostError::Preflight(
            "running as root is not supported".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn remove_machines_dir(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    remove_dir_if_exists(&ctx.paths.machines_dir)
}

fn remove_dir_if_exists(dir: &Path) -> DevhostResult<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete rotated log files, keeping the newest one.
pub(super) fn remove_old_logs(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let entries = match fs::read_dir(&ctx.paths.logs_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut rotated = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Daily rotation appends the date: devhost.log.2024-05-01
        if name.starts_with(LOG_FILE_PREFIX) && entry.file_type()?.is_file() {
            rotated.push(entry.path());
        }
    }

    // Dates sort lexically
    rotated.sort();
    rotated.pop();

    for path in rotated {
        tracing::debug!(path = %path.display(), "Removing old log file");
        fs::remove_file(&path)?;
    }
    Ok(())
}
