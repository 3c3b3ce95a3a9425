//! NetworkManager and dnsmasq setup on Red Hat family hosts.

use std::fs;
use std::io::Write;
use std::path::Path;

use devhost_shared::errors::{DevhostError, DevhostResult};

use crate::preflight::PreflightContext;

pub const NM_DNSMASQ_CONFIG: &str = "[main]\ndns=dnsmasq\n";

pub const NM_DNSMASQ_DOMAIN_CONFIG: &str = "server=/apps-crc.testing/192.168.130.11\n\
server=/crc.testing/192.168.130.11\n";

fn unit_is_active(ctx: &PreflightContext<'_>, unit: &str) -> bool {
    ctx.runner
        .run_with_default_locale("systemctl", &["is-active", unit])
        .map(|out| out.stdout.trim() == "active")
        .unwrap_or(false)
}

pub(super) fn check_systemd_networkd_not_running(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    if unit_is_active(ctx, "systemd-networkd") {
        return Err(DevhostError::Preflight(
            "systemd-networkd is running".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn check_network_manager_installed(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    ctx.runner
        .run("NetworkManager", &["--version"])
        .map_err(|e| DevhostError::Preflight(format!("NetworkManager is not installed: {}", e)))?;
    Ok(())
}

pub(super) fn check_network_manager_running(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    if !unit_is_active(ctx, "NetworkManager") {
        return Err(DevhostError::Preflight(
            "NetworkManager is not running".to_string(),
        ));
    }
    Ok(())
}

fn check_file_content(path: &Path, expected: &str) -> DevhostResult<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DevhostError::Preflight(format!(
                "{} does not exist",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    if content != expected {
        return Err(DevhostError::Preflight(format!(
            "{} has unexpected content",
            path.display()
        )));
    }
    Ok(())
}

fn reload_network_manager(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    ctx.runner.run_with_privilege(
        "Reloading NetworkManager",
        "systemctl",
        &["reload", "NetworkManager"],
    )?;
    Ok(())
}

/// Stage `content` in a temporary file and install it as root at `path`.
fn write_privileged(ctx: &PreflightContext<'_>, path: &Path, content: &str) -> DevhostResult<()> {
    let mut staged = tempfile::NamedTempFile::new()?;
    staged.write_all(content.as_bytes())?;
    staged.flush()?;

    let source = staged.path().to_string_lossy().into_owned();
    let target = path.to_string_lossy().into_owned();
    let reason = format!("Writing {}", target);

    if let Some(parent) = path.parent() {
        let parent = parent.to_string_lossy();
        ctx.runner
            .run_with_privilege(&reason, "mkdir", &["-p", &parent])?;
    }
    ctx.runner
        .run_with_privilege(&reason, "cp", &[&source, &target])?;
    ctx.runner
        .run_with_privilege(&reason, "chmod", &["0644", &target])?;
    Ok(())
}

fn remove_privileged(ctx: &PreflightContext<'_>, path: &Path) -> DevhostResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let target = path.to_string_lossy();
    ctx.runner
        .run_with_privilege(&format!("Removing {}", target), "rm", &["-f", &target])?;
    reload_network_manager(ctx)
}

pub(super) fn check_nm_dnsmasq_config(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    check_file_content(&ctx.paths.nm_dnsmasq_config, NM_DNSMASQ_CONFIG)
}

pub(super) fn fix_nm_dnsmasq_config(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    write_privileged(ctx, &ctx.paths.nm_dnsmasq_config, NM_DNSMASQ_CONFIG)?;
    reload_network_manager(ctx)
}

pub(super) fn remove_nm_dnsmasq_config(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    remove_privileged(ctx, &ctx.paths.nm_dnsmasq_config)
}

pub(super) fn check_nm_dnsmasq_domain_config(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    check_file_content(&ctx.paths.nm_dnsmasq_domain_config, NM_DNSMASQ_DOMAIN_CONFIG)
}

pub(super) fn fix_nm_dnsmasq_domain_config(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    write_privileged(ctx, &ctx.paths.nm_dnsmasq_domain_config, NM_DNSMASQ_DOMAIN_CONFIG)?;
    reload_network_manager(ctx)
}

pub(super) fn remove_nm_dnsmasq_domain_config(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    remove_privileged(ctx, &ctx.paths.nm_dnsmasq_domain_config)
}
