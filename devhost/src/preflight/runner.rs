//! Executing a check list.
//!
//! Three passes exist: the start pass only detects, the setup pass
//! detects and fixes, the cleanup pass tears down. Checks run strictly in
//! list order (cleanup in reverse) since later checks rely on earlier ones.

use devhost_shared::errors::{DevhostError, DevhostResult};

use super::{Check, PreflightConfig, PreflightContext};

fn do_check(check: &Check, ctx: &PreflightContext<'_>, config: &PreflightConfig) -> DevhostResult<()> {
    let Some(detect) = check.check else {
        return Ok(());
    };

    tracing::info!("{}", check.check_description);

    if config.is_skipped(check) {
        tracing::warn!("Skipping above check...");
        return Ok(());
    }

    detect(ctx).inspect_err(|e| tracing::debug!("{}", e))
}

fn do_fix(check: &Check, ctx: &PreflightContext<'_>, failure: DevhostError) -> DevhostResult<()> {
    let Some(fix) = check.fix else {
        return Err(DevhostError::FixUnavailable {
            failure: failure.to_string(),
            hint: check.fix_description.to_string(),
        });
    };

    tracing::info!("{}", check.fix_description);
    fix(ctx)
}

/// Detect every check that applies when starting the machine.
///
/// Setup-only and cleanup-only checks are left out. The first failure
/// aborts the pass.
pub fn start_checks(
    checks: &[&Check],
    ctx: &PreflightContext<'_>,
    config: &PreflightConfig,
) -> DevhostResult<()> {
    for check in checks {
        if check.is_setup_only() || check.is_cleanup_only() {
            continue;
        }
        do_check(check, ctx, config)?;
    }
    Ok(())
}

/// Detect and fix every check that applies during setup.
///
/// With `check_only` a failing detection is returned instead of fixed.
pub fn setup_checks(
    checks: &[&Check],
    ctx: &PreflightContext<'_>,
    config: &PreflightConfig,
    check_only: bool,
) -> DevhostResult<()> {
    for check in checks {
        if check.is_cleanup_only() {
            continue;
        }

        let Err(failure) = do_check(check, ctx, config) else {
            continue;
        };
        if check_only {
            return Err(failure);
        }

        do_fix(check, ctx, failure)?;
    }
    Ok(())
}

/// Run every teardown step, last check first.
///
/// Setup-only checks are left out. A failing step does not stop the
/// remaining ones. All failures are reported together at the end.
pub fn cleanup_checks(checks: &[&Check], ctx: &PreflightContext<'_>) -> DevhostResult<()> {
    let mut failures = Vec::new();

    for check in checks.iter().rev() {
        if check.is_setup_only() {
            continue;
        }
        let Some(cleanup) = check.cleanup else {
            continue;
        };

        tracing::info!("{}", check.cleanup_description);
        if let Err(e) = cleanup(ctx) {
            tracing::warn!("{}: {}", check.cleanup_description, e);
            failures.push(e.to_string());
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(DevhostError::Preflight(failures.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::{CommandOutput, CommandRunner, OsType};
    use crate::preflight::{CheckFlags, HostPaths};
    use std::cell::RefCell;
    use std::path::Path;

    /// Records every command name; commands starting with "fail" fail.
    #[derive(Default)]
    struct Recorder {
        log: RefCell<Vec<String>>,
    }

    impl CommandRunner for Recorder {
        fn run(&self, command: &str, _args: &[&str]) -> DevhostResult<CommandOutput> {
            self.log.borrow_mut().push(command.to_string());
            if command.starts_with("fail") {
                return Err(DevhostError::Command {
                    command: command.to_string(),
                    message: "boom".to_string(),
                });
            }
            Ok(CommandOutput::default())
        }

        fn run_with_default_locale(&self, command: &str, args: &[&str]) -> DevhostResult<CommandOutput> {
            self.run(command, args)
        }

        fn run_with_privilege(
            &self,
            _reason: &str,
            command: &str,
            args: &[&str],
        ) -> DevhostResult<CommandOutput> {
            self.run(command, args)
        }
    }

    fn context(recorder: &Recorder) -> PreflightContext<'_> {
        PreflightContext::new(
            recorder,
            OsType::Fedora,
            HostPaths::rooted_at(Path::new("/nonexistent")),
        )
    }

    fn check_ok(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("check-ok", &[]).map(|_| ())
    }
    fn check_fails(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("fail-check", &[]).map(|_| ())
    }
    fn fix_ok(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("fix", &[]).map(|_| ())
    }
    fn fix_fails(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("fail-fix", &[]).map(|_| ())
    }
    fn cleanup_a(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("cleanup-a", &[]).map(|_| ())
    }
    fn cleanup_b_fails(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("fail-cleanup-b", &[]).map(|_| ())
    }
    fn cleanup_c(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("cleanup-c", &[]).map(|_| ())
    }
    fn cleanup_setup_only(ctx: &PreflightContext<'_>) -> DevhostResult<()> {
        ctx.runner.run("cleanup-setup-only", &[]).map(|_| ())
    }

    const PASSING: Check = Check {
        config_key_suffix: "check-passing",
        check_description: "Checking passing",
        check: Some(check_ok),
        ..Check::EMPTY
    };

    const FIXABLE: Check = Check {
        config_key_suffix: "check-fixable",
        check_description: "Checking fixable",
        check: Some(check_fails),
        fix_description: "Fixing fixable",
        fix: Some(fix_ok),
        ..Check::EMPTY
    };

    const UNFIXABLE: Check = Check {
        config_key_suffix: "check-unfixable",
        check_description: "Checking unfixable",
        check: Some(check_fails),
        fix_description: "Must be fixed manually",
        ..Check::EMPTY
    };

    const SETUP_ONLY_FAILING: Check = Check {
        config_key_suffix: "check-setup-only",
        check_description: "Checking setup only",
        check: Some(check_fails),
        fix_description: "Fixing setup only",
        fix: Some(fix_ok),
        flags: CheckFlags::SETUP_ONLY,
        ..Check::EMPTY
    };

    const CLEANUP_ONLY: Check = Check {
        cleanup_description: "Cleaning c",
        cleanup: Some(cleanup_c),
        flags: CheckFlags::CLEANUP_ONLY,
        ..Check::EMPTY
    };

    #[test]
    fn test_start_skips_setup_and_cleanup_only() {
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&PASSING, &SETUP_ONLY_FAILING, &CLEANUP_ONLY];
        start_checks(&checks, &ctx, &PreflightConfig::new()).unwrap();

        assert_eq!(*recorder.log.borrow(), vec!["check-ok"]);
    }

    #[test]
    fn test_start_stops_at_first_failure() {
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&FIXABLE, &PASSING];
        let result = start_checks(&checks, &ctx, &PreflightConfig::new());

        assert!(result.is_err());
        assert_eq!(*recorder.log.borrow(), vec!["fail-check"]);
    }

    #[test]
    fn test_setup_fixes_failed_checks() {
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&PASSING, &FIXABLE, &SETUP_ONLY_FAILING, &CLEANUP_ONLY];
        setup_checks(&checks, &ctx, &PreflightConfig::new(), false).unwrap();

        assert_eq!(
            *recorder.log.borrow(),
            vec!["check-ok", "fail-check", "fix", "fail-check", "fix"]
        );
    }

    #[test]
    fn test_setup_check_only_returns_failure() {
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&FIXABLE, &PASSING];
        let result = setup_checks(&checks, &ctx, &PreflightConfig::new(), true);

        assert!(matches!(result, Err(DevhostError::Command { .. })));
        assert_eq!(*recorder.log.borrow(), vec!["fail-check"]);
    }

    #[test]
    fn test_setup_without_fix_reports_hint() {
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&UNFIXABLE, &PASSING];
        let err = setup_checks(&checks, &ctx, &PreflightConfig::new(), false).unwrap_err();

        match err {
            DevhostError::FixUnavailable { hint, .. } => assert_eq!(hint, "Must be fixed manually"),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(*recorder.log.borrow(), vec!["fail-check"]);
    }

    #[test]
    fn test_fix_failure_aborts_setup() {
        const BROKEN_FIX: Check = Check {
            fix: Some(fix_fails),
            ..FIXABLE
        };
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&BROKEN_FIX, &PASSING];
        assert!(setup_checks(&checks, &ctx, &PreflightConfig::new(), false).is_err());
        assert_eq!(*recorder.log.borrow(), vec!["fail-check", "fail-fix"]);
    }

    #[test]
    fn test_skipped_check_is_not_evaluated() {
        let recorder = Recorder::default();
        let ctx = context(&recorder);
        let config = PreflightConfig::new().skip("skip-check-fixable");

        let checks = [&FIXABLE, &PASSING];
        setup_checks(&checks, &ctx, &config, true).unwrap();

        assert_eq!(*recorder.log.borrow(), vec!["check-ok"]);
    }

    #[test]
    fn test_cleanup_runs_in_reverse_and_continues() {
        const A: Check = Check {
            cleanup_description: "Cleaning a",
            cleanup: Some(cleanup_a),
            ..Check::EMPTY
        };
        const B: Check = Check {
            cleanup_description: "Cleaning b",
            cleanup: Some(cleanup_b_fails),
            ..Check::EMPTY
        };
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&A, &PASSING, &B, &CLEANUP_ONLY];
        let err = cleanup_checks(&checks, &ctx).unwrap_err();

        assert_eq!(*recorder.log.borrow(), vec!["cleanup-c", "fail-cleanup-b", "cleanup-a"]);
        assert!(err.to_string().contains("fail-cleanup-b"));
    }

    #[test]
    fn test_cleanup_skips_setup_only() {
        const SETUP_ONLY_WITH_CLEANUP: Check = Check {
            cleanup_description: "Cleaning setup only",
            cleanup: Some(cleanup_setup_only),
            flags: CheckFlags::SETUP_ONLY,
            ..Check::EMPTY
        };
        let recorder = Recorder::default();
        let ctx = context(&recorder);

        let checks = [&SETUP_ONLY_WITH_CLEANUP, &CLEANUP_ONLY];
        cleanup_checks(&checks, &ctx).unwrap();

        assert_eq!(*recorder.log.borrow(), vec!["cleanup-c"]);
    }
}
