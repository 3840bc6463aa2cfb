use super::*;
use tempfile::tempdir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_success_captures_combined_output() {
    let dir = tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "ok.sh",
        "echo to-stdout\necho to-stderr 1>&2\nexit 0\n",
    );

    let outcome = ShellExecutor::default()
        .execute(ScriptInvocation {
            phase: Phase::Install,
            script: &script,
            migration_dir: dir.path(),
            env: &[],
        })
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.output.contains("to-stdout"));
    assert!(outcome.output.contains("to-stderr"));
    assert_eq!(outcome.log_path, dir.path().join("install_output.log"));
    assert_eq!(fs::read_to_string(&outcome.log_path).unwrap(), outcome.output);
}

#[tokio::test]
async fn test_non_zero_exit_is_not_an_error() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "fail.sh", "echo broken\nexit 3\n");

    let outcome = ShellExecutor::default()
        .execute(ScriptInvocation {
            phase: Phase::Run,
            script: &script,
            migration_dir: dir.path(),
            env: &[],
        })
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, Some(3));
    assert_eq!(outcome.output.trim(), "broken");
    assert!(dir.path().join("run_output.log").exists());
}

#[tokio::test]
async fn test_stdin_is_closed() {
    let dir = tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "stdin.sh",
        "if read line; then echo got-input; else echo no-input; fi\n",
    );

    let outcome = ShellExecutor::default()
        .execute(ScriptInvocation {
            phase: Phase::Ready,
            script: &script,
            migration_dir: dir.path(),
            env: &[],
        })
        .await
        .unwrap();

    assert_eq!(outcome.output.trim(), "no-input");
}

#[tokio::test]
async fn test_env_is_passed() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "env.sh", "echo \"phase=$STRATA_PHASE\"\n");
    let env = vec![("STRATA_PHASE".to_string(), "install".to_string())];

    let outcome = ShellExecutor::default()
        .execute(ScriptInvocation {
            phase: Phase::Install,
            script: &script,
            migration_dir: dir.path(),
            env: &env,
        })
        .await
        .unwrap();

    assert_eq!(outcome.output.trim(), "phase=install");
}

#[tokio::test]
async fn test_missing_interpreter_is_a_phase_failure() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "ok.sh", "exit 0\n");

    let outcome = ShellExecutor::new(Some("/nonexistent/interpreter".to_string()))
        .execute(ScriptInvocation {
            phase: Phase::Install,
            script: &script,
            migration_dir: dir.path(),
            env: &[],
        })
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, None);
    assert!(outcome.output.contains("failed to start"));
    assert!(fs::read_to_string(&outcome.log_path)
        .unwrap()
        .contains("failed to start"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_direct_execution_uses_shebang() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "direct.sh", "#!/bin/sh\necho direct\n");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let outcome = ShellExecutor::new(None)
        .execute(ScriptInvocation {
            phase: Phase::Run,
            script: &script,
            migration_dir: dir.path(),
            env: &[],
        })
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.output.trim(), "direct");
}

#[tokio::test]
async fn test_unwritable_log_dir_is_an_error() {
    let dir = tempdir().unwrap();
    let script = write_script(dir.path(), "ok.sh", "exit 0\n");

    let result = ShellExecutor::default()
        .execute(ScriptInvocation {
            phase: Phase::Install,
            script: &script,
            migration_dir: &dir.path().join("missing"),
            env: &[],
        })
        .await;

    assert!(matches!(result, Err(MigrationError::Io { .. })));
}

#[test]
fn test_describe_exit() {
    assert_eq!(describe_exit(Some(1)), "exit code 1");
    assert_eq!(describe_exit(None), "no exit code");
}
