// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runner::fake::FakeRunner;
use botfleet_core::Credential;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    registry: Arc<Registry>,
    runner: Arc<FakeRunner>,
    logs: Arc<LogCollector>,
    supervisor: Supervisor,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    // Short bounds keep escalation tests fast.
    let config = RuntimeConfig::new(dir.path())
        .grace_period(Duration::from_millis(150))
        .kill_wait(Duration::from_millis(150));
    let registry = Arc::new(Registry::open(config.registry_path()).unwrap());
    let runner = Arc::new(FakeRunner::new());
    let logs = Arc::new(LogCollector::new(config.logs_dir()));
    let supervisor = Supervisor::new(
        Arc::clone(&registry),
        Arc::clone(&runner) as Arc<dyn CommandRunner>,
        Arc::clone(&logs),
        &config,
    );
    Fixture {
        dir,
        registry,
        runner,
        logs,
        supervisor,
    }
}

/// Seed a deployed (stopped) workload with a real work tree on disk.
fn seed(fx: &Fixture, name: &str) -> WorkloadRecord {
    let work_dir = fx.dir.path().join("deployed").join(name);
    std::fs::create_dir_all(&work_dir).unwrap();
    std::fs::write(work_dir.join("main.py"), "# bot\n").unwrap();
    let record = WorkloadRecord::new(
        name,
        "https://github.com/acme/sample-echo",
        Credential::new("tok-123"),
        None,
        work_dir,
    );
    fx.registry.insert(record.clone()).unwrap();
    record
}

#[tokio::test]
async fn start_transitions_to_running_with_pid() {
    let fx = fixture();
    seed(&fx, "echo");

    let record = fx.supervisor.start("echo").await.unwrap();

    assert_eq!(record.status, WorkloadStatus::Running);
    assert!(record.pid.is_some());
    assert!(record.last_started_at.is_some());
    // Persisted, not just in-memory
    assert_eq!(fx.registry.get("echo").unwrap().pid, record.pid);
}

#[tokio::test]
async fn start_injects_credential_env_and_work_dir_cwd() {
    let fx = fixture();
    let seeded = seed(&fx, "echo");

    fx.supervisor.start("echo").await.unwrap();

    let call = fx.supervisor_spawn_call();
    assert_eq!(call.cwd, seeded.work_dir);
    assert_eq!(call.argv, vec!["python3".to_string(), "main.py".to_string()]);
    assert!(call
        .env
        .iter()
        .any(|(k, v)| k == "BOT_TOKEN" && v == "tok-123"));
}

#[tokio::test]
async fn start_hands_the_daily_log_file_to_the_spawn() {
    let fx = fixture();
    seed(&fx, "echo");

    fx.supervisor.start("echo").await.unwrap();

    let call = fx.supervisor_spawn_call();
    assert_eq!(call.log_file, fx.logs.current_log_path("echo"));
}

impl Fixture {
    fn supervisor_spawn_call(&self) -> crate::runner::fake::SpawnCall {
        self.runner.spawn_calls().into_iter().next_back().unwrap()
    }
}

#[tokio::test]
async fn start_while_running_is_a_no_op() {
    let fx = fixture();
    seed(&fx, "echo");

    let first = fx.supervisor.start("echo").await.unwrap();
    let second = fx.supervisor.start("echo").await.unwrap();

    assert_eq!(first.pid, second.pid);
    assert_eq!(fx.runner.spawn_calls().len(), 1);
}

#[tokio::test]
async fn start_unknown_workload_is_not_found() {
    let fx = fixture();
    let err = fx.supervisor.start("ghost").await.unwrap_err();
    assert!(matches!(err, FleetError::NotFound { name } if name == "ghost"));
}

#[tokio::test]
async fn spawn_failure_persists_errored() {
    let fx = fixture();
    seed(&fx, "echo");
    fx.runner.fail_spawn();

    let err = fx.supervisor.start("echo").await.unwrap_err();

    assert!(matches!(err, FleetError::SpawnFailed { .. }));
    let record = fx.registry.get("echo").unwrap();
    assert_eq!(record.status, WorkloadStatus::Errored);
    assert!(record.pid.is_none());
    assert!(record.last_error.is_some());
}

#[tokio::test]
async fn start_with_missing_entry_point_errors() {
    let fx = fixture();
    let seeded = seed(&fx, "echo");
    std::fs::remove_file(seeded.work_dir.join("main.py")).unwrap();

    let err = fx.supervisor.start("echo").await.unwrap_err();

    assert!(matches!(err, FleetError::SpawnFailed { .. }));
    assert_eq!(
        fx.registry.get("echo").unwrap().status,
        WorkloadStatus::Errored
    );
}

#[tokio::test]
async fn stop_sends_sigterm_and_converges() {
    let fx = fixture();
    seed(&fx, "echo");
    let started = fx.supervisor.start("echo").await.unwrap();
    let pid = started.pid.unwrap();

    let record = fx.supervisor.stop("echo").await.unwrap();

    assert_eq!(record.status, WorkloadStatus::Stopped);
    assert!(record.pid.is_none());
    assert_eq!(fx.runner.signals(), vec![(pid, StopSignal::Graceful)]);
}

#[tokio::test]
async fn stop_escalates_to_sigkill_after_grace() {
    let fx = fixture();
    seed(&fx, "echo");
    fx.runner.ignore_sigterm();
    let started = fx.supervisor.start("echo").await.unwrap();
    let pid = started.pid.unwrap();

    let record = fx.supervisor.stop("echo").await.unwrap();

    assert_eq!(record.status, WorkloadStatus::Stopped);
    assert_eq!(
        fx.runner.signals(),
        vec![(pid, StopSignal::Graceful), (pid, StopSignal::Forceful)]
    );
}

#[tokio::test]
async fn stop_reports_timeout_when_sigkill_does_not_converge() {
    let fx = fixture();
    seed(&fx, "echo");
    fx.runner.immortal();
    fx.supervisor.start("echo").await.unwrap();

    let err = fx.supervisor.stop("echo").await.unwrap_err();

    assert!(matches!(err, FleetError::Timeout { ref operation, .. } if operation == "stop"));
    // Still recorded as running: the process genuinely did not die.
    assert_eq!(
        fx.registry.get("echo").unwrap().status,
        WorkloadStatus::Running
    );
}

#[tokio::test]
async fn stop_is_idempotent() {
    let fx = fixture();
    seed(&fx, "echo");
    fx.supervisor.start("echo").await.unwrap();
    fx.supervisor.stop("echo").await.unwrap();

    let record = fx.supervisor.stop("echo").await.unwrap();

    assert_eq!(record.status, WorkloadStatus::Stopped);
    // Only the first stop signalled anything.
    assert_eq!(fx.runner.signals().len(), 1);
}

#[tokio::test]
async fn stop_converges_after_out_of_band_exit() {
    let fx = fixture();
    seed(&fx, "echo");
    let started = fx.supervisor.start("echo").await.unwrap();
    fx.runner.kill_out_of_band(started.pid.unwrap());

    let record = fx.supervisor.stop("echo").await.unwrap();

    assert_eq!(record.status, WorkloadStatus::Stopped);
    assert!(fx.runner.signals().is_empty());
}

#[tokio::test]
async fn restart_yields_a_fresh_pid() {
    let fx = fixture();
    seed(&fx, "echo");
    let first = fx.supervisor.start("echo").await.unwrap();

    let second = fx.supervisor.restart("echo").await.unwrap();

    assert_eq!(second.status, WorkloadStatus::Running);
    assert_ne!(first.pid, second.pid);
}

#[tokio::test]
async fn restart_reports_restart_failed_when_stop_cannot_converge() {
    let fx = fixture();
    seed(&fx, "echo");
    fx.runner.immortal();
    fx.supervisor.start("echo").await.unwrap();

    let err = fx.supervisor.restart("echo").await.unwrap_err();

    assert!(matches!(err, FleetError::RestartFailed { .. }));
    // No second spawn happened.
    assert_eq!(fx.runner.spawn_calls().len(), 1);
}

#[tokio::test]
async fn stop_appends_a_notice_to_the_workload_log() {
    let fx = fixture();
    seed(&fx, "echo");
    fx.supervisor.start("echo").await.unwrap();

    fx.supervisor.stop("echo").await.unwrap();

    let tailed = fx.logs.tail("echo", 5);
    assert!(tailed
        .iter()
        .any(|l| l.contains("[supervisor] process stopped")));
}

#[tokio::test]
async fn crash_detection_appends_an_exit_notice_to_the_workload_log() {
    let fx = fixture();
    seed(&fx, "echo");
    let started = fx.supervisor.start("echo").await.unwrap();
    fx.runner.kill_out_of_band(started.pid.unwrap());

    fx.supervisor.status("echo").unwrap();

    let tailed = fx.logs.tail("echo", 5);
    assert!(tailed
        .iter()
        .any(|l| l.contains("[supervisor] process exited unexpectedly")));
}

#[tokio::test]
async fn status_detects_out_of_band_crash() {
    let fx = fixture();
    seed(&fx, "echo");
    let started = fx.supervisor.start("echo").await.unwrap();
    fx.runner.kill_out_of_band(started.pid.unwrap());

    let record = fx.supervisor.status("echo").unwrap();

    assert_eq!(record.status, WorkloadStatus::Errored);
    assert_eq!(
        record.last_error.as_deref(),
        Some("process exited unexpectedly")
    );
    assert!(record.pid.is_none());
    // The correction is persisted as a side effect.
    assert_eq!(
        fx.registry.get("echo").unwrap().status,
        WorkloadStatus::Errored
    );
}

#[tokio::test]
async fn start_recovers_an_errored_workload() {
    let fx = fixture();
    seed(&fx, "echo");
    let started = fx.supervisor.start("echo").await.unwrap();
    fx.runner.kill_out_of_band(started.pid.unwrap());
    fx.supervisor.status("echo").unwrap();

    let record = fx.supervisor.start("echo").await.unwrap();

    assert_eq!(record.status, WorkloadStatus::Running);
    assert!(record.last_error.is_none());
}

#[tokio::test]
async fn status_of_stopped_workload_is_untouched() {
    let fx = fixture();
    seed(&fx, "echo");

    let record = fx.supervisor.status("echo").unwrap();

    assert_eq!(record.status, WorkloadStatus::Stopped);
}

#[tokio::test]
async fn remove_stops_deletes_tree_then_registry_entry() {
    let fx = fixture();
    let seeded = seed(&fx, "echo");
    fx.supervisor.start("echo").await.unwrap();

    fx.supervisor.remove("echo").await.unwrap();

    assert!(!seeded.work_dir.exists());
    assert!(!fx.registry.contains("echo"));
    assert_eq!(fx.runner.signals().len(), 1);
}

#[tokio::test]
async fn remove_unknown_workload_is_not_found() {
    let fx = fixture();
    let err = fx.supervisor.remove("ghost").await.unwrap_err();
    assert!(matches!(err, FleetError::NotFound { .. }));
}

#[tokio::test]
async fn remove_aborts_when_stop_cannot_converge() {
    let fx = fixture();
    let seeded = seed(&fx, "echo");
    fx.runner.immortal();
    fx.supervisor.start("echo").await.unwrap();

    let err = fx.supervisor.remove("echo").await.unwrap_err();

    assert!(matches!(err, FleetError::Timeout { .. }));
    // Nothing was deleted: directory and record both survive.
    assert!(seeded.work_dir.exists());
    assert!(fx.registry.contains("echo"));
}

#[test]
fn interpreter_prefers_the_venv_python() {
    let dir = TempDir::new().unwrap();
    let work_dir = dir.path().to_path_buf();
    std::fs::create_dir_all(work_dir.join(".venv/bin")).unwrap();
    std::fs::write(work_dir.join(".venv/bin/python"), "").unwrap();

    let record = WorkloadRecord::new(
        "echo",
        "https://github.com/acme/x",
        Credential::new("t"),
        None,
        work_dir.clone(),
    );

    let argv = interpreter_argv(&record);
    assert_eq!(argv[0], work_dir.join(".venv/bin/python").display().to_string());
}

#[yare::parameterized(
    python_without_venv = { "main.py", &["python3", "main.py"] },
    shell_script = { "run.sh", &["sh", "run.sh"] },
    bare_binary = { "bot-bin", &["./bot-bin"] },
)]
fn interpreter_selection(entry: &str, expected: &[&str]) {
    let record = WorkloadRecord {
        entry_point: entry.to_string(),
        ..WorkloadRecord::new(
            "echo",
            "https://github.com/acme/x",
            Credential::new("t"),
            None,
            std::path::PathBuf::from("/tmp/none"),
        )
    };

    let argv = interpreter_argv(&record);
    assert_eq!(argv, expected.iter().map(|s| s.to_string()).collect::<Vec<_>>());
}
