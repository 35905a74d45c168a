// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability-abstracted command runner.
//!
//! The deployer and supervisor call external programs only through
//! [`CommandRunner`]: bounded one-shot runs (clone, install, pull),
//! long-lived workload spawns, signals, and liveness probes. Tests
//! substitute [`fake::FakeRunner`] to exercise the full state machine
//! without spawning real processes.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Result of a bounded one-shot command.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best human-readable failure text: stderr, falling back to stdout.
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Signal sent to a workload process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGTERM, ask nicely first.
    Graceful,
    /// SIGKILL, grace period expired.
    Forceful,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// Narrow interface to the operating system's process facilities.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `argv` to completion in `cwd` with a bounded timeout.
    ///
    /// A non-zero exit is reported through [`RunOutput`], not as an
    /// error; errors are reserved for spawn failures and timeouts.
    /// On timeout the child is killed.
    async fn run(
        &self,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<RunOutput, RunnerError>;

    /// Spawn `argv` as a long-lived child whose stdout and stderr
    /// append to `log_file`, returning the child's pid.
    ///
    /// The child must own its output descriptors outright so it keeps
    /// running and logging after the spawning process exits.
    async fn spawn(
        &self,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
        log_file: &Path,
    ) -> Result<u32, RunnerError>;

    /// Send a signal to `pid`. Best-effort: a vanished process is fine.
    fn signal(&self, pid: u32, signal: StopSignal);

    /// OS-level liveness of `pid` at this instant.
    fn is_alive(&self, pid: u32) -> bool;
}

// ---------------------------------------------------------------------------
// System implementation
// ---------------------------------------------------------------------------

/// Real implementation over `tokio::process` and POSIX signals.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
        timeout: Duration,
    ) -> Result<RunOutput, RunnerError> {
        let cmdline = argv.join(" ");
        let (program, args) = split_argv(argv, &cmdline)?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            // Dropping the output future on timeout must kill the child.
            .kill_on_drop(true);
        for (k, v) in env {
            cmd.env(k, v);
        }

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| RunnerError::Spawn {
                command: cmdline.clone(),
                source,
            })?,
            Err(_) => {
                tracing::warn!(command = %cmdline, secs = timeout.as_secs(), "command timed out");
                return Err(RunnerError::Timeout {
                    command: cmdline,
                    secs: timeout.as_secs(),
                });
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(command = %cmdline, exit_code, "command finished");

        Ok(RunOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn(
        &self,
        cwd: &Path,
        argv: &[String],
        env: &[(String, String)],
        log_file: &Path,
    ) -> Result<u32, RunnerError> {
        let cmdline = argv.join(" ");
        let (program, args) = split_argv(argv, &cmdline)?;

        // The child writes straight into the log file. It never holds a
        // pipe back into this process, so it survives a control-plane
        // exit and its output keeps landing on disk.
        let spawn_err = |source: std::io::Error| RunnerError::Spawn {
            command: cmdline.clone(),
            source,
        };
        let stdout_log = open_append(log_file).map_err(spawn_err)?;
        let stderr_log = stdout_log.try_clone().map_err(spawn_err)?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::from(stdout_log))
            .stderr(std::process::Stdio::from(stderr_log));
        for (k, v) in env {
            cmd.env(k, v);
        }

        let mut child = cmd.spawn().map_err(spawn_err)?;

        let pid = child.id().ok_or_else(|| {
            spawn_err(std::io::Error::other("child exited before pid was observed"))
        })?;

        // Reap the child when it exits so it never lingers as a zombie
        // while this process is alive. The workload itself runs
        // independently of the control plane.
        tokio::spawn(async move {
            let status = child.wait().await;
            tracing::debug!(pid, ?status, "workload process exited");
        });

        tracing::info!(pid, command = %cmdline, "spawned workload process");

        Ok(pid)
    }

    fn signal(&self, pid: u32, signal: StopSignal) {
        use nix::sys::signal::{kill, Signal};
        let sig = match signal {
            StopSignal::Graceful => Signal::SIGTERM,
            StopSignal::Forceful => Signal::SIGKILL,
        };
        if let Err(e) = kill(nix::unistd::Pid::from_raw(pid as i32), sig) {
            // ESRCH just means it already exited.
            tracing::debug!(pid, ?sig, error = %e, "signal not delivered");
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        // Signal 0 probes existence without delivering anything.
        match kill(nix::unistd::Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

fn split_argv<'a>(
    argv: &'a [String],
    cmdline: &str,
) -> Result<(&'a String, &'a [String]), RunnerError> {
    match argv.split_first() {
        Some((program, args)) => Ok((program, args)),
        None => Err(RunnerError::Spawn {
            command: cmdline.to_string(),
            source: std::io::Error::other("empty argv"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Fake implementation for tests
// ---------------------------------------------------------------------------

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A recorded `run` invocation.
    #[derive(Debug, Clone)]
    pub struct RunCall {
        pub cwd: PathBuf,
        pub argv: Vec<String>,
        pub env: Vec<(String, String)>,
    }

    /// A recorded `spawn` invocation.
    #[derive(Debug, Clone)]
    pub struct SpawnCall {
        pub cwd: PathBuf,
        pub argv: Vec<String>,
        pub env: Vec<(String, String)>,
        pub log_file: PathBuf,
    }

    #[derive(Default)]
    struct FakeState {
        run_calls: Vec<RunCall>,
        spawn_calls: Vec<SpawnCall>,
        signals: Vec<(u32, StopSignal)>,
        /// Command key → stderr to fail with (exit code 1).
        failures: HashMap<String, String>,
        /// Command keys that time out instead of completing.
        timeouts: HashSet<String>,
        /// Files created inside the target directory of a `git clone`.
        clone_files: Vec<String>,
        /// Scripted output lines a spawned workload writes to its log.
        spawn_output: Vec<String>,
        alive: HashSet<u32>,
        spawn_fails: bool,
        ignore_sigterm: bool,
        immortal: bool,
    }

    /// Scripted [`CommandRunner`] that records calls and simulates
    /// process liveness without spawning anything.
    ///
    /// `git clone` creates the target directory on disk (populated with
    /// [`FakeRunner::clone_files`]) so the deployer's filesystem checks
    /// see a realistic tree.
    pub struct FakeRunner {
        state: Mutex<FakeState>,
        next_pid: AtomicU32,
    }

    impl Default for FakeRunner {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(FakeState {
                    clone_files: vec!["main.py".to_string()],
                    ..FakeState::default()
                }),
                next_pid: AtomicU32::new(1000),
            }
        }

        /// Fail commands matching `key` ("git clone", "pip", ...) with
        /// the given stderr. Keys match the program basename or the
        /// basename plus first argument.
        pub fn fail(&self, key: &str, stderr: &str) {
            self.state
                .lock()
                .failures
                .insert(key.to_string(), stderr.to_string());
        }

        /// Make commands matching `key` time out.
        pub fn time_out(&self, key: &str) {
            self.state.lock().timeouts.insert(key.to_string());
        }

        /// Files a fake `git clone` creates in the target directory.
        pub fn clone_files(&self, files: &[&str]) {
            self.state.lock().clone_files = files.iter().map(|f| f.to_string()).collect();
        }

        /// Output lines a spawned workload writes to its log file.
        pub fn spawn_output(&self, lines: &[&str]) {
            self.state.lock().spawn_output = lines.iter().map(|l| l.to_string()).collect();
        }

        /// Make subsequent `spawn` calls fail.
        pub fn fail_spawn(&self) {
            self.state.lock().spawn_fails = true;
        }

        /// Simulate a workload that ignores SIGTERM (forces escalation).
        pub fn ignore_sigterm(&self) {
            self.state.lock().ignore_sigterm = true;
        }

        /// Simulate a workload that survives even SIGKILL.
        pub fn immortal(&self) {
            self.state.lock().immortal = true;
        }

        /// Simulate an out-of-band crash of `pid`.
        pub fn kill_out_of_band(&self, pid: u32) {
            self.state.lock().alive.remove(&pid);
        }

        pub fn run_calls(&self) -> Vec<RunCall> {
            self.state.lock().run_calls.clone()
        }

        pub fn spawn_calls(&self) -> Vec<SpawnCall> {
            self.state.lock().spawn_calls.clone()
        }

        pub fn signals(&self) -> Vec<(u32, StopSignal)> {
            self.state.lock().signals.clone()
        }

        fn lookup_failure(argv: &[String], state: &FakeState) -> Option<FakeOutcome> {
            for key in Self::keys(argv) {
                if state.timeouts.contains(&key) {
                    return Some(FakeOutcome::Timeout);
                }
                if let Some(stderr) = state.failures.get(&key) {
                    return Some(FakeOutcome::Fail(stderr.clone()));
                }
            }
            None
        }

        fn keys(argv: &[String]) -> Vec<String> {
            let program = argv
                .first()
                .map(|p| {
                    Path::new(p)
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_else(|| p.clone())
                })
                .unwrap_or_default();
            match argv.get(1) {
                Some(arg) => vec![format!("{program} {arg}"), program],
                None => vec![program],
            }
        }
    }

    enum FakeOutcome {
        Timeout,
        Fail(String),
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            cwd: &Path,
            argv: &[String],
            env: &[(String, String)],
            timeout: Duration,
        ) -> Result<RunOutput, RunnerError> {
            let mut state = self.state.lock();
            state.run_calls.push(RunCall {
                cwd: cwd.to_path_buf(),
                argv: argv.to_vec(),
                env: env.to_vec(),
            });

            match Self::lookup_failure(argv, &state) {
                Some(FakeOutcome::Timeout) => Err(RunnerError::Timeout {
                    command: argv.join(" "),
                    secs: timeout.as_secs(),
                }),
                Some(FakeOutcome::Fail(stderr)) => Ok(RunOutput {
                    exit_code: 1,
                    stdout: String::new(),
                    stderr,
                }),
                None => {
                    // A successful clone materializes the work tree.
                    if argv.first().map(String::as_str) == Some("git")
                        && argv.get(1).map(String::as_str) == Some("clone")
                    {
                        if let Some(target) = argv.last() {
                            let dir = PathBuf::from(target);
                            std::fs::create_dir_all(&dir).ok();
                            for file in &state.clone_files {
                                std::fs::write(dir.join(file), "# fake clone\n").ok();
                            }
                        }
                    }
                    Ok(RunOutput {
                        exit_code: 0,
                        stdout: String::new(),
                        stderr: String::new(),
                    })
                }
            }
        }

        async fn spawn(
            &self,
            cwd: &Path,
            argv: &[String],
            env: &[(String, String)],
            log_file: &Path,
        ) -> Result<u32, RunnerError> {
            let mut state = self.state.lock();
            state.spawn_calls.push(SpawnCall {
                cwd: cwd.to_path_buf(),
                argv: argv.to_vec(),
                env: env.to_vec(),
                log_file: log_file.to_path_buf(),
            });

            if state.spawn_fails {
                return Err(RunnerError::Spawn {
                    command: argv.join(" "),
                    source: std::io::Error::other("scripted spawn failure"),
                });
            }

            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            state.alive.insert(pid);

            // Scripted output lands in the log file, as a real child's
            // redirected stdout would.
            if !state.spawn_output.is_empty() {
                let mut contents = state.spawn_output.join("\n");
                contents.push('\n');
                if let Ok(mut file) = super::open_append(log_file) {
                    use std::io::Write;
                    let _ = file.write_all(contents.as_bytes());
                }
            }

            Ok(pid)
        }

        fn signal(&self, pid: u32, signal: StopSignal) {
            let mut state = self.state.lock();
            state.signals.push((pid, signal));
            let dies = match signal {
                StopSignal::Graceful => !state.ignore_sigterm && !state.immortal,
                StopSignal::Forceful => !state.immortal,
            };
            if dies {
                state.alive.remove(&pid);
            }
        }

        fn is_alive(&self, pid: u32) -> bool {
            self.state.lock().alive.contains(&pid)
        }
    }
}
