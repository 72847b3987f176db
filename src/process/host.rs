//! Ownership of one external process
//!
//! A [`ProcessHost`] is configured first (pipes, environment, forwarding),
//! then started once and finally closed. Closing is idempotent.

use crate::error::{Error, Result};
use crate::process::command::CommandSpec;
use crate::process::env::EnvironmentVariables;
use crate::process::output::{OutputStream, forward_lines};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

/// Grace period between closing stdin and killing the child
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Forwarders still blocked after the child is gone are aborted after this
const FORWARDER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Lifecycle of a hosted process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Pipes and environment may still be changed
    Configured,

    /// Child spawned
    Running,

    /// Child exited on its own
    Exited,

    /// Explicitly closed, nothing left to release
    Closed,
}

impl ProcessState {
    pub fn description(&self) -> &'static str {
        match self {
            ProcessState::Configured => "Configured",
            ProcessState::Running => "Running",
            ProcessState::Exited => "Exited",
            ProcessState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

pub struct ProcessHost {
    spec: CommandSpec,
    env: EnvironmentVariables,
    state: ProcessState,
    close_timeout: Duration,

    stdin_requested: bool,
    stdout_requested: bool,
    stderr_requested: bool,
    forward: Vec<(OutputStream, String)>,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    forwarders: Vec<JoinHandle<usize>>,
    exit_status: Option<ExitStatus>,
}

impl ProcessHost {
    pub fn new(command: &str) -> Result<Self> {
        Ok(Self::from_spec(CommandSpec::parse(command)?))
    }

    pub fn from_spec(spec: CommandSpec) -> Self {
        Self {
            spec,
            env: EnvironmentVariables::new(),
            state: ProcessState::Configured,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            stdin_requested: false,
            stdout_requested: false,
            stderr_requested: false,
            forward: Vec::new(),
            child: None,
            stdin: None,
            stdout: None,
            stderr: None,
            forwarders: Vec::new(),
            exit_status: None,
        }
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn program(&self) -> &str {
        self.spec.program()
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn environment(&self) -> &EnvironmentVariables {
        &self.env
    }

    /// OS process id while the child is alive
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Add variables to the child's environment.
    ///
    /// Only effective before [`start`](Self::start); later calls are logged
    /// and ignored.
    pub fn set_env(&mut self, vars: &EnvironmentVariables) {
        if self.state != ProcessState::Configured {
            log::warn!(
                "{}: environment changes after start are not supported, ignoring {} variable(s)",
                self.spec.program(),
                vars.len()
            );
            return;
        }
        self.env.extend(vars);
    }

    pub fn open_stdin(&mut self) -> Result<()> {
        self.ensure_configured()?;
        if std::mem::replace(&mut self.stdin_requested, true) {
            return Err(Error::PipeAlreadyOpened("stdin"));
        }
        Ok(())
    }

    pub fn open_stdout(&mut self) -> Result<()> {
        self.ensure_configured()?;
        if std::mem::replace(&mut self.stdout_requested, true) {
            return Err(Error::PipeAlreadyOpened("stdout"));
        }
        Ok(())
    }

    pub fn open_stderr(&mut self) -> Result<()> {
        self.ensure_configured()?;
        if std::mem::replace(&mut self.stderr_requested, true) {
            return Err(Error::PipeAlreadyOpened("stderr"));
        }
        Ok(())
    }

    /// Forward every line of an opened output stream to the log.
    ///
    /// The stream must have been requested with `open_stdout`/`open_stderr`.
    /// Registered streams get their forwarding task when the process starts.
    pub fn forward_output(&mut self, stream: OutputStream, prefix: impl Into<String>) -> Result<()> {
        self.ensure_configured()?;
        let requested = match stream {
            OutputStream::Stdout => self.stdout_requested,
            OutputStream::Stderr => self.stderr_requested,
        };
        if !requested {
            return Err(Error::Config(format!(
                "{} must be opened before it can be forwarded",
                stream.as_str()
            )));
        }
        if self.forward.iter().any(|(s, _)| *s == stream) {
            return Err(Error::Config(format!("{} is already forwarded", stream.as_str())));
        }
        self.forward.push((stream, prefix.into()));
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure_configured()?;

        let mut command = Command::new(self.spec.program());
        command
            .args(self.spec.args())
            .envs(&self.env)
            .stdin(pipe_or_null(self.stdin_requested))
            .stdout(pipe_or_null(self.stdout_requested))
            .stderr(pipe_or_null(self.stderr_requested))
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| Error::Spawn {
            program: self.spec.program().to_string(),
            source,
        })?;

        log::info!("Started `{}` (pid {:?})", self.spec, child.id());

        self.stdin = child.stdin.take();
        self.stdout = child.stdout.take();
        self.stderr = child.stderr.take();
        self.child = Some(child);
        self.state = ProcessState::Running;

        for (stream, prefix) in std::mem::take(&mut self.forward) {
            let handle = match stream {
                OutputStream::Stdout => self
                    .stdout
                    .take()
                    .map(|out| tokio::spawn(forward_lines(out, prefix))),
                OutputStream::Stderr => self
                    .stderr
                    .take()
                    .map(|err| tokio::spawn(forward_lines(err, prefix))),
            };
            self.forwarders.extend(handle);
        }

        Ok(())
    }

    /// Write the whole buffer to the child's stdin.
    ///
    /// Suspends while the pipe is full.
    pub async fn write_stdin(&mut self, bytes: &[u8]) -> Result<()> {
        if !matches!(self.state, ProcessState::Running | ProcessState::Exited) {
            return Err(Error::StdinUnavailable);
        }
        let stdin = self.stdin.as_mut().ok_or(Error::StdinUnavailable)?;
        stdin.write_all(bytes).await?;
        Ok(())
    }

    /// Hand out the raw stdout pipe; `None` if not opened, forwarded or taken
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Check without blocking whether the child has exited
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        let Some(child) = self.child.as_mut() else {
            return Ok(self.exit_status);
        };
        let status = child.try_wait()?;
        if let Some(status) = status {
            if self.state == ProcessState::Running {
                log::debug!("`{}` exited with {}", self.spec.program(), status);
                self.state = ProcessState::Exited;
            }
            self.exit_status = Some(status);
        }
        Ok(status)
    }

    /// Close stdin, wait for the child within the grace period, kill it
    /// otherwise and join the forwarding tasks.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ProcessState::Closed {
            return Ok(());
        }
        let previous = self.state;
        self.state = ProcessState::Closed;

        // EOF for the child
        drop(self.stdin.take());
        self.stdout.take();
        self.stderr.take();
        self.forward.clear();

        let result = match self.child.take() {
            Some(child) => self.terminate(child).await,
            None => Ok(()),
        };

        for mut handle in self.forwarders.drain(..) {
            match tokio::time::timeout(FORWARDER_JOIN_TIMEOUT, &mut handle).await {
                Ok(Ok(lines)) => log::trace!("forwarder finished after {} line(s)", lines),
                Ok(Err(e)) => log::warn!("output forwarder failed: {}", e),
                Err(_) => handle.abort(),
            }
        }

        log::debug!("Closed `{}` (was {})", self.spec.program(), previous);
        result
    }

    async fn terminate(&mut self, mut child: Child) -> Result<()> {
        let status = match tokio::time::timeout(self.close_timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                log::warn!(
                    "`{}` did not exit within {:?}, killing it",
                    self.spec.program(),
                    self.close_timeout
                );
                child.start_kill()?;
                child.wait().await?
            }
        };

        if status.success() {
            log::info!("`{}` exited cleanly", self.spec.program());
        } else {
            log::warn!("`{}` exited with {}", self.spec.program(), status);
        }
        self.exit_status = Some(status);
        Ok(())
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.state == ProcessState::Configured {
            Ok(())
        } else {
            Err(Error::AlreadyStarted)
        }
    }
}

fn pipe_or_null(requested: bool) -> Stdio {
    if requested {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

impl std::fmt::Debug for ProcessHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHost")
            .field("command", &self.spec.to_string())
            .field("state", &self.state)
            .field("env", &self.env)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_empty_command() {
        assert!(matches!(ProcessHost::new(""), Err(Error::InvalidCommand(_))));
    }

    #[test]
    fn test_pipes_open_once() {
        let mut host = ProcessHost::new("cat").unwrap();
        host.open_stdin().unwrap();
        assert!(matches!(host.open_stdin(), Err(Error::PipeAlreadyOpened("stdin"))));
        host.open_stdout().unwrap();
        assert!(matches!(host.open_stdout(), Err(Error::PipeAlreadyOpened("stdout"))));
    }

    #[test]
    fn test_forward_requires_open_stream() {
        let mut host = ProcessHost::new("cat").unwrap();
        assert!(host.forward_output(OutputStream::Stderr, "x> ").is_err());
        host.open_stderr().unwrap();
        host.forward_output(OutputStream::Stderr, "x> ").unwrap();
        assert!(host.forward_output(OutputStream::Stderr, "x> ").is_err());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut host = ProcessHost::new("definitely-not-a-real-binary-4711").unwrap();
        host.open_stdin().unwrap();
        assert!(matches!(host.start(), Err(Error::Spawn { .. })));
        assert_eq!(host.state(), ProcessState::Configured);
    }

    #[tokio::test]
    async fn test_echo_through_cat() {
        let mut host = ProcessHost::new("cat").unwrap();
        host.open_stdin().unwrap();
        host.open_stdout().unwrap();
        host.start().unwrap();
        assert_eq!(host.state(), ProcessState::Running);
        assert!(matches!(host.open_stderr(), Err(Error::AlreadyStarted)));

        let mut stdout = host.take_stdout().unwrap();
        host.write_stdin(b"hello").await.unwrap();

        let mut buf = [0u8; 5];
        stdout.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");

        host.close().await.unwrap();
        assert_eq!(host.state(), ProcessState::Closed);
        assert!(host.exit_status().unwrap().success());
    }

    #[tokio::test]
    async fn test_env_reaches_child() {
        let mut host = ProcessHost::new("sh -c 'printf %s \"$SAMPLE_RATE\"'").unwrap();
        host.open_stdout().unwrap();
        let mut env = EnvironmentVariables::new();
        env.insert("SAMPLE_RATE", "48000");
        host.set_env(&env);
        host.start().unwrap();

        let mut out = String::new();
        host.take_stdout().unwrap().read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "48000");

        // ignored after start
        env.insert("LATE", "1");
        host.set_env(&env);
        assert_eq!(host.environment().get("LATE"), None);
        host.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_without_stdin() {
        let mut host = ProcessHost::new("true").unwrap();
        assert!(matches!(host.write_stdin(b"x").await, Err(Error::StdinUnavailable)));
        host.start().unwrap();
        assert!(matches!(host.write_stdin(b"x").await, Err(Error::StdinUnavailable)));
        host.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_twice() {
        let mut host = ProcessHost::new("cat").unwrap();
        host.open_stdin().unwrap();
        host.start().unwrap();
        host.close().await.unwrap();
        host.close().await.unwrap();
        assert!(matches!(host.write_stdin(b"x").await, Err(Error::StdinUnavailable)));

        let mut never_started = ProcessHost::new("cat").unwrap();
        never_started.close().await.unwrap();
        never_started.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_kills_stubborn_child() {
        let mut host = ProcessHost::new("sleep 30")
            .unwrap()
            .with_close_timeout(Duration::from_millis(100));
        host.open_stdin().unwrap();
        host.start().unwrap();
        host.close().await.unwrap();
        assert!(!host.exit_status().unwrap().success());
    }

    #[tokio::test]
    async fn test_try_wait_observes_exit() {
        let mut host = ProcessHost::new("true").unwrap();
        host.start().unwrap();
        let mut status = None;
        for _ in 0..100 {
            status = host.try_wait().unwrap();
            if status.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(status.unwrap().success());
        assert_eq!(host.state(), ProcessState::Exited);
        host.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_forwarded_stderr_is_drained() {
        let mut host = ProcessHost::new("sh -c 'echo one >&2; echo two >&2'").unwrap();
        host.open_stderr().unwrap();
        host.forward_output(OutputStream::Stderr, OutputStream::Stderr.prefix("t", "sh"))
            .unwrap();
        host.start().unwrap();
        assert!(host.take_stderr().is_none());
        host.close().await.unwrap();
    }
}
