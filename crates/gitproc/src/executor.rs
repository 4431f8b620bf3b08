//! Running one git invocation to completion.

use std::borrow::Cow;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::GitProcessConfig;
use crate::env::{EnvMap, resolve_env};
use crate::errors::ExecError;
use crate::location::GitLocation;

/// Exit code reported when the process ended without one (killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// Per-call settings. Nothing here outlives the call.
#[derive(Debug, Clone, Default)]
pub struct InvocationOptions {
    /// Variables laid over the inherited and non-interactive environment.
    pub env: EnvMap,
    /// Terminate the process when this elapses.
    pub timeout: Option<Duration>,
    /// Bytes written to stdin before it is closed. Stdin is null when unset.
    pub stdin: Option<Vec<u8>>,
    /// Terminate the process when stdout or stderr grows past this.
    pub max_output_bytes: Option<usize>,
    /// Terminate the process when this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

impl InvocationOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set environment overrides.
    #[must_use]
    pub fn with_env(mut self, env: EnvMap) -> Self {
        self.env = env;
        self
    }

    /// Set a timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Feed `input` on stdin.
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Cap captured output.
    #[must_use]
    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = Some(limit);
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Outcome of a git process that ran to completion, whatever its exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: String,
    stderr_bytes: Vec<u8>,
}

impl ExecutionResult {
    /// Assemble a result from text stderr.
    pub fn new(exit_code: i32, stdout: Vec<u8>, stderr: String) -> Self {
        Self {
            exit_code,
            stdout,
            stderr_bytes: stderr.clone().into_bytes(),
            stderr,
        }
    }

    /// Assemble a result from the raw bytes a process wrote.
    pub fn from_output(exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code,
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            stderr_bytes: stderr,
        }
    }

    /// The process exit code, or [`NO_EXIT_CODE`].
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Whether git exited with 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Raw stdout.
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Stdout decoded as UTF-8, lossily.
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr, decoded lossily.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Stderr exactly as the process wrote it.
    pub fn stderr_bytes(&self) -> &[u8] {
        &self.stderr_bytes
    }

    /// Take the exit code, stdout, and stderr.
    pub fn into_parts(self) -> (i32, Vec<u8>, String) {
        (self.exit_code, self.stdout, self.stderr)
    }
}

/// Spawns git and supervises it until it exits.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    config: GitProcessConfig,
}

impl ProcessExecutor {
    /// Create an executor.
    pub fn new(config: GitProcessConfig) -> Self {
        Self { config }
    }

    /// The configuration every call starts from.
    pub fn config(&self) -> &GitProcessConfig {
        &self.config
    }

    /// Run git with `args` in `cwd` and wait for it to exit.
    ///
    /// Both output streams are drained concurrently while the process runs.
    /// A non-zero exit is returned as a normal [`ExecutionResult`]; errors are
    /// reserved for launch failures, timeouts, cancellation, the output cap,
    /// and pipe I/O. On every error path after spawning the process (and on
    /// Unix its whole process group) is killed and reaped. Dropping the
    /// returned future kills the process as well.
    #[instrument(skip(self, options), fields(cwd = %cwd.display()))]
    pub async fn exec(
        &self,
        args: &[&str],
        cwd: &Path,
        options: &InvocationOptions,
    ) -> Result<ExecutionResult, ExecError> {
        let input = options.stdin.as_deref();
        let mut cmd = self.command(args, cwd, &options.env, input.is_some())?;
        let mut child = self.launch(&mut cmd, cwd)?;
        debug!(pid = ?child.id(), "spawned git");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = options.max_output_bytes.or(self.config.max_output_bytes);
        let timeout = options.timeout.or(self.config.default_timeout);

        // Buffers live outside the supervised future so a partial stderr
        // survives termination.
        let mut out = Vec::new();
        let mut err = Vec::new();
        let outcome = {
            let run = async {
                tokio::try_join!(
                    feed_stdin(stdin, input),
                    read_capped(stdout, limit, &mut out),
                    read_capped(stderr, limit, &mut err),
                )?;
                let status = child.wait().await?;
                Ok::<_, ExecError>(status.code().unwrap_or(NO_EXIT_CODE))
            };
            supervise(run, timeout, options.cancel.as_ref()).await
        };

        match outcome {
            Ok(exit_code) => {
                let result = ExecutionResult::from_output(exit_code, out, err);
                debug!(
                    exit_code = result.exit_code(),
                    stdout_bytes = result.stdout().len(),
                    stderr_bytes = result.stderr().len(),
                    "git exited"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, "terminating git");
                terminate(&mut child).await;
                Err(with_partial_stderr(e, err))
            }
        }
    }

    /// Start git with `args` in `cwd` and hand the running child to the caller.
    ///
    /// Stdin, stdout, and stderr are piped. The environment and launch-failure
    /// handling match [`exec`](Self::exec); timeouts, output caps, and
    /// cancellation are the caller's job. The child is killed when dropped.
    #[instrument(skip(self, options), fields(cwd = %cwd.display()))]
    pub fn spawn(
        &self,
        args: &[&str],
        cwd: &Path,
        options: &InvocationOptions,
    ) -> Result<Child, ExecError> {
        let mut cmd = self.command(args, cwd, &options.env, true)?;
        self.launch(&mut cmd, cwd)
    }

    fn command(
        &self,
        args: &[&str],
        cwd: &Path,
        overrides: &EnvMap,
        pipe_stdin: bool,
    ) -> Result<Command, ExecError> {
        if args.is_empty() {
            return Err(ExecError::EmptyArgs);
        }
        if !cwd.is_dir() {
            return Err(ExecError::WorkingDirectoryMissing {
                path: cwd.to_path_buf(),
            });
        }

        let git = &self.config.git;
        let env = git.apply(resolve_env(&self.config.inherited_env, overrides));

        let mut std_cmd = std::process::Command::new(git.git_path());
        std_cmd
            .args(args)
            .current_dir(cwd)
            .env_clear()
            .envs(env.iter())
            .stdin(if pipe_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so termination reaches helpers git forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_cmd.process_group(0);
        }

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);
        Ok(cmd)
    }

    fn launch(&self, cmd: &mut Command, cwd: &Path) -> Result<Child, ExecError> {
        cmd.spawn()
            .map_err(|source| launch_error(&self.config.git, cwd, source))
    }
}

fn launch_error(git: &GitLocation, cwd: &Path, source: std::io::Error) -> ExecError {
    if source.kind() != std::io::ErrorKind::NotFound {
        return ExecError::Launch {
            path: git.git_path().to_path_buf(),
            source,
        };
    }
    // Spawning reports a vanished working directory as NotFound too.
    if cwd.is_dir() {
        ExecError::GitNotFound {
            path: git.git_path().to_path_buf(),
        }
    } else {
        ExecError::WorkingDirectoryMissing {
            path: cwd.to_path_buf(),
        }
    }
}

async fn supervise<F, T>(
    run: F,
    timeout: Option<Duration>,
    cancel: Option<&CancellationToken>,
) -> Result<T, ExecError>
where
    F: Future<Output = Result<T, ExecError>>,
{
    let deadline = async {
        match timeout {
            Some(timeout) => {
                tokio::time::sleep(timeout).await;
                ExecError::Timeout { timeout }
            }
            None => std::future::pending().await,
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => {
                token.cancelled().await;
                ExecError::Cancelled
            }
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = run => result,
        err = deadline => Err(err),
        err = cancelled => Err(err),
    }
}

async fn feed_stdin(stdin: Option<ChildStdin>, input: Option<&[u8]>) -> Result<(), ExecError> {
    let (Some(mut pipe), Some(input)) = (stdin, input) else {
        return Ok(());
    };
    match pipe.write_all(input).await {
        // git may exit without reading everything; its exit code says why.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e.into()),
        Ok(()) => Ok(()),
    }
}

/// Drain `pipe` into `buf`. Past `limit`, `buf` keeps the first `limit` bytes.
async fn read_capped<R>(
    pipe: Option<R>,
    limit: Option<usize>,
    buf: &mut Vec<u8>,
) -> Result<(), ExecError>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    match limit {
        Some(limit) => {
            let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
            pipe.take(cap).read_to_end(buf).await?;
            if buf.len() > limit {
                buf.truncate(limit);
                return Err(ExecError::OutputLimitExceeded {
                    limit,
                    stderr: String::new(),
                });
            }
        }
        None => {
            pipe.read_to_end(buf).await?;
        }
    }
    Ok(())
}

fn with_partial_stderr(err: ExecError, stderr: Vec<u8>) -> ExecError {
    match err {
        ExecError::OutputLimitExceeded { limit, .. } => ExecError::OutputLimitExceeded {
            limit,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        },
        other => other,
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            kill_process_group(pid);
        }
    }
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "git already exited");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "failed to reap git");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) only signals; the group was created for this child.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "failed to kill git process group");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_should_expose_result_fields() {
        let result = ExecutionResult::new(128, b"out\xff".to_vec(), "fatal: nope\n".to_string());
        assert_eq!(result.exit_code(), 128);
        assert!(!result.success());
        assert_eq!(result.stdout(), b"out\xff");
        assert_eq!(result.stdout_text(), "out\u{fffd}");
        assert_eq!(result.stderr(), "fatal: nope\n");

        let (code, out, err) = result.into_parts();
        assert_eq!(code, 128);
        assert_eq!(out.len(), 4);
        assert!(err.starts_with("fatal"));
    }

    #[test]
    fn test_should_build_options() {
        let token = CancellationToken::new();
        let options = InvocationOptions::new()
            .with_env(EnvMap::from_iter([("GIT_TRACE", "1")]))
            .with_timeout(Duration::from_secs(5))
            .with_stdin("input")
            .with_max_output_bytes(1024)
            .with_cancel(token.clone());

        assert_eq!(options.env.get("GIT_TRACE"), Some("1"));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.stdin.as_deref(), Some(b"input".as_slice()));
        assert_eq!(options.max_output_bytes, Some(1024));
        assert!(options.cancel.is_some());
    }

    #[tokio::test]
    async fn test_should_read_within_cap() {
        let data: &[u8] = b"hello";
        let mut out = Vec::new();
        read_capped(Some(data), Some(5), &mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_should_fail_past_cap_keeping_the_prefix() {
        let data: &[u8] = b"hello world";
        let mut out = Vec::new();
        let err = read_capped(Some(data), Some(5), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::OutputLimitExceeded { limit: 5, .. }));
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_should_read_everything_without_cap() {
        let data: &[u8] = b"hello world";
        let mut out = Vec::new();
        read_capped(Some(data), None, &mut out).await.unwrap();
        assert_eq!(out, b"hello world");

        let mut none = Vec::new();
        read_capped::<&[u8]>(None, None, &mut none).await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_should_attach_partial_stderr_to_output_cap_error() {
        let err = ExecError::OutputLimitExceeded {
            limit: 8,
            stderr: String::new(),
        };
        let err = with_partial_stderr(err, b"fatal: \xff".to_vec());
        match err {
            ExecError::OutputLimitExceeded { limit, stderr } => {
                assert_eq!(limit, 8);
                assert_eq!(stderr, "fatal: \u{fffd}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = with_partial_stderr(ExecError::Cancelled, b"ignored".to_vec());
        assert!(matches!(err, ExecError::Cancelled));
    }

    #[test]
    fn test_should_keep_raw_stderr_bytes() {
        let result = ExecutionResult::from_output(1, Vec::new(), b"fatal: \xff\n".to_vec());
        assert_eq!(result.stderr(), "fatal: \u{fffd}\n");
        assert_eq!(result.stderr_bytes(), b"fatal: \xff\n");

        let result = ExecutionResult::new(1, Vec::new(), "fatal: x\n".to_string());
        assert_eq!(result.stderr_bytes(), b"fatal: x\n");
    }

    #[tokio::test]
    async fn test_should_time_out_pending_work() {
        let run = std::future::pending::<Result<ExecutionResult, ExecError>>();
        let err = supervise(run, Some(Duration::from_millis(10)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_should_cancel_pending_work() {
        let token = CancellationToken::new();
        token.cancel();
        let run = std::future::pending::<Result<ExecutionResult, ExecError>>();
        let err = supervise(run, None, Some(&token)).await.unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
    }

    #[tokio::test]
    async fn test_should_return_finished_work() {
        let run = async { Ok(ExecutionResult::new(0, Vec::new(), String::new())) };
        let result = supervise(run, Some(Duration::from_secs(5)), None).await.unwrap();
        assert!(result.success());
    }

    #[test]
    fn test_should_classify_launch_errors() {
        let git = GitLocation::from_path("/nope/git");
        let cwd = std::env::temp_dir();

        let err = launch_error(&git, &cwd, std::io::ErrorKind::NotFound.into());
        assert!(matches!(err, ExecError::GitNotFound { .. }));

        let err = launch_error(
            &git,
            Path::new("/definitely/not/here"),
            std::io::ErrorKind::NotFound.into(),
        );
        assert!(matches!(err, ExecError::WorkingDirectoryMissing { .. }));

        let err = launch_error(&git, &cwd, std::io::ErrorKind::PermissionDenied.into());
        assert!(matches!(err, ExecError::Launch { .. }));
    }
}
