//! The one-call entry point.

use std::path::Path;
use std::sync::Arc;

use tokio::process::Child;
use tracing::debug;

use crate::classifier::ErrorClassifier;
use crate::config::GitProcessConfig;
use crate::errors::ExecError;
use crate::executor::{ExecutionResult, InvocationOptions, ProcessExecutor};
use crate::kind::ErrorKind;

/// Runs git non-interactively and classifies failures.
///
/// Holds only configuration, so clones are cheap and calls may run
/// concurrently. Callers serialize invocations that share a working tree.
#[derive(Debug, Clone)]
pub struct GitProcess {
    executor: ProcessExecutor,
    classifier: Option<Arc<ErrorClassifier>>,
}

impl GitProcess {
    /// Create a facade with the built-in error table.
    pub fn new(config: GitProcessConfig) -> Self {
        Self {
            executor: ProcessExecutor::new(config),
            classifier: None,
        }
    }

    /// Snapshot the host environment and find git on its `PATH`.
    pub fn from_process() -> Result<Self, ExecError> {
        Ok(Self::new(GitProcessConfig::from_process()?))
    }

    /// Replace the error table.
    #[must_use]
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// The error table in use.
    pub fn classifier(&self) -> &ErrorClassifier {
        self.classifier
            .as_deref()
            .unwrap_or_else(|| ErrorClassifier::builtin())
    }

    /// The underlying executor.
    pub fn executor(&self) -> &ProcessExecutor {
        &self.executor
    }

    /// Run git with default options.
    pub async fn run(&self, args: &[&str], cwd: &Path) -> Result<ExecutionResult, ExecError> {
        self.exec(args, cwd, &InvocationOptions::default()).await
    }

    /// Run git with `options`. See [`ProcessExecutor::exec`].
    pub async fn exec(
        &self,
        args: &[&str],
        cwd: &Path,
        options: &InvocationOptions,
    ) -> Result<ExecutionResult, ExecError> {
        self.executor.exec(args, cwd, options).await
    }

    /// Start git and return the running child. See [`ProcessExecutor::spawn`].
    pub fn spawn(
        &self,
        args: &[&str],
        cwd: &Path,
        options: &InvocationOptions,
    ) -> Result<Child, ExecError> {
        self.executor.spawn(args, cwd, options)
    }

    /// Classify stderr text.
    pub fn parse_error(&self, stderr: &str) -> Option<ErrorKind> {
        let kind = self.classifier().parse_error(stderr);
        debug!(?kind, "classified git stderr");
        kind
    }

    /// Classify the stderr of a finished invocation.
    pub fn parse_error_from_result(&self, result: &ExecutionResult) -> Option<ErrorKind> {
        self.parse_error(result.stderr())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::env::EnvMap;
    use crate::location::GitLocation;

    fn process() -> GitProcess {
        GitProcess::new(GitProcessConfig::new(
            GitLocation::from_path("git"),
            EnvMap::new(),
        ))
    }

    #[test]
    fn test_should_classify_with_builtin_table() {
        let git = process();
        assert_eq!(
            git.parse_error("fatal: repository 'https://example.com/x.git/' not found\n"),
            Some(ErrorKind::HTTPSRepositoryNotFound)
        );
        assert_eq!(git.parse_error(""), None);
    }

    #[test]
    fn test_should_classify_with_replaced_table() {
        let table = ErrorClassifier::from_table(&[(ErrorKind::HostDown, "offline")]).unwrap();
        let git = process().with_classifier(table);
        let result = ExecutionResult::new(128, Vec::new(), "we are offline".to_string());
        assert_eq!(git.parse_error_from_result(&result), Some(ErrorKind::HostDown));
        assert_eq!(git.parse_error("fatal: repository 'x' not found"), None);
    }

    #[tokio::test]
    async fn test_should_reject_empty_args_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let err = process().run(&[], dir.path()).await.unwrap_err();
        assert!(matches!(err, ExecError::EmptyArgs));
    }

    #[tokio::test]
    async fn test_should_reject_missing_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let err = process().run(&["status"], &missing).await.unwrap_err();
        assert!(matches!(err, ExecError::WorkingDirectoryMissing { .. }));
        assert!(err.is_launch_failure());
    }

    #[tokio::test]
    async fn test_should_report_missing_git_binary() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitProcess::new(GitProcessConfig::new(
            GitLocation::from_path(dir.path().join("no-such-git")),
            EnvMap::new(),
        ));
        let err = git.run(&["--version"], dir.path()).await.unwrap_err();
        assert!(matches!(err, ExecError::GitNotFound { .. }));
    }
}
