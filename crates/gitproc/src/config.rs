//! Configuration shared by every invocation of one [`GitProcess`](crate::GitProcess).

use std::time::Duration;

use crate::env::EnvMap;
use crate::errors::ExecError;
use crate::location::GitLocation;

/// Process-wide defaults, passed in explicitly rather than read from globals.
#[derive(Debug, Clone)]
pub struct GitProcessConfig {
    /// Which git to run.
    pub git: GitLocation,
    /// The environment every invocation inherits before overrides.
    pub inherited_env: EnvMap,
    /// Timeout for invocations that set none.
    pub default_timeout: Option<Duration>,
    /// Output cap for invocations that set none.
    pub max_output_bytes: Option<usize>,
}

impl GitProcessConfig {
    /// Run `git` with `inherited_env` and no limits.
    pub fn new(git: GitLocation, inherited_env: EnvMap) -> Self {
        Self {
            git,
            inherited_env,
            default_timeout: None,
            max_output_bytes: None,
        }
    }

    /// Resolve git from `inherited_env` (see [`GitLocation::resolve`]).
    pub fn from_env(inherited_env: EnvMap) -> Result<Self, ExecError> {
        let git = GitLocation::resolve(&inherited_env)?;
        Ok(Self::new(git, inherited_env))
    }

    /// Snapshot the host process environment once and resolve git from it.
    pub fn from_process() -> Result<Self, ExecError> {
        Self::from_env(EnvMap::from_process())
    }

    /// Set the default timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Set the default output cap.
    #[must_use]
    pub fn with_max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::location::LOCAL_GIT_DIRECTORY;

    #[test]
    fn test_should_start_without_limits() {
        let config = GitProcessConfig::new(GitLocation::from_path("git"), EnvMap::new());
        assert_eq!(config.default_timeout, None);
        assert_eq!(config.max_output_bytes, None);
    }

    #[test]
    fn test_should_resolve_git_from_inherited_env() {
        let env = EnvMap::from_iter([(LOCAL_GIT_DIRECTORY, "/opt/git")]);
        let config = GitProcessConfig::from_env(env.clone())
            .unwrap()
            .with_default_timeout(Duration::from_secs(30))
            .with_max_output_bytes(1 << 20);

        assert_eq!(
            config.git,
            GitLocation::from_local_directory(std::path::Path::new("/opt/git"))
        );
        assert_eq!(config.inherited_env, env);
        assert_eq!(config.default_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_output_bytes, Some(1 << 20));
    }
}
