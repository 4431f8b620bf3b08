//! Locating the git executable.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::env::EnvMap;
use crate::errors::ExecError;

/// Points at a self-contained git distribution (`bin/` + `libexec/git-core`).
pub const LOCAL_GIT_DIRECTORY: &str = "LOCAL_GIT_DIRECTORY";
/// Directory git loads its sub-programs from.
pub const GIT_EXEC_PATH: &str = "GIT_EXEC_PATH";

#[cfg(windows)]
const GIT_BINARY: &str = "git.exe";
#[cfg(not(windows))]
const GIT_BINARY: &str = "git";

/// Where the git binary lives and, for bundled distributions, where its
/// helper programs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLocation {
    git_path: PathBuf,
    exec_path: Option<PathBuf>,
}

impl GitLocation {
    /// Use an explicit git binary.
    pub fn from_path(git_path: impl Into<PathBuf>) -> Self {
        Self {
            git_path: git_path.into(),
            exec_path: None,
        }
    }

    /// Use a self-contained distribution rooted at `dir`.
    pub fn from_local_directory(dir: &Path) -> Self {
        Self {
            git_path: dir.join("bin").join(GIT_BINARY),
            exec_path: Some(dir.join("libexec").join("git-core")),
        }
    }

    /// Set the `GIT_EXEC_PATH` passed to every invocation.
    #[must_use]
    pub fn with_exec_path(mut self, exec_path: impl Into<PathBuf>) -> Self {
        self.exec_path = Some(exec_path.into());
        self
    }

    /// Resolve git from an environment.
    ///
    /// `LOCAL_GIT_DIRECTORY` wins when set and non-empty; otherwise `git` is
    /// searched on the `PATH` of `env`.
    pub fn resolve(env: &EnvMap) -> Result<Self, ExecError> {
        if let Some(dir) = env.get(LOCAL_GIT_DIRECTORY).filter(|d| !d.is_empty()) {
            let location = Self::from_local_directory(Path::new(dir));
            debug!(git = %location.git_path.display(), "using bundled git");
            return Ok(location);
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let git_path = which::which_in(GIT_BINARY, env.get("PATH"), cwd).map_err(|_| {
            ExecError::GitNotFound {
                path: PathBuf::from(GIT_BINARY),
            }
        })?;
        debug!(git = %git_path.display(), "using git from PATH");
        Ok(Self::from_path(git_path))
    }

    /// Path of the git binary.
    pub fn git_path(&self) -> &Path {
        &self.git_path
    }

    /// `GIT_EXEC_PATH` for bundled distributions.
    pub fn exec_path(&self) -> Option<&Path> {
        self.exec_path.as_deref()
    }

    /// `env` with `GIT_EXEC_PATH` filled in, unless it is already set.
    pub fn apply(&self, mut env: EnvMap) -> EnvMap {
        if let Some(exec_path) = &self.exec_path
            && !env.contains_key(GIT_EXEC_PATH)
        {
            env.insert(GIT_EXEC_PATH, exec_path.to_string_lossy());
        }
        env
    }
}
