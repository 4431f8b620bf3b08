//! Run the `git` command-line tool without interactive prompts and turn its
//! failures into a closed set of error kinds.
//!
//! ```no_run
//! # async fn demo() -> Result<(), gitproc::ExecError> {
//! use std::path::Path;
//!
//! let git = gitproc::GitProcess::from_process()?;
//! let result = git
//!     .run(&["fetch", "origin"], Path::new("/path/to/repo"))
//!     .await?;
//! if !result.success() {
//!     let kind = git.parse_error_from_result(&result);
//!     println!("fetch failed with {} ({kind:?})", result.exit_code());
//! }
//! # Ok(())
//! # }
//! ```

pub mod askpass;
pub mod classifier;
pub mod config;
pub mod env;
pub mod errors;
pub mod executor;
pub mod kind;
pub mod location;
pub mod process;

pub use classifier::{ErrorClassifier, ErrorPattern, parse_error, parse_error_from_result};
pub use config::GitProcessConfig;
pub use env::{EnvMap, askpass_env, non_interactive_env};
pub use errors::ExecError;
pub use executor::{ExecutionResult, InvocationOptions, ProcessExecutor};
pub use kind::ErrorKind;
pub use location::GitLocation;
pub use process::GitProcess;
pub use tokio_util::sync::CancellationToken;
