//! gitproc-askpass - answers git and ssh credential prompts without a terminal.
//!
//! Point `GIT_ASKPASS` (and `SSH_ASKPASS`) at this binary and set
//! `TEST_USERNAME`/`TEST_PASSWORD`. Unknown prompts fail with exit code 1 so
//! git gives up instead of waiting.

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gitproc::EnvMap;
use gitproc::askpass::{Prompt, respond};

/// Exit codes seen by git.
mod exit_codes {
    pub const OK: i32 = 0;
    pub const NO_ANSWER: i32 = 1;
}

/// Answer a credential prompt from the environment.
#[derive(Debug, Parser)]
#[command(name = "gitproc-askpass", version)]
struct Cli {
    /// The prompt text git or ssh passes as the only argument.
    #[arg(allow_hyphen_values = true)]
    prompt: Option<String>,
}

fn main() {
    // stdout carries the answer, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GITPROC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match run(&cli) {
        Ok(Some(answer)) => {
            println!("{answer}");
            exit_codes::OK
        }
        Ok(None) => exit_codes::NO_ANSWER,
        Err(e) => {
            eprintln!("gitproc-askpass: {e:#}");
            exit_codes::NO_ANSWER
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<Option<String>> {
    let prompt = cli.prompt.as_deref().unwrap_or_default();
    let env = EnvMap::from_process();
    let kind = Prompt::parse(prompt);
    debug!(?kind, "askpass prompt");

    let Some(kind) = kind else {
        return Ok(None);
    };
    match respond(prompt, &env) {
        Some(answer) => Ok(Some(answer.to_string())),
        None => anyhow::bail!("no credential configured for {kind:?} prompt"),
    }
}
