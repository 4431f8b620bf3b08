//! Answering logic of the non-interactive askpass responder.
//!
//! Git and ssh run the program named by `GIT_ASKPASS`/`SSH_ASKPASS` with the
//! prompt as its only argument and read the answer from its stdout. The
//! `gitproc-askpass` binary is a thin wrapper around [`respond`].

use crate::env::{EnvMap, TEST_PASSWORD, TEST_USERNAME};

/// What a prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// `Username for 'https://host': `
    Username,
    /// `Password for 'https://user@host': ` or an ssh key passphrase.
    Password,
}

impl Prompt {
    /// Recognise a git or ssh credential prompt.
    pub fn parse(prompt: &str) -> Option<Self> {
        if prompt.starts_with("Username") {
            Some(Self::Username)
        } else if prompt.starts_with("Password") || prompt.contains("passphrase") {
            Some(Self::Password)
        } else {
            None
        }
    }
}

/// The answer for `prompt` taken from `env`, or `None` when the prompt is not
/// recognised or the matching variable is unset.
pub fn respond<'a>(prompt: &str, env: &'a EnvMap) -> Option<&'a str> {
    match Prompt::parse(prompt)? {
        Prompt::Username => env.get(TEST_USERNAME),
        Prompt::Password => env.get(TEST_PASSWORD),
    }
}
