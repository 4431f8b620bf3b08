//! Environment construction for git subprocesses.
//!
//! Every builder takes a base map and returns a new one; nothing here reads
//! or writes the host process environment except [`EnvMap::from_process`].

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::Path;

use tracing::instrument;

/// Disables git's terminal credential prompt when set to `0`.
pub const GIT_TERMINAL_PROMPT: &str = "GIT_TERMINAL_PROMPT";
/// Program git runs to ask for credentials.
pub const GIT_ASKPASS: &str = "GIT_ASKPASS";
/// Program ssh (and git, as a fallback) runs to ask for credentials.
pub const SSH_ASKPASS: &str = "SSH_ASKPASS";
/// Git Credential Manager interactivity switch.
pub const GCM_INTERACTIVE: &str = "GCM_INTERACTIVE";
/// Command git uses in place of `ssh`.
pub const GIT_SSH_COMMAND: &str = "GIT_SSH_COMMAND";
/// Username the askpass responder answers with.
pub const TEST_USERNAME: &str = "TEST_USERNAME";
/// Password the askpass responder answers with.
pub const TEST_PASSWORD: &str = "TEST_PASSWORD";

const BATCH_SSH_COMMAND: &str = "ssh -o BatchMode=yes";

/// An ordered set of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap(BTreeMap<String, String>);

impl EnvMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Look up a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether `key` is set (possibly to an empty value).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a variable, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// A new map holding `self` with every entry of `top` laid over it.
    #[must_use]
    pub fn overlay(&self, top: &EnvMap) -> EnvMap {
        let mut merged = self.clone();
        merged
            .0
            .extend(top.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for EnvMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// `base` with every interactive credential prompt disabled.
///
/// Git fails fast instead of asking for a username: the terminal prompt is
/// off, both askpass programs are blanked, Git Credential Manager is told not
/// to open dialogs, and ssh runs in batch mode unless `base` already picks
/// its own ssh command.
pub fn non_interactive_env(base: &EnvMap) -> EnvMap {
    let mut env = base
        .clone()
        .with(GIT_TERMINAL_PROMPT, "0")
        .with(GIT_ASKPASS, "")
        .with(SSH_ASKPASS, "")
        .with(GCM_INTERACTIVE, "never");
    if !base.contains_key(GIT_SSH_COMMAND) {
        env.insert(GIT_SSH_COMMAND, BATCH_SSH_COMMAND);
    }
    env
}

/// `base` configured so every credential request is answered by `responder`
/// with `username` and `password`.
///
/// `responder` is expected to follow the `gitproc-askpass` contract: it
/// reads [`TEST_USERNAME`] and [`TEST_PASSWORD`] and exits without prompting.
#[instrument(skip(base, password), fields(responder = %responder.display()))]
pub fn askpass_env(base: &EnvMap, responder: &Path, username: &str, password: &str) -> EnvMap {
    let program = responder.to_string_lossy().into_owned();
    base.clone()
        .with(GIT_TERMINAL_PROMPT, "0")
        .with(GIT_ASKPASS, program.clone())
        .with(SSH_ASKPASS, program)
        .with(TEST_USERNAME, username)
        .with(TEST_PASSWORD, password)
}

/// Whether `env` already decides how credential prompts behave.
pub fn controls_prompting(env: &EnvMap) -> bool {
    env.contains_key(GIT_TERMINAL_PROMPT) || env.contains_key(GIT_ASKPASS)
}

/// The environment for one invocation: `inherited`, then the non-interactive
/// defaults (skipped when `overrides` controls prompting itself), then
/// `overrides`.
pub fn resolve_env(inherited: &EnvMap, overrides: &EnvMap) -> EnvMap {
    if controls_prompting(overrides) {
        inherited.overlay(overrides)
    } else {
        non_interactive_env(inherited).overlay(overrides)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn base() -> EnvMap {
        EnvMap::from_iter([("PATH", "/usr/bin"), ("HOME", "/home/dev")])
    }

    #[test]
    fn test_should_disable_prompts_without_touching_base() {
        let base = base();
        let env = non_interactive_env(&base);

        assert_eq!(env.get(GIT_TERMINAL_PROMPT), Some("0"));
        assert_eq!(env.get(GIT_ASKPASS), Some(""));
        assert_eq!(env.get(SSH_ASKPASS), Some(""));
        assert_eq!(env.get(GCM_INTERACTIVE), Some("never"));
        assert_eq!(env.get(GIT_SSH_COMMAND), Some("ssh -o BatchMode=yes"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(base.len(), 2);
        assert!(!base.contains_key(GIT_TERMINAL_PROMPT));
    }

    #[test]
    fn test_should_force_prompt_keys_over_base() {
        let base = base()
            .with(GIT_TERMINAL_PROMPT, "1")
            .with(SSH_ASKPASS, "/usr/lib/ssh/x11-ssh-askpass");
        let env = non_interactive_env(&base);
        assert_eq!(env.get(GIT_TERMINAL_PROMPT), Some("0"));
        assert_eq!(env.get(SSH_ASKPASS), Some(""));
    }

    #[test]
    fn test_should_keep_custom_ssh_command() {
        let base = base().with(GIT_SSH_COMMAND, "ssh -i ~/.ssh/deploy");
        let env = non_interactive_env(&base);
        assert_eq!(env.get(GIT_SSH_COMMAND), Some("ssh -i ~/.ssh/deploy"));
    }

    #[test]
    fn test_should_configure_askpass_responder() {
        let responder = PathBuf::from("/usr/local/bin/gitproc-askpass");
        let env = askpass_env(&base(), &responder, "error", "secret");

        assert_eq!(env.get(GIT_TERMINAL_PROMPT), Some("0"));
        assert_eq!(env.get(GIT_ASKPASS), Some("/usr/local/bin/gitproc-askpass"));
        assert_eq!(env.get(SSH_ASKPASS), Some("/usr/local/bin/gitproc-askpass"));
        assert_eq!(env.get(TEST_USERNAME), Some("error"));
        assert_eq!(env.get(TEST_PASSWORD), Some("secret"));
        assert_eq!(env.get("HOME"), Some("/home/dev"));
    }

    #[test]
    fn test_should_overlay_without_mutating_either_side() {
        let bottom = EnvMap::from_iter([("A", "1"), ("B", "2")]);
        let top = EnvMap::from_iter([("B", "3"), ("C", "4")]);
        let merged = bottom.overlay(&top);

        assert_eq!(merged, EnvMap::from_iter([("A", "1"), ("B", "3"), ("C", "4")]));
        assert_eq!(bottom.get("B"), Some("2"));
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_should_apply_defaults_then_overrides() {
        let overrides = EnvMap::from_iter([("GIT_TRACE", "1"), (GCM_INTERACTIVE, "auto")]);
        let env = resolve_env(&base(), &overrides);

        assert_eq!(env.get(GIT_TERMINAL_PROMPT), Some("0"));
        assert_eq!(env.get(GCM_INTERACTIVE), Some("auto"));
        assert_eq!(env.get("GIT_TRACE"), Some("1"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
    }

    #[test]
    fn test_should_skip_defaults_when_overrides_control_prompting() {
        let overrides = askpass_env(&EnvMap::new(), Path::new("/bin/askpass"), "u", "p");
        let env = resolve_env(&base(), &overrides);

        assert_eq!(env.get(GIT_ASKPASS), Some("/bin/askpass"));
        assert_eq!(env.get(SSH_ASKPASS), Some("/bin/askpass"));
        assert!(!env.contains_key(GCM_INTERACTIVE));
        assert!(!env.contains_key(GIT_SSH_COMMAND));
    }

    #[test]
    fn test_should_detect_prompt_control() {
        assert!(controls_prompting(&EnvMap::from_iter([(GIT_ASKPASS, "")])));
        assert!(controls_prompting(&EnvMap::from_iter([(GIT_TERMINAL_PROMPT, "0")])));
        assert!(!controls_prompting(&EnvMap::from_iter([(SSH_ASKPASS, "")])));
        assert!(!controls_prompting(&EnvMap::new()));
    }

    #[test]
    fn test_should_iterate_in_name_order() {
        let env = EnvMap::from_iter([("Z", "1"), ("A", "2")]);
        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["A", "Z"]);
        assert!(EnvMap::new().is_empty());
    }
}
