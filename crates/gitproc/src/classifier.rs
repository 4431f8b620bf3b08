//! Maps the stderr of a finished git invocation onto an [`ErrorKind`].
//!
//! The built-in table is ordered data: the first pattern that matches wins,
//! so provider- and transport-specific phrasing sits above the generic
//! phrasing it would otherwise collide with. The table tracks git's message
//! text, which changes between releases; revisit it together with the test
//! corpus below whenever a supported git version rewords an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::executor::ExecutionResult;
use crate::kind::ErrorKind;

/// Built-in `(kind, regex)` table, most specific first.
pub const BUILTIN_PATTERNS: &[(ErrorKind, &str)] = &[
    (
        ErrorKind::SSHKeyAuditUnverified,
        r"ERROR: ([\s\S]+?)\n+\[EPOLICYKEYAGE\]\n+fatal: Could not read from remote repository.",
    ),
    (
        ErrorKind::HTTPSAuthenticationFailed,
        r"fatal: Authentication failed for 'https?://",
    ),
    (
        ErrorKind::HTTPSAuthenticationFailed,
        r"fatal: could not read (?:Username|Password) for 'https?://[^']*': terminal prompts disabled",
    ),
    (ErrorKind::SSHAuthenticationFailed, r"fatal: Authentication failed"),
    (ErrorKind::SSHRepositoryNotFound, r"ERROR: Repository not found"),
    (
        ErrorKind::SSHPermissionDenied,
        r"fatal: Could not read from remote repository.",
    ),
    (
        ErrorKind::HTTPSAuthenticationFailed,
        r"The requested URL returned error: 403",
    ),
    (
        ErrorKind::RemoteDisconnection,
        r"fatal: [Tt]he remote end hung up unexpectedly",
    ),
    (
        ErrorKind::HostDown,
        r"fatal: unable to access '(.+)': Failed to connect to (.+): Host is down",
    ),
    (
        ErrorKind::HostDown,
        r"fatal: unable to access '(.+)': Could not resolve host: (.+)",
    ),
    (ErrorKind::RebaseConflicts, r"Failed to merge in the changes."),
    (
        ErrorKind::MergeConflicts,
        r"(Merge conflict|Automatic merge failed; fix conflicts and then commit the result.)",
    ),
    (
        ErrorKind::HTTPSRepositoryNotFound,
        r"fatal: repository '(.+)' not found",
    ),
    (
        ErrorKind::PushNotFastForward,
        r"\((non-fast-forward|fetch first)\)\nerror: failed to push some refs to '.*'",
    ),
    (
        ErrorKind::BranchDeletionFailed,
        r"error: unable to delete '(.+)': remote ref does not exist",
    ),
    (
        ErrorKind::DefaultBranchDeletionFailed,
        r"\[remote rejected\] (.+) \(deletion of the current branch prohibited\)",
    ),
    (
        ErrorKind::RevertConflicts,
        r"error: could not revert .*\nhint: [Aa]fter resolving the conflicts",
    ),
    (
        ErrorKind::EmptyRebasePatch,
        r"Applying: .*\nNo changes - did you forget to use 'git add'\?\nIf there is nothing left to stage, chances are that something else\n.*",
    ),
    (
        ErrorKind::NoMatchingRemoteBranch,
        r"There are no candidates for (rebasing|merging) among the refs that you just fetched.\nGenerally this means that you provided a wildcard refspec which had no\nmatches on the remote end.",
    ),
    (
        ErrorKind::NoExistingRemoteBranch,
        r"Your configuration specifies to merge with the ref '(.+)'\nfrom the remote, but no such ref was fetched.",
    ),
    (ErrorKind::NothingToCommit, r"nothing to commit"),
    (
        ErrorKind::NoSubmoduleMapping,
        r"[Nn]o submodule mapping found in .gitmodules for path '(.+)'",
    ),
    (
        ErrorKind::SubmoduleRepositoryDoesNotExist,
        r"fatal: repository '(.+)' does not exist\nfatal: clone of '.+' into submodule path '(.+)' failed",
    ),
    (
        ErrorKind::InvalidSubmoduleSHA,
        r"Fetched in submodule path '(.+)', but it did not contain (.+). Direct fetching of that commit failed.",
    ),
    (
        ErrorKind::LocalPermissionDenied,
        r"fatal: could not create work tree dir '(.+)'.*: Permission denied",
    ),
    (
        ErrorKind::InvalidMerge,
        r"merge: (.+) - not something we can merge",
    ),
    (ErrorKind::InvalidRebase, r"invalid upstream (.+)"),
    (
        ErrorKind::NonFastForwardMergeIntoEmptyHead,
        r"fatal: Non-fast-forward commit does not make sense into an empty head",
    ),
    (
        ErrorKind::PatchDoesNotApply,
        r"error: (.+): (patch does not apply|already exists in working directory)",
    ),
    (
        ErrorKind::BranchAlreadyExists,
        r"fatal: [Aa] branch named '(.+)' already exists.?",
    ),
    (ErrorKind::BranchNotFound, r"error: branch '(.+)' not found"),
    (ErrorKind::BadRevision, r"fatal: bad revision '(.*)'"),
    (
        ErrorKind::NotAGitRepository,
        r"fatal: [Nn]ot a git repository \(or any of the parent directories\): (.*)",
    ),
    (
        ErrorKind::CannotMergeUnrelatedHistories,
        r"fatal: refusing to merge unrelated histories",
    ),
    (
        ErrorKind::LFSAttributeDoesNotMatch,
        r"The .+ attribute should be .+ but is .+",
    ),
    (ErrorKind::BranchRenameFailed, r"fatal: Branch rename failed"),
    (
        ErrorKind::PathDoesNotExist,
        r"fatal: path '(.+)' does not exist .+",
    ),
    (
        ErrorKind::InvalidObjectName,
        r"fatal: invalid object name '(.+)'.",
    ),
    (
        ErrorKind::OutsideRepository,
        r"fatal: .+: '(.+)' is outside repository",
    ),
    (
        ErrorKind::LockFileAlreadyExists,
        r"Another git process seems to be running in this repository, e.g.",
    ),
    (ErrorKind::NoMergeToAbort, r"fatal: There is no merge to abort"),
    (
        ErrorKind::LocalChangesOverwritten,
        r"error: (?:Your local changes to the following|The following untracked working tree) files would be overwritten by checkout:",
    ),
    (
        ErrorKind::UnresolvedConflicts,
        r"You must edit all merge conflicts and then\nmark them as resolved using git add|fatal: Exiting because of an unresolved conflict.",
    ),
    (
        ErrorKind::GPGFailedToSignData,
        r"error: gpg failed to sign the data",
    ),
    (
        ErrorKind::ConflictModifyDeletedInBranch,
        r"CONFLICT \(modify/delete\): (.+) deleted in (.+) and modified in (.+)",
    ),
    // GitHub push rules
    (ErrorKind::PushWithFileSizeExceedingLimit, r"error: GH001: "),
    (ErrorKind::HexBranchNameRejected, r"error: GH002: "),
    (
        ErrorKind::ForcePushRejected,
        r"error: GH003: Sorry, force-pushing to (.+) is not allowed.",
    ),
    (
        ErrorKind::InvalidRefLength,
        r"error: GH005: Sorry, refs longer than (.+) bytes are not allowed",
    ),
    (
        ErrorKind::ProtectedBranchRequiresReview,
        r"error: GH006: Protected branch update failed for (.+)\nremote: error: At least one approved review is required",
    ),
    (
        ErrorKind::ProtectedBranchForcePush,
        r"error: GH006: Protected branch update failed for (.+)\nremote: error: Cannot force-push to a protected branch",
    ),
    (
        ErrorKind::ProtectedBranchDeleteRejected,
        r"error: GH006: Protected branch update failed for (.+)\nremote: error: Cannot delete a protected branch",
    ),
    (
        ErrorKind::ProtectedBranchRequiredStatus,
        r#"error: GH006: Protected branch update failed for (.+).\nremote: error: Required status check "(.+)" is expected"#,
    ),
    (
        ErrorKind::PushWithPrivateEmail,
        r"error: GH007: Your push would publish a private email address.",
    ),
    (
        ErrorKind::ConfigLockFileAlreadyExists,
        r"error: could not lock config file (.+): File exists",
    ),
    (
        ErrorKind::RemoteAlreadyExists,
        r"error: remote (.+) already exists.",
    ),
    (ErrorKind::TagAlreadyExists, r"fatal: tag '(.+)' already exists"),
    (
        ErrorKind::MergeWithLocalChanges,
        r"error: Your local changes to the following files would be overwritten by merge:\n",
    ),
    (
        ErrorKind::RebaseWithLocalChanges,
        r"error: cannot (pull with rebase|rebase): You have unstaged changes\.\n\s*error: [Pp]lease commit or stash them\.",
    ),
    (
        ErrorKind::MergeCommitNoMainlineOption,
        r"error: commit (.+) is a merge but no -m option was given",
    ),
    (
        ErrorKind::UnsafeDirectory,
        r"fatal: detected dubious ownership in repository at",
    ),
    (
        ErrorKind::PathExistsButNotInRef,
        r"fatal: path '(.+)' exists on disk, but not in '(.+)'",
    ),
];

static BUILTIN: LazyLock<ErrorClassifier> = LazyLock::new(|| {
    ErrorClassifier::from_table(BUILTIN_PATTERNS).expect("BUILTIN_PATTERNS are valid regexes")
});

/// One entry of a classification table.
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    kind: ErrorKind,
    regex: Regex,
}

impl ErrorPattern {
    /// Compile a pattern for `kind`.
    pub fn new(kind: ErrorKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
        })
    }

    /// The kind reported when this pattern matches.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The regex source this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the pattern matches anywhere in `stderr`.
    pub fn is_match(&self, stderr: &str) -> bool {
        self.regex.is_match(stderr)
    }
}

/// An ordered table of [`ErrorPattern`]s where the first match wins.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    patterns: Vec<ErrorPattern>,
}

impl ErrorClassifier {
    /// Build a classifier from already compiled patterns, keeping their order.
    pub fn new(patterns: Vec<ErrorPattern>) -> Self {
        Self { patterns }
    }

    /// Compile a `(kind, regex)` table, keeping its order.
    pub fn from_table(table: &[(ErrorKind, &str)]) -> Result<Self, regex::Error> {
        let patterns = table
            .iter()
            .map(|(kind, pattern)| ErrorPattern::new(*kind, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(patterns))
    }

    /// The shared classifier compiled from [`BUILTIN_PATTERNS`].
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// The patterns in evaluation order.
    pub fn patterns(&self) -> &[ErrorPattern] {
        &self.patterns
    }

    /// Return the kind of the first pattern matching `stderr`, or `None` when
    /// the text is unclassified.
    pub fn parse_error(&self, stderr: &str) -> Option<ErrorKind> {
        self.patterns
            .iter()
            .find(|p| p.is_match(stderr))
            .map(ErrorPattern::kind)
    }

    /// Classify the stderr of a finished invocation.
    ///
    /// The exit code is not consulted: a non-zero exit with empty stderr is
    /// unclassified, and callers that care about that case check
    /// [`ExecutionResult::exit_code`] themselves.
    pub fn parse_error_from_result(&self, result: &ExecutionResult) -> Option<ErrorKind> {
        self.parse_error(result.stderr())
    }

    /// Every kind whose pattern matches `stderr`, in table order.
    pub fn matching_kinds<'a>(&'a self, stderr: &'a str) -> impl Iterator<Item = ErrorKind> + 'a {
        self.patterns
            .iter()
            .filter(move |p| p.is_match(stderr))
            .map(ErrorPattern::kind)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Classify `stderr` with the built-in table.
pub fn parse_error(stderr: &str) -> Option<ErrorKind> {
    ErrorClassifier::builtin().parse_error(stderr)
}

/// Classify the stderr of `result` with the built-in table.
pub fn parse_error_from_result(result: &ExecutionResult) -> Option<ErrorKind> {
    ErrorClassifier::builtin().parse_error_from_result(result)
}
