//! Semantic categories for failed git invocations.
//!
//! Every variant carries a stable identifier (its PascalCase name) that is
//! used for `Display`, `FromStr`, and serde. Identifiers are never reused or
//! renamed; new kinds are only ever appended.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! error_kinds {
    ($($(#[doc = $doc:literal])* $variant:ident,)+) => {
        /// Why a git invocation failed, independent of the exact wording of
        /// its error text.
        ///
        /// Deliberately not `#[non_exhaustive]`: adding a kind should break
        /// exhaustive matches in consuming code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ErrorKind {
            $($(#[doc = $doc])* $variant,)+
        }

        impl ErrorKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [ErrorKind] = &[$(ErrorKind::$variant,)+];

            /// The stable identifier of this kind.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(ErrorKind::$variant => stringify!($variant),)+
                }
            }
        }

        impl FromStr for ErrorKind {
            type Err = UnknownErrorKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(ErrorKind::$variant),)+
                    _ => Err(UnknownErrorKind(s.to_string())),
                }
            }
        }
    };
}

error_kinds! {
    /// An SSH key failed the host's key audit policy.
    SSHKeyAuditUnverified,
    /// SSH authentication was rejected.
    SSHAuthenticationFailed,
    /// The SSH remote refused access.
    SSHPermissionDenied,
    /// HTTPS credentials were missing or rejected.
    HTTPSAuthenticationFailed,
    /// The remote closed the connection unexpectedly.
    RemoteDisconnection,
    /// The remote host could not be reached or resolved.
    HostDown,
    /// A rebase stopped on conflicts.
    RebaseConflicts,
    /// A merge stopped on conflicts.
    MergeConflicts,
    /// The HTTPS remote reported the repository does not exist.
    HTTPSRepositoryNotFound,
    /// The SSH remote reported the repository does not exist.
    SSHRepositoryNotFound,
    /// A push was rejected because it is not a fast-forward.
    PushNotFastForward,
    /// Deleting a remote branch failed because it does not exist.
    BranchDeletionFailed,
    /// The remote refused to delete its default branch.
    DefaultBranchDeletionFailed,
    /// A revert stopped on conflicts.
    RevertConflicts,
    /// A rebase produced an empty patch.
    EmptyRebasePatch,
    /// No remote branch matched the wildcard refspec.
    NoMatchingRemoteBranch,
    /// The configured upstream ref was not fetched.
    NoExistingRemoteBranch,
    /// There was nothing to commit.
    NothingToCommit,
    /// A submodule path has no entry in `.gitmodules`.
    NoSubmoduleMapping,
    /// A submodule's repository does not exist.
    SubmoduleRepositoryDoesNotExist,
    /// A submodule points at a commit the remote does not have.
    InvalidSubmoduleSHA,
    /// The working tree directory could not be created.
    LocalPermissionDenied,
    /// The merge target is not something git can merge.
    InvalidMerge,
    /// The rebase upstream is invalid.
    InvalidRebase,
    /// A non-fast-forward merge was attempted into an empty HEAD.
    NonFastForwardMergeIntoEmptyHead,
    /// A patch could not be applied.
    PatchDoesNotApply,
    /// A branch with the requested name already exists.
    BranchAlreadyExists,
    /// The requested branch does not exist.
    BranchNotFound,
    /// A revision could not be resolved.
    BadRevision,
    /// The working directory is not inside a git repository.
    NotAGitRepository,
    /// The merge was refused because the histories are unrelated.
    CannotMergeUnrelatedHistories,
    /// A Git LFS attribute has an unexpected value.
    LFSAttributeDoesNotMatch,
    /// Renaming a branch failed.
    BranchRenameFailed,
    /// A path does not exist in the requested revision.
    PathDoesNotExist,
    /// An object name could not be resolved.
    InvalidObjectName,
    /// A path lies outside the repository.
    OutsideRepository,
    /// Another git process holds the repository lock.
    LockFileAlreadyExists,
    /// There is no merge in progress to abort.
    NoMergeToAbort,
    /// Local changes would be overwritten by checkout.
    LocalChangesOverwritten,
    /// Unresolved conflicts block the operation.
    UnresolvedConflicts,
    /// GPG failed to sign the commit or tag.
    GPGFailedToSignData,
    /// A file was modified on one side and deleted on the other.
    ConflictModifyDeletedInBranch,
    /// GitHub rejected a push containing a file over the size limit (GH001).
    PushWithFileSizeExceedingLimit,
    /// GitHub rejected a branch name that looks like a commit hash (GH002).
    HexBranchNameRejected,
    /// GitHub rejected a force push (GH003).
    ForcePushRejected,
    /// GitHub rejected a ref name that is too long (GH005).
    InvalidRefLength,
    /// A protected branch requires an approved review (GH006).
    ProtectedBranchRequiresReview,
    /// A protected branch refused a force push (GH006).
    ProtectedBranchForcePush,
    /// A protected branch refused deletion (GH006).
    ProtectedBranchDeleteRejected,
    /// A protected branch requires a passing status check (GH006).
    ProtectedBranchRequiredStatus,
    /// GitHub rejected a push that would publish a private email (GH007).
    PushWithPrivateEmail,
    /// Another process holds the config file lock.
    ConfigLockFileAlreadyExists,
    /// A remote with the requested name already exists.
    RemoteAlreadyExists,
    /// A tag with the requested name already exists.
    TagAlreadyExists,
    /// A merge was refused because of local changes.
    MergeWithLocalChanges,
    /// A rebase was refused because of unstaged changes.
    RebaseWithLocalChanges,
    /// A merge commit was cherry-picked or reverted without `-m`.
    MergeCommitNoMainlineOption,
    /// The repository is owned by someone else (`safe.directory`).
    UnsafeDirectory,
    /// A path exists on disk but not in the requested revision.
    PathExistsButNotInRef,
}

impl ErrorKind {
    /// Whether this kind means the remote rejected or never received credentials.
    pub fn is_authentication(self) -> bool {
        matches!(
            self,
            Self::SSHKeyAuditUnverified
                | Self::SSHAuthenticationFailed
                | Self::SSHPermissionDenied
                | Self::HTTPSAuthenticationFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an identifier that names no [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown git error kind: {0}")]
pub struct UnknownErrorKind(pub String);
