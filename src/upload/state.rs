//! Upload lifecycle phases and server state classification.

use std::fmt;

use crate::graph::ContentFile;

/// Upload state reported once the storage URI has been issued
pub const STORAGE_READY_TAG: &str = "azureStorageUriRequestSuccess";

/// Upload state reported once the file commit has been processed
pub const FILE_COMMITTED_TAG: &str = "commitFileSuccess";

/// Where a session is in the upload lifecycle.
///
/// Phases only move forward. `Uploading` and `Finalized` are local; the
/// rest mirror states the backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadPhase {
    /// Content file created, storage URI not yet issued
    Provisioning,
    /// Storage URI issued
    StorageReady,
    /// Blocks in flight
    Uploading,
    /// Block list committed to storage
    Finalized,
    /// File commit submitted, waiting on the backend
    FileCommitting,
    /// Backend confirmed the file commit
    FileCommitted,
    /// Application points at this content version
    VersionCommitted,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadPhase::Provisioning => "provisioning",
            UploadPhase::StorageReady => "storage ready",
            UploadPhase::Uploading => "uploading",
            UploadPhase::Finalized => "finalized",
            UploadPhase::FileCommitting => "file committing",
            UploadPhase::FileCommitted => "file committed",
            UploadPhase::VersionCommitted => "version committed",
        };
        f.write_str(name)
    }
}

/// Coarse meaning of a server upload state tag, by suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// Ends in `Success`
    Success,
    /// Ends in `Failed`
    Failed,
    /// Ends in `TimedOut`
    TimedOut,
    /// Anything else; the backend is still working
    Pending,
}

impl StateClass {
    /// Classify a tag such as `commitFileFailed`.
    pub fn of(tag: &str) -> Self {
        if tag.ends_with("Success") {
            StateClass::Success
        } else if tag.ends_with("Failed") {
            StateClass::Failed
        } else if tag.ends_with("TimedOut") {
            StateClass::TimedOut
        } else {
            StateClass::Pending
        }
    }
}

/// A server state the session waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTarget {
    /// Human-readable name for logs and errors
    pub name: &'static str,
    /// Exact tag that satisfies the wait
    pub tag: &'static str,
    /// Also require a non-empty storage URI
    pub requires_storage_uri: bool,
}

impl StateTarget {
    /// Storage URI issued and present
    pub const STORAGE_READY: StateTarget = StateTarget {
        name: "storage ready",
        tag: STORAGE_READY_TAG,
        requires_storage_uri: true,
    };

    /// File commit confirmed
    pub const FILE_COMMITTED: StateTarget = StateTarget {
        name: "file committed",
        tag: FILE_COMMITTED_TAG,
        requires_storage_uri: false,
    };

    /// Whether `file` is in this state.
    pub fn is_satisfied(&self, file: &ContentFile) -> bool {
        file.upload_state == self.tag && (!self.requires_storage_uri || file.storage_uri().is_some())
    }
}
