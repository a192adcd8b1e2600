//! Error types for intunewin_publisher operations.
//!
//! Each pipeline stage owns an error enum; `PublishError` wraps them so callers
//! can match on the stage that failed and ask for recovery suggestions.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for intunewin_publisher operations
pub type Result<T> = std::result::Result<T, PublishError>;

/// Main error type for all publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    /// Package archive errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Manifest-to-resource mapping errors
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Upload session errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Management API errors outside of an upload session
    #[error("Management API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while reading a package archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive could not be opened as a zip container
    #[error("Failed to open package archive: {source}")]
    ArchiveOpen {
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// No entry name ends with the manifest suffix
    #[error("No manifest entry ending in '{suffix}' found in package archive")]
    ManifestNotFound {
        /// Suffix that was searched for
        suffix: &'static str,
    },

    /// The manifest entry could not be decompressed
    #[error("Failed to read manifest entry '{entry}': {reason}")]
    ManifestRead {
        /// Entry name
        entry: String,
        /// Reason for the error
        reason: String,
    },

    /// The manifest is not well-formed XML or has an unexpected shape
    #[error("Failed to parse manifest entry '{entry}': {source}")]
    ManifestParse {
        /// Entry name
        entry: String,
        /// XML deserialization error
        #[source]
        source: quick_xml::DeError,
    },

    /// The manifest names a payload that is not in the archive
    #[error("Payload '{file_name}' declared by the manifest is missing from the archive")]
    PayloadNotFound {
        /// File name declared by the manifest
        file_name: String,
    },

    /// The payload entry could not be decompressed
    #[error("Failed to read payload entry '{entry}': {reason}")]
    PayloadRead {
        /// Entry name
        entry: String,
        /// Reason for the error
        reason: String,
    },

    /// The archive file could not be opened from disk
    #[error("Failed to open {path}: {source}")]
    Io {
        /// Path that was opened
        path: PathBuf,
        /// IO error
        #[source]
        source: std::io::Error,
    },

    /// The blocking reader task panicked or was cancelled
    #[error("Archive reader task for {path} did not complete: {reason}")]
    ReaderTask {
        /// Archive path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Errors raised while mapping a descriptor to an application draft
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// A manifest field required by the draft is empty
    #[error("Manifest field '{field}' is required but empty")]
    MissingField {
        /// Manifest element name
        field: &'static str,
    },
}

/// Block storage transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be built or sent
    #[error("Storage request failed: {source}")]
    Request {
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },

    /// Storage answered with a non-success status
    #[error("Storage returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The response body could not be read to completion
    #[error("Failed to read storage response: {source}")]
    Body {
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },
}

/// Management API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be sent
    #[error("Request to {resource} failed: {source}")]
    Request {
        /// Resource path
        resource: String,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("{method} {resource} returned HTTP {status}: {body}")]
    Status {
        /// HTTP method
        method: &'static str,
        /// Resource path
        resource: String,
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// The response body was not the expected JSON shape
    #[error("Failed to decode response from {resource}: {source}")]
    Decode {
        /// Resource path
        resource: String,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized
    #[error("Failed to encode request for {resource}: {source}")]
    Encode {
        /// Resource path
        resource: String,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Whether repeating the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Request { .. } => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Decode { .. } | ApiError::Encode { .. } => false,
        }
    }
}

/// A single block that failed to transfer
#[derive(Debug)]
pub struct BlockFailure {
    /// Zero-based block sequence index
    pub index: usize,
    /// Transport error for this block
    pub error: TransportError,
}

/// Upload session errors
#[derive(Error, Debug)]
pub enum UploadError {
    /// The storage URI was not issued within the poll timeout
    #[error("Storage URI was not ready after {}s", .waited.as_secs())]
    StorageReadyTimeout {
        /// Time spent waiting
        waited: Duration,
    },

    /// The content file was not committed within the poll timeout
    #[error("Content file was not committed after {}s", .waited.as_secs())]
    FileCommittedTimeout {
        /// Time spent waiting
        waited: Duration,
    },

    /// The backend reported a success state other than the one awaited
    #[error("Unexpected upload state '{state}' while waiting for {awaiting}")]
    UnexpectedSuccessState {
        /// State tag reported by the backend
        state: String,
        /// Name of the awaited state
        awaiting: &'static str,
    },

    /// The backend reported a terminal failure
    #[error("Upload entered failed state '{state}'")]
    UploadFailedState {
        /// State tag reported by the backend
        state: String,
    },

    /// The backend reported a server-side timeout
    #[error("Upload entered timed-out state '{state}'")]
    UploadTimedOutState {
        /// State tag reported by the backend
        state: String,
    },

    /// One or more blocks failed to transfer
    #[error("{} of {attempted} block uploads failed: {}", .failures.len(), describe_failures(.failures))]
    BlocksFailed {
        /// Number of blocks attempted
        attempted: usize,
        /// Per-block failures in ascending block order
        failures: Vec<BlockFailure>,
    },

    /// Storage URI renewal failed
    #[error("Failed to renew storage URI: {source}")]
    Renewal {
        /// Management API error
        #[source]
        source: ApiError,
    },

    /// The block list could not be committed to storage
    #[error("Failed to finalize block list: {source}")]
    Finalize {
        /// Transport error
        #[source]
        source: TransportError,
    },

    /// The file commit call failed
    #[error("Failed to commit content file: {source}")]
    Commit {
        /// Management API error
        #[source]
        source: ApiError,
    },

    /// The committed-content-version update failed
    #[error("Failed to commit content version: {source}")]
    VersionCommit {
        /// Management API error
        #[source]
        source: ApiError,
    },

    /// Re-fetching the content file failed
    #[error("Failed to refresh content file: {source}")]
    Refresh {
        /// Management API error
        #[source]
        source: ApiError,
    },

    /// The descriptor carries no payload bytes
    #[error("Package descriptor was read without payload bytes")]
    MissingPayload,

    /// The payload is empty
    #[error("Payload is empty")]
    EmptyPayload,

    /// The payload needs more blocks than block identifiers can address
    #[error("Payload needs {blocks} blocks; at most {max} are addressable")]
    TooManyBlocks {
        /// Blocks required
        blocks: usize,
        /// Maximum addressable blocks
        max: usize,
    },

    /// The caller cancelled the session
    #[error("Upload cancelled")]
    Cancelled,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A setting is out of its valid range
    #[error("Invalid setting '{setting}': {reason}")]
    Invalid {
        /// Setting name
        setting: &'static str,
        /// Reason for the error
        reason: String,
    },

    /// A required setting is absent
    #[error("Missing required setting: {setting}")]
    Missing {
        /// Setting name
        setting: &'static str,
    },
}

fn describe_failures(failures: &[BlockFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("block {}: {}", f.index, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl PublishError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PublishError::Archive(ArchiveError::ManifestNotFound { .. }) => vec![
                "Verify the file was produced by the Win32 content prep tool".to_string(),
                "Re-package the installer and try again".to_string(),
            ],
            PublishError::Descriptor(DescriptorError::MissingField { field }) => vec![
                format!("Check that the package manifest contains a non-empty <{field}> element"),
            ],
            PublishError::Upload(UploadError::StorageReadyTimeout { .. })
            | PublishError::Upload(UploadError::FileCommittedTimeout { .. }) => vec![
                "The backend is provisioning slowly; retry the publish".to_string(),
                "Increase INTUNEWIN_POLL_TIMEOUT_SECS".to_string(),
            ],
            PublishError::Upload(UploadError::UploadFailedState { .. })
            | PublishError::Upload(UploadError::UploadTimedOutState { .. })
            | PublishError::Upload(UploadError::UnexpectedSuccessState { .. }) => vec![
                "Re-run the pipeline; it creates a fresh content version".to_string(),
            ],
            PublishError::Upload(UploadError::BlocksFailed { .. }) => vec![
                "Check network connectivity to blob storage".to_string(),
                "Lower INTUNEWIN_MAX_CONCURRENT_BLOCKS on constrained links".to_string(),
            ],
            PublishError::Api(ApiError::Status { status: 401, .. })
            | PublishError::Api(ApiError::Status { status: 403, .. }) => vec![
                "Verify the access token is valid and carries app management permissions"
                    .to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if re-invoking the pipeline may succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PublishError::Archive(_)
                | PublishError::Descriptor(_)
                | PublishError::Config(_)
                | PublishError::Upload(UploadError::MissingPayload)
                | PublishError::Upload(UploadError::EmptyPayload)
                | PublishError::Upload(UploadError::TooManyBlocks { .. })
                | PublishError::Upload(UploadError::Cancelled)
        )
    }
}
