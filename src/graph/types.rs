//! Management API wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::archive::{EncryptionInfo, PackageDescriptor};
use crate::draft::WIN32_LOB_APP_ODATA_TYPE;

/// OData type of a content file
pub const CONTENT_FILE_ODATA_TYPE: &str = "#microsoft.graph.mobileAppContentFile";

/// Minimal reference returned by create calls (`@odata.type`, `@odata.context`, `id`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource type, when the backend reports one
    #[serde(rename = "@odata.type", default, skip_serializing_if = "Option::is_none")]
    pub odata_type: Option<String>,
    /// Metadata URL of the response
    #[serde(rename = "@odata.context", default, skip_serializing_if = "Option::is_none")]
    pub odata_context: Option<String>,
    /// Server-assigned identifier
    #[serde(default)]
    pub id: String,
}

/// Identifier of a server-side content version
pub type ContentVersionRef = ResourceRef;

/// Server-side record tracking one payload's upload lifecycle.
///
/// The backend owns this state; a local copy is only as fresh as its last fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentFile {
    /// Server-assigned identifier
    pub id: String,
    /// SAS URI for block uploads; absent until storage is provisioned
    pub azure_storage_uri: Option<String>,
    /// When the current storage URI stops being accepted
    pub azure_storage_uri_expiration_date_time: Option<DateTime<Utc>>,
    /// Whether the file commit has completed
    pub is_committed: bool,
    /// Creation time
    pub created_date_time: Option<DateTime<Utc>>,
    /// File name
    pub name: Option<String>,
    /// Unencrypted size in bytes
    pub size: Option<u64>,
    /// Encrypted size in bytes
    pub size_encrypted: Option<u64>,
    /// Optional manifest blob (base64)
    pub manifest: Option<String>,
    /// Upload state tag reported by the backend
    pub upload_state: String,
    /// Framework file flag
    pub is_framework_file: bool,
    /// Dependency file flag
    pub is_dependency: bool,
}

impl ContentFile {
    /// Storage URI when one has been issued
    pub fn storage_uri(&self) -> Option<&str> {
        self.azure_storage_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

/// Body of the content-file create call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFileRequest {
    /// Always [`CONTENT_FILE_ODATA_TYPE`]
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    /// Payload file name
    pub name: String,
    /// Unencrypted size in bytes
    pub size: u64,
    /// Encrypted size in bytes
    pub size_encrypted: u64,
    /// Optional manifest blob
    pub manifest: Option<String>,
    /// Dependency file flag
    pub is_dependency: bool,
}

impl ContentFileRequest {
    /// Request describing the encrypted payload of a package.
    pub fn for_package(descriptor: &PackageDescriptor) -> Self {
        Self {
            odata_type: CONTENT_FILE_ODATA_TYPE.to_string(),
            name: descriptor.file_name().to_string(),
            size: descriptor.unencrypted_size(),
            size_encrypted: descriptor.encrypted_size(),
            manifest: None,
            is_dependency: false,
        }
    }
}

/// Body of the file commit call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEncryptionInfo {
    /// Parameters needed to decrypt the committed payload
    pub file_encryption_info: EncryptionInfo,
}

impl FileEncryptionInfo {
    /// Wrap encryption parameters, defaulting an empty profile identifier.
    pub fn new(info: &EncryptionInfo) -> Self {
        Self {
            file_encryption_info: info.with_default_profile(),
        }
    }
}

/// Partial update pointing an app at its committed content version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedVersionPatch {
    /// Type of the patched app
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    /// Content version to mark as committed
    pub committed_content_version: String,
}

impl CommittedVersionPatch {
    /// Patch for a Win32 app
    pub fn new(content_version_id: impl Into<String>) -> Self {
        Self {
            odata_type: WIN32_LOB_APP_ODATA_TYPE.to_string(),
            committed_content_version: content_version_id.into(),
        }
    }
}

/// A content file together with the app and content version that own it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFileHandle {
    /// Owning application
    pub app_id: String,
    /// Owning content version
    pub content_version_id: String,
    /// Last known server view of the file
    pub file: ContentFile,
}

impl ContentFileHandle {
    /// Bundle a file with its owners.
    pub fn new(
        app_id: impl Into<String>,
        content_version_id: impl Into<String>,
        file: ContentFile,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            content_version_id: content_version_id.into(),
            file,
        }
    }

    /// Content file identifier
    pub fn file_id(&self) -> &str {
        &self.file.id
    }
}
