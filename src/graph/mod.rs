//! Management API seam.
//!
//! The upload pipeline depends only on [`ManagementApi`]; [`GraphClient`] is
//! the HTTP implementation. Token acquisition is the caller's concern.

mod client;
mod types;

pub use client::GraphClient;
pub use types::{
    CONTENT_FILE_ODATA_TYPE, CommittedVersionPatch, ContentFile, ContentFileHandle,
    ContentFileRequest, ContentVersionRef, FileEncryptionInfo, ResourceRef,
};

use async_trait::async_trait;

use crate::archive::EncryptionInfo;
use crate::draft::Win32LobApp;
use crate::error::ApiError;

/// Calls the pipeline makes against the device-management backend
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Create the application resource; returns its reference.
    async fn create_application(&self, draft: &Win32LobApp) -> Result<ResourceRef, ApiError>;

    /// Create a content version under an application.
    async fn create_content_version(&self, app_id: &str) -> Result<ContentVersionRef, ApiError>;

    /// Create the content file record for a payload.
    async fn create_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        request: &ContentFileRequest,
    ) -> Result<ContentFile, ApiError>;

    /// Fetch the current server view of a content file.
    async fn get_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        file_id: &str,
    ) -> Result<ContentFile, ApiError>;

    /// Ask the backend to extend the storage URI's lifetime.
    async fn renew_content_file_upload(
        &self,
        app_id: &str,
        version_id: &str,
        file_id: &str,
    ) -> Result<(), ApiError>;

    /// Bind encryption parameters to the uploaded blob.
    async fn commit_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        file_id: &str,
        encryption: &EncryptionInfo,
    ) -> Result<(), ApiError>;

    /// Point the application at a committed content version.
    async fn patch_application_committed_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> Result<(), ApiError>;
}
