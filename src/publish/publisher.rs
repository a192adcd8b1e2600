//! End-to-end package publishing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::archive::{PackageDescriptor, read_package_file};
use crate::config::{GraphConfig, UploadConfig};
use crate::draft::{DraftBuilder, DraftDefaults, Win32LobApp};
use crate::error::{ArchiveError, Result, UploadError};
use crate::graph::{ContentFile, ContentFileHandle, ContentFileRequest, GraphClient, ManagementApi};
use crate::upload::{AzureBlobTransport, BlockTransport, UploadReport, UploadSession};

/// Identifiers and final state of a published package
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// Created application
    pub app_id: String,
    /// Committed content version
    pub content_version_id: String,
    /// Content file as last reported by the backend
    pub file: ContentFile,
    /// Blocks transferred
    pub blocks: usize,
    /// Storage URI renewals performed during transfer
    pub renewals: usize,
}

/// Runs the pipeline from package archive to committed content version
pub struct Publisher {
    api: Arc<dyn ManagementApi>,
    transport: Arc<dyn BlockTransport>,
    upload: UploadConfig,
    drafts: DraftBuilder,
    cancel: CancellationToken,
}

impl Publisher {
    /// Create a publisher over explicit collaborators.
    pub fn new(
        api: Arc<dyn ManagementApi>,
        transport: Arc<dyn BlockTransport>,
        upload: UploadConfig,
    ) -> Result<Self> {
        upload.validate()?;
        Ok(Self {
            api,
            transport,
            upload,
            drafts: DraftBuilder::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Create a publisher talking HTTPS to the management API and blob storage.
    pub fn connect(graph: &GraphConfig, upload: UploadConfig) -> Result<Self> {
        let api = GraphClient::new(graph)?;
        let transport = AzureBlobTransport::new(graph.transfer_timeout)?;
        Self::new(Arc::new(api), Arc::new(transport), upload)
    }

    /// Use custom draft defaults
    pub fn with_draft_defaults(mut self, defaults: DraftDefaults) -> Self {
        self.drafts = DraftBuilder::new(defaults);
        self
    }

    /// Cancel uploads when `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Read an archive's manifest and map it to an application draft.
    ///
    /// The payload is not loaded.
    pub fn build_descriptor_from_archive(&self, path: impl AsRef<Path>) -> Result<Win32LobApp> {
        let descriptor = read_package_file(path, false)?;
        Ok(self.drafts.build(&descriptor)?)
    }

    /// Upload an archive's payload into an existing content file and commit it.
    pub async fn upload_package(
        &self,
        path: impl AsRef<Path>,
        handle: ContentFileHandle,
    ) -> Result<UploadReport> {
        let descriptor = read_in_background(path.as_ref(), true).await?;
        let payload = descriptor
            .payload()
            .cloned()
            .ok_or(UploadError::MissingPayload)?;

        let session = UploadSession::new(
            Arc::clone(&self.api),
            Arc::clone(&self.transport),
            self.upload.clone(),
            handle,
        )?
        .with_cancellation(self.cancel.clone());

        Ok(session.run(payload, descriptor.encryption()).await?)
    }

    /// Create the application, its content version and content file, then
    /// upload and commit the payload.
    pub async fn publish(&self, path: impl AsRef<Path>) -> Result<PublishReport> {
        let path = path.as_ref();
        let descriptor = read_in_background(path, false).await?;
        let draft = self.drafts.build(&descriptor)?;

        let app = self.api.create_application(&draft).await?;
        log::info!("Created application '{}' ({})", draft.display_name, app.id);

        let version = self.api.create_content_version(&app.id).await?;
        log::info!("Created content version {} for application {}", version.id, app.id);

        let request = ContentFileRequest::for_package(&descriptor);
        let file = self
            .api
            .create_content_file(&app.id, &version.id, &request)
            .await?;
        log::info!("Created content file {} ({} bytes encrypted)", file.id, request.size_encrypted);

        let handle = ContentFileHandle::new(app.id.clone(), version.id.clone(), file);
        let report = self.upload_package(path, handle).await?;

        Ok(PublishReport {
            app_id: app.id,
            content_version_id: version.id,
            file: report.file,
            blocks: report.blocks,
            renewals: report.renewals,
        })
    }
}

/// Read a package on the blocking pool; payloads can be large.
async fn read_in_background(path: &Path, include_payload: bool) -> Result<PackageDescriptor> {
    let owned: PathBuf = path.to_path_buf();
    let descriptor = tokio::task::spawn_blocking(move || read_package_file(owned, include_payload))
        .await
        .map_err(|e| ArchiveError::ReaderTask {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })??;
    Ok(descriptor)
}
