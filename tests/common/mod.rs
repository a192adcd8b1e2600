//! In-memory collaborators and fixture archives shared by integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use intunewin_publisher::archive::EncryptionInfo;
use intunewin_publisher::draft::Win32LobApp;
use intunewin_publisher::error::{ApiError, TransportError};
use intunewin_publisher::graph::{
    ContentFile, ContentFileHandle, ContentFileRequest, ContentVersionRef, ManagementApi,
    ResourceRef,
};
use intunewin_publisher::upload::{BlockTransport, FILE_COMMITTED_TAG, STORAGE_READY_TAG};
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;

pub const APP_ID: &str = "app-1";
pub const VERSION_ID: &str = "1";
pub const FILE_ID: &str = "file-1";
pub const STORAGE_URI: &str = "https://acct.blob.core.windows.net/c/file-1.bin?sv=2020&sig=initial";

/// A call observed by [`FakeApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateApplication(String),
    CreateContentVersion(String),
    CreateContentFile(String, String, String),
    GetContentFile,
    Renew,
    Commit(EncryptionInfo),
    PatchVersion(String, String),
}

struct FakeState {
    calls: Vec<Call>,
    before_commit: VecDeque<String>,
    after_commit: VecDeque<String>,
    committed: bool,
    storage_uri: String,
    renewals: usize,
    renewal_status: Option<u16>,
    commit_status: Option<u16>,
    patch_status: Option<u16>,
}

/// Scripted management API.
///
/// `get_content_file` walks through the scripted states, repeating the last
/// one. The script switches once `commit_content_file` is called.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new(&[STORAGE_READY_TAG], &[FILE_COMMITTED_TAG])
    }
}

impl FakeApi {
    pub fn new(before_commit: &[&str], after_commit: &[&str]) -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                before_commit: before_commit.iter().map(|s| s.to_string()).collect(),
                after_commit: after_commit.iter().map(|s| s.to_string()).collect(),
                committed: false,
                storage_uri: STORAGE_URI.to_string(),
                renewals: 0,
                renewal_status: None,
                commit_status: None,
                patch_status: None,
            }),
        }
    }

    pub fn failing_renewal(self, status: u16) -> Self {
        self.state.lock().unwrap().renewal_status = Some(status);
        self
    }

    pub fn failing_commit(self, status: u16) -> Self {
        self.state.lock().unwrap().commit_status = Some(status);
        self
    }

    pub fn failing_version_patch(self, status: u16) -> Self {
        self.state.lock().unwrap().patch_status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    pub fn renewed_uri(n: usize) -> String {
        format!("https://acct.blob.core.windows.net/c/file-1.bin?sv=2020&sig=renewed{n}")
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn status_error(method: &'static str, resource: &str, status: u16) -> ApiError {
    ApiError::Status {
        method,
        resource: resource.to_string(),
        status,
        body: "scripted failure".to_string(),
    }
}

fn next_state(script: &mut VecDeque<String>) -> String {
    if script.len() > 1 {
        script.pop_front().unwrap_or_default()
    } else {
        script.front().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ManagementApi for FakeApi {
    async fn create_application(&self, draft: &Win32LobApp) -> Result<ResourceRef, ApiError> {
        self.record(Call::CreateApplication(draft.display_name.clone()));
        Ok(ResourceRef {
            id: APP_ID.to_string(),
            ..Default::default()
        })
    }

    async fn create_content_version(&self, app_id: &str) -> Result<ContentVersionRef, ApiError> {
        self.record(Call::CreateContentVersion(app_id.to_string()));
        Ok(ContentVersionRef {
            id: VERSION_ID.to_string(),
            ..Default::default()
        })
    }

    async fn create_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        request: &ContentFileRequest,
    ) -> Result<ContentFile, ApiError> {
        self.record(Call::CreateContentFile(
            app_id.to_string(),
            version_id.to_string(),
            request.name.clone(),
        ));
        Ok(pending_file())
    }

    async fn get_content_file(
        &self,
        _app_id: &str,
        _version_id: &str,
        file_id: &str,
    ) -> Result<ContentFile, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetContentFile);
        let upload_state = if state.committed {
            next_state(&mut state.after_commit)
        } else {
            next_state(&mut state.before_commit)
        };
        let issued = upload_state != "azureStorageUriRequestPending";
        Ok(ContentFile {
            id: file_id.to_string(),
            azure_storage_uri: issued.then(|| state.storage_uri.clone()),
            upload_state,
            is_committed: state.committed,
            ..Default::default()
        })
    }

    async fn renew_content_file_upload(
        &self,
        _app_id: &str,
        _version_id: &str,
        _file_id: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Renew);
        if let Some(status) = state.renewal_status {
            return Err(status_error("POST", "renewUpload", status));
        }
        state.renewals += 1;
        state.storage_uri = Self::renewed_uri(state.renewals);
        Ok(())
    }

    async fn commit_content_file(
        &self,
        _app_id: &str,
        _version_id: &str,
        _file_id: &str,
        encryption: &EncryptionInfo,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Commit(encryption.clone()));
        if let Some(status) = state.commit_status {
            return Err(status_error("POST", "commit", status));
        }
        state.committed = true;
        Ok(())
    }

    async fn patch_application_committed_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::PatchVersion(app_id.to_string(), version_id.to_string()));
        if let Some(status) = state.patch_status {
            return Err(status_error("PATCH", "mobileApps", status));
        }
        Ok(())
    }
}

/// Content file as returned by the create call
pub fn pending_file() -> ContentFile {
    ContentFile {
        id: FILE_ID.to_string(),
        upload_state: "azureStorageUriRequestPending".to_string(),
        ..Default::default()
    }
}

pub fn handle() -> ContentFileHandle {
    ContentFileHandle::new(APP_ID, VERSION_ID, pending_file())
}

/// One recorded block PUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub storage_uri: String,
    pub block_id: String,
    pub len: usize,
}

/// Block transport that records requests in completion order.
#[derive(Default)]
pub struct RecordingTransport {
    puts: Mutex<Vec<PutRecord>>,
    commits: Mutex<Vec<(String, Vec<String>)>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    started: Mutex<usize>,
    finalize_status: Option<u16>,
    cancel_on_finalize: Option<CancellationToken>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given block identifiers with HTTP 500
    pub fn failing(mut self, block_ids: impl IntoIterator<Item = String>) -> Self {
        self.failing.extend(block_ids);
        self
    }

    /// Hold a block for `delay` before completing it
    pub fn delayed(mut self, block_id: String, delay: Duration) -> Self {
        self.delays.insert(block_id, delay);
        self
    }

    /// Hold every block not otherwise delayed
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Reject the block list commit with `status`
    pub fn failing_finalize(mut self, status: u16) -> Self {
        self.finalize_status = Some(status);
        self
    }

    /// Cancel `token` once the block list has been committed
    pub fn cancelling_on_finalize(mut self, token: CancellationToken) -> Self {
        self.cancel_on_finalize = Some(token);
        self
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<(String, Vec<String>)> {
        self.commits.lock().unwrap().clone()
    }

    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }
}

#[async_trait]
impl BlockTransport for RecordingTransport {
    async fn put_block(
        &self,
        storage_uri: &str,
        block_id: &str,
        data: Bytes,
    ) -> Result<(), TransportError> {
        *self.started.lock().unwrap() += 1;
        let delay = self
            .delays
            .get(block_id)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.puts.lock().unwrap().push(PutRecord {
            storage_uri: storage_uri.to_string(),
            block_id: block_id.to_string(),
            len: data.len(),
        });
        if self.failing.contains(block_id) {
            return Err(TransportError::Status {
                status: 500,
                body: "InternalError".to_string(),
            });
        }
        Ok(())
    }

    async fn commit_block_list(
        &self,
        storage_uri: &str,
        block_ids: &[String],
    ) -> Result<(), TransportError> {
        self.commits
            .lock()
            .unwrap()
            .push((storage_uri.to_string(), block_ids.to_vec()));
        if let Some(status) = self.finalize_status {
            return Err(TransportError::Status {
                status,
                body: "AuthenticationFailed".to_string(),
            });
        }
        if let Some(token) = &self.cancel_on_finalize {
            token.cancel();
        }
        Ok(())
    }
}

pub const MSI_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ApplicationInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" ToolVersion="1.8.4.0">
  <Name>Contoso Agent</Name>
  <UnencryptedContentSize>4096</UnencryptedContentSize>
  <FileName>IntunePackage.intunewin</FileName>
  <SetupFile>ContosoAgent.msi</SetupFile>
  <EncryptionInfo>
    <EncryptionKey>a2V5</EncryptionKey>
    <MacKey>bWFj</MacKey>
    <InitializationVector>aXY=</InitializationVector>
    <Mac>ZGlnZXN0</Mac>
    <ProfileIdentifier></ProfileIdentifier>
    <FileDigest>ZmlsZQ==</FileDigest>
    <FileDigestAlgorithm>SHA256</FileDigestAlgorithm>
  </EncryptionInfo>
  <MsiInfo>
    <MsiProductCode>{0D5B4C2E-0000-4000-8000-000000000001}</MsiProductCode>
    <MsiProductVersion>4.2.0</MsiProductVersion>
    <MsiUpgradeCode>{0D5B4C2E-0000-4000-8000-0000000000FF}</MsiUpgradeCode>
    <MsiExecutionContext>User</MsiExecutionContext>
    <MsiRequiresReboot>false</MsiRequiresReboot>
    <MsiPublisher>Contoso Ltd</MsiPublisher>
  </MsiInfo>
</ApplicationInfo>"#;

/// Write a package archive holding `manifest` under `manifest_entry` and the
/// payload bytes under the conventional contents path.
pub fn write_package(
    dir: &tempfile::TempDir,
    manifest_entry: &str,
    manifest: &str,
    payload: &[u8],
) -> PathBuf {
    let path = dir.path().join("package.intunewin");
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    writer.start_file(manifest_entry, stored).unwrap();
    writer.write_all(manifest.as_bytes()).unwrap();
    writer
        .start_file("IntuneWinPackage/Contents/IntunePackage.intunewin", stored)
        .unwrap();
    writer.write_all(payload).unwrap();
    writer.finish().unwrap();
    path
}

/// Fixture package with the MSI manifest and `len` payload bytes
pub fn msi_package(dir: &tempfile::TempDir, len: usize) -> PathBuf {
    let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    write_package(
        dir,
        "IntuneWinPackage/Metadata/Detection.xml",
        MSI_MANIFEST,
        &payload,
    )
}

/// Install a test logger once; repeated calls are harmless.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
