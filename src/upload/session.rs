//! Upload session coordinator.
//!
//! Drives one content file from provisioning to a committed content version:
//! wait for storage, transfer blocks with periodic URI renewal, finalize the
//! block list, commit the file, then commit the version.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::block::{Block, MAX_BLOCKS, split_blocks};
use super::poll::wait_for_upload_state;
use super::state::{StateTarget, UploadPhase};
use super::transport::BlockTransport;
use crate::archive::EncryptionInfo;
use crate::config::UploadConfig;
use crate::error::{BlockFailure, ConfigError, UploadError};
use crate::graph::{ContentFile, ContentFileHandle, ManagementApi};

/// Result of the block transfer phase
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Blocks attempted
    pub attempted: usize,
    /// Blocks that failed, ordered by index
    pub failures: Vec<BlockFailure>,
}

impl UploadOutcome {
    /// Whether every block transferred
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn into_result(mut self) -> Result<usize, UploadError> {
        if self.is_success() {
            return Ok(self.attempted);
        }
        self.failures.sort_by_key(|f| f.index);
        Err(UploadError::BlocksFailed {
            attempted: self.attempted,
            failures: self.failures,
        })
    }
}

/// Final state of a successful session
#[derive(Debug, Clone)]
pub struct UploadReport {
    /// Last server view of the content file
    pub file: ContentFile,
    /// Phase reached; `VersionCommitted` on success
    pub phase: UploadPhase,
    /// Blocks transferred
    pub blocks: usize,
    /// Storage URI renewals performed
    pub renewals: usize,
}

/// Owns one content file for the duration of an upload.
pub struct UploadSession {
    api: Arc<dyn ManagementApi>,
    transport: Arc<dyn BlockTransport>,
    config: UploadConfig,
    handle: ContentFileHandle,
    phase: UploadPhase,
    storage_uri: String,
    renewals: usize,
    cancel: CancellationToken,
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("app_id", &self.handle.app_id)
            .field("content_version_id", &self.handle.content_version_id)
            .field("file_id", &self.handle.file_id())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl UploadSession {
    /// Create a session for a freshly created content file.
    pub fn new(
        api: Arc<dyn ManagementApi>,
        transport: Arc<dyn BlockTransport>,
        config: UploadConfig,
        handle: ContentFileHandle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            api,
            transport,
            config,
            handle,
            phase: UploadPhase::Provisioning,
            storage_uri: String::new(),
            renewals: 0,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort the session when `token` is cancelled.
    ///
    /// Cancellation is observed at every step: state waits and management
    /// calls return [`UploadError::Cancelled`], in-flight block transfers are
    /// dropped, and no later step runs.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Current phase
    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Local view of the content file as of the last refresh
    pub fn content_file(&self) -> &ContentFile {
        &self.handle.file
    }

    /// Upload `payload` and commit it with `encryption`.
    ///
    /// Any failure aborts the remaining steps; the content file is left in
    /// whatever state the backend last reported.
    pub async fn run(
        mut self,
        payload: Bytes,
        encryption: &EncryptionInfo,
    ) -> Result<UploadReport, UploadError> {
        if payload.is_empty() {
            return Err(UploadError::EmptyPayload);
        }
        let blocks = split_blocks(payload.len(), self.config.block_size);
        if blocks.len() > MAX_BLOCKS {
            return Err(UploadError::TooManyBlocks {
                blocks: blocks.len(),
                max: MAX_BLOCKS,
            });
        }
        let block_ids: Vec<String> = blocks.iter().map(|b| b.id.clone()).collect();
        let commit_info = encryption.with_default_profile();
        let cancel = self.cancel.clone();

        let file = guarded(&cancel, self.wait_for(StateTarget::STORAGE_READY)).await?;
        self.accept(file);
        self.advance(UploadPhase::StorageReady);

        log::info!(
            "Uploading {} bytes in {} block(s) of up to {} bytes",
            payload.len(),
            blocks.len(),
            self.config.block_size
        );
        self.advance(UploadPhase::Uploading);
        let transferred = self.transfer(&payload, blocks).await?.into_result()?;

        guarded(&cancel, self.refresh()).await?;
        guarded(&cancel, async {
            self.transport
                .commit_block_list(&self.storage_uri, &block_ids)
                .await
                .map_err(|source| UploadError::Finalize { source })
        })
        .await?;
        self.advance(UploadPhase::Finalized);

        guarded(&cancel, async {
            self.api
                .commit_content_file(
                    &self.handle.app_id,
                    &self.handle.content_version_id,
                    self.handle.file_id(),
                    &commit_info,
                )
                .await
                .map_err(|source| UploadError::Commit { source })
        })
        .await?;
        self.advance(UploadPhase::FileCommitting);

        let file = guarded(&cancel, self.wait_for(StateTarget::FILE_COMMITTED)).await?;
        self.accept(file);
        self.advance(UploadPhase::FileCommitted);

        guarded(&cancel, self.refresh()).await?;
        guarded(&cancel, async {
            self.api
                .patch_application_committed_version(
                    &self.handle.app_id,
                    &self.handle.content_version_id,
                )
                .await
                .map_err(|source| UploadError::VersionCommit { source })
        })
        .await?;
        self.advance(UploadPhase::VersionCommitted);

        Ok(UploadReport {
            file: self.handle.file,
            phase: self.phase,
            blocks: transferred,
            renewals: self.renewals,
        })
    }

    /// Transfer blocks through a sliding window, renewing the storage URI on
    /// a timer. Returning early drops every in-flight transfer.
    async fn transfer(
        &mut self,
        payload: &Bytes,
        blocks: Vec<Block>,
    ) -> Result<UploadOutcome, UploadError> {
        let mut outcome = UploadOutcome {
            attempted: blocks.len(),
            failures: Vec::new(),
        };
        let transport = Arc::clone(&self.transport);
        let launch = |block: Block, storage_uri: String| {
            let transport = Arc::clone(&transport);
            let data = payload.slice(block.range.clone());
            async move {
                let result = transport.put_block(&storage_uri, &block.id, data).await;
                (block.index, result)
            }
        };

        let mut pending = blocks.into_iter();
        let mut in_flight = FuturesUnordered::new();
        for block in pending.by_ref().take(self.config.max_concurrent_blocks) {
            in_flight.push(launch(block, self.storage_uri.clone()));
        }

        let period = self.config.renewal_interval;
        let mut renewal = time::interval_at(Instant::now() + period, period);
        renewal.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        while !in_flight.is_empty() {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::warn!("Upload cancelled with {} block(s) in flight", in_flight.len());
                    return Err(UploadError::Cancelled);
                }

                Some((index, result)) = in_flight.next() => {
                    match result {
                        Ok(()) => log::debug!("Block {index} uploaded"),
                        Err(error) => {
                            log::warn!("Block {index} failed: {error}");
                            outcome.failures.push(BlockFailure { index, error });
                        }
                    }
                    if let Some(block) = pending.next() {
                        in_flight.push(launch(block, self.storage_uri.clone()));
                    }
                }

                _ = renewal.tick() => {
                    self.renew().await?;
                }
            }
        }

        Ok(outcome)
    }

    async fn renew(&mut self) -> Result<(), UploadError> {
        log::info!("Renewing storage URI for content file {}", self.handle.file_id());
        self.api
            .renew_content_file_upload(
                &self.handle.app_id,
                &self.handle.content_version_id,
                self.handle.file_id(),
            )
            .await
            .map_err(|source| UploadError::Renewal { source })?;
        self.renewals += 1;
        self.refresh().await
    }

    async fn wait_for(&self, target: StateTarget) -> Result<ContentFile, UploadError> {
        let api = self.api.as_ref();
        let handle = &self.handle;
        wait_for_upload_state(self.config.poll_settings(), target, || {
            api.get_content_file(&handle.app_id, &handle.content_version_id, handle.file_id())
        })
        .await
    }

    async fn refresh(&mut self) -> Result<(), UploadError> {
        let file = self
            .api
            .get_content_file(
                &self.handle.app_id,
                &self.handle.content_version_id,
                self.handle.file_id(),
            )
            .await
            .map_err(|source| UploadError::Refresh { source })?;
        self.accept(file);
        Ok(())
    }

    /// Replace the local view; a response without a storage URI keeps the
    /// last known one.
    fn accept(&mut self, file: ContentFile) {
        if let Some(uri) = file.storage_uri() {
            if uri != self.storage_uri {
                if !self.storage_uri.is_empty() {
                    log::debug!("Storage URI changed for content file {}", file.id);
                }
                self.storage_uri = uri.to_string();
            }
        }
        self.handle.file = file;
    }

    fn advance(&mut self, phase: UploadPhase) {
        debug_assert!(phase > self.phase, "{} -> {phase}", self.phase);
        log::info!("Content file {}: {phase}", self.handle.file_id());
        self.phase = phase;
    }
}

/// Run `step` unless `cancel` fires first.
async fn guarded<T>(
    cancel: &CancellationToken,
    step: impl Future<Output = Result<T, UploadError>>,
) -> Result<T, UploadError> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(UploadError::Cancelled),
        result = step => result,
    }
}
