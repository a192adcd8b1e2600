//! Block-level transfers against blob storage.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header;

use crate::error::{ConfigError, TransportError};

/// Header marking a write as a block blob operation
pub const BLOB_TYPE_HEADER: &str = "x-ms-blob-type";

/// Writes blocks to a storage URI and commits the block list
#[async_trait]
pub trait BlockTransport: Send + Sync {
    /// Upload `data` as an uncommitted block named `block_id`.
    async fn put_block(
        &self,
        storage_uri: &str,
        block_id: &str,
        data: Bytes,
    ) -> Result<(), TransportError>;

    /// Commit the blob from `block_ids`, in the given order.
    async fn commit_block_list(
        &self,
        storage_uri: &str,
        block_ids: &[String],
    ) -> Result<(), TransportError>;
}

/// URL for uploading one block.
pub fn block_url(storage_uri: &str, block_id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(block_id.as_bytes()).collect();
    format!("{}comp=block&blockid={encoded}", query_prefix(storage_uri))
}

/// URL for committing the block list.
pub fn block_list_url(storage_uri: &str) -> String {
    format!("{}comp=blocklist", query_prefix(storage_uri))
}

// SAS URIs always carry a query string; a bare URI gets one started.
fn query_prefix(storage_uri: &str) -> String {
    if storage_uri.contains('?') {
        format!("{storage_uri}&")
    } else {
        format!("{storage_uri}?")
    }
}

/// Block list document selecting the latest upload of each identifier.
pub fn block_list_xml(block_ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in block_ids {
        xml.push_str("<Latest>");
        xml.push_str(&quick_xml::escape::escape(id.as_str()));
        xml.push_str("</Latest>");
    }
    xml.push_str("</BlockList>");
    xml
}

/// [`BlockTransport`] over HTTPS.
///
/// The storage URI carries its own SAS credentials, so requests are
/// unauthenticated at the HTTP layer.
#[derive(Debug, Clone)]
pub struct AzureBlobTransport {
    http: reqwest::Client,
}

impl AzureBlobTransport {
    /// Transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                setting: "transfer_timeout",
                reason: e.to_string(),
            })?;
        Ok(Self { http })
    }

    /// Transport over an existing client
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<(), TransportError> {
        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Drain so the connection can be reused and truncated bodies surface.
        response
            .bytes()
            .await
            .map_err(|source| TransportError::Body { source })?;
        Ok(())
    }
}

#[async_trait]
impl BlockTransport for AzureBlobTransport {
    async fn put_block(
        &self,
        storage_uri: &str,
        block_id: &str,
        data: Bytes,
    ) -> Result<(), TransportError> {
        let request = self
            .http
            .put(block_url(storage_uri, block_id))
            .header(BLOB_TYPE_HEADER, "BlockBlob")
            .body(data);
        self.execute(request).await
    }

    async fn commit_block_list(
        &self,
        storage_uri: &str,
        block_ids: &[String],
    ) -> Result<(), TransportError> {
        let request = self
            .http
            .put(block_list_url(storage_uri))
            .header(header::CONTENT_TYPE, "application/xml")
            .body(block_list_xml(block_ids));
        self.execute(request).await
    }
}
