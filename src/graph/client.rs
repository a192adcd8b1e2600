//! HTTP implementation of [`ManagementApi`].

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::ManagementApi;
use super::types::{
    CommittedVersionPatch, ContentFile, ContentFileRequest, ContentVersionRef, FileEncryptionInfo,
    ResourceRef,
};
use crate::archive::EncryptionInfo;
use crate::config::GraphConfig;
use crate::draft::Win32LobApp;
use crate::error::{ApiError, ConfigError};

const MOBILE_APPS: &str = "/deviceAppManagement/mobileApps";

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
    Patch,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
        }
    }

    fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Patch => Method::PATCH,
        }
    }
}

/// Management API client over HTTPS with a caller-supplied bearer token
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Build a client from connection settings.
    pub fn new(config: &GraphConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::Invalid {
                setting: "http_client",
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    async fn send(
        &self,
        verb: Verb,
        resource: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes, ApiError> {
        let url = format!("{}{}", self.base_url, resource);
        log::debug!("{} {}", verb.as_str(), resource);

        let mut request = self
            .http
            .request(verb.method(), &url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        } else if !matches!(verb, Verb::Get) {
            request = request.header(header::CONTENT_LENGTH, 0);
        }

        let response = request.send().await.map_err(|source| ApiError::Request {
            resource: resource.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                method: verb.as_str(),
                resource: resource.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.bytes().await.map_err(|source| ApiError::Request {
            resource: resource.to_string(),
            source,
        })
    }

    async fn send_json<B, T>(&self, verb: Verb, resource: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let raw = self.send(verb, resource, Some(encode(resource, body)?)).await?;
        decode(resource, &raw)
    }

    async fn send_json_discard<B>(&self, verb: Verb, resource: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(verb, resource, Some(encode(resource, body)?))
            .await
            .map(|_| ())
    }
}

fn encode<B: Serialize + ?Sized>(resource: &str, body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|source| ApiError::Encode {
        resource: resource.to_string(),
        source,
    })
}

fn decode<T: DeserializeOwned>(resource: &str, raw: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(raw).map_err(|source| ApiError::Decode {
        resource: resource.to_string(),
        source,
    })
}

pub(crate) fn app_resource(app_id: &str) -> String {
    format!("{MOBILE_APPS}/{app_id}")
}

pub(crate) fn versions_resource(app_id: &str) -> String {
    format!("{MOBILE_APPS}/{app_id}/microsoft.graph.win32LobApp/contentVersions")
}

pub(crate) fn files_resource(app_id: &str, version_id: &str) -> String {
    format!("{}/{version_id}/files", versions_resource(app_id))
}

pub(crate) fn file_resource(app_id: &str, version_id: &str, file_id: &str) -> String {
    format!("{}/{file_id}", files_resource(app_id, version_id))
}

#[async_trait]
impl ManagementApi for GraphClient {
    async fn create_application(&self, draft: &Win32LobApp) -> Result<ResourceRef, ApiError> {
        self.send_json(Verb::Post, MOBILE_APPS, draft).await
    }

    async fn create_content_version(&self, app_id: &str) -> Result<ContentVersionRef, ApiError> {
        let empty = serde_json::Map::new();
        self.send_json(Verb::Post, &versions_resource(app_id), &empty)
            .await
    }

    async fn create_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        request: &ContentFileRequest,
    ) -> Result<ContentFile, ApiError> {
        self.send_json(Verb::Post, &files_resource(app_id, version_id), request)
            .await
    }

    async fn get_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        file_id: &str,
    ) -> Result<ContentFile, ApiError> {
        let resource = file_resource(app_id, version_id, file_id);
        let raw = self.send(Verb::Get, &resource, None).await?;
        decode(&resource, &raw)
    }

    async fn renew_content_file_upload(
        &self,
        app_id: &str,
        version_id: &str,
        file_id: &str,
    ) -> Result<(), ApiError> {
        let resource = format!("{}/renewUpload", file_resource(app_id, version_id, file_id));
        self.send(Verb::Post, &resource, None).await.map(|_| ())
    }

    async fn commit_content_file(
        &self,
        app_id: &str,
        version_id: &str,
        file_id: &str,
        encryption: &EncryptionInfo,
    ) -> Result<(), ApiError> {
        let resource = format!("{}/commit", file_resource(app_id, version_id, file_id));
        self.send_json_discard(Verb::Post, &resource, &FileEncryptionInfo::new(encryption))
            .await
    }

    async fn patch_application_committed_version(
        &self,
        app_id: &str,
        version_id: &str,
    ) -> Result<(), ApiError> {
        self.send_json_discard(
            Verb::Patch,
            &app_resource(app_id),
            &CommittedVersionPatch::new(version_id),
        )
        .await
    }
}
