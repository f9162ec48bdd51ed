//! Access to the remote image index.
//!
//! The [`ImageIndex`] trait is the seam between the client-side state and
//! the service. [`HttpIndex`] talks to the real service over HTTP;
//! [`memory::InMemoryIndex`] keeps everything in process for tests and
//! offline use.
//!
//! # Endpoints
//!
//! | Operation | Method & path | Body |
//! |-----------|---------------|------|
//! | [`add_images`](ImageIndex::add_images) | `POST /images` | multipart: repeated `files` + repeated `tags` |
//! | [`query`](ImageIndex::query) | `POST /query` | `{ text, top_k, tags? }` |
//! | [`update_tags`](ImageIndex::update_tags) | `POST /tags` | `{ path, tags }` |
//! | [`delete`](ImageIndex::delete) | `POST /delete` | `{ path }` |
//! | [`fetch_asset`](ImageIndex::fetch_asset) | `GET /assets/{basename}` | (none) |
//!
//! Any non-2xx status is a failure whose message is the response body.

pub mod memory;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{
    AddImagesResponse, DeleteRequest, ImageResult, QueryRequest, QueryResponse, UpdateTagsRequest,
};
use crate::results::asset_url;
use crate::staging::UploadBatch;

/// The four index operations plus the static asset fetch.
#[async_trait]
pub trait ImageIndex: Send + Sync {
    /// Store a batch of images, each with its joined tag string.
    async fn add_images(&self, batch: &UploadBatch) -> Result<AddImagesResponse, ApiError>;

    /// Run a text query, optionally restricted to tags.
    async fn query(&self, request: &QueryRequest) -> Result<Vec<ImageResult>, ApiError>;

    /// Replace the tags stored for `path`.
    async fn update_tags(&self, path: &str, tags: &[String]) -> Result<(), ApiError>;

    /// Remove `path` from the index.
    async fn delete(&self, path: &str) -> Result<(), ApiError>;

    /// Raw bytes of the asset behind `path`.
    async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, ApiError>;

    /// Display URL for the asset behind `path`.
    fn asset_url(&self, path: &str) -> String;
}

/// [`ImageIndex`] backed by the HTTP service.
pub struct HttpIndex {
    client: reqwest::Client,
    base_url: String,
    asset_prefix: String,
}

impl HttpIndex {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            asset_prefix: config.asset_prefix(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(path);
        debug!("POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        check_status(response).await
    }
}

/// Turn a non-2xx response into [`ApiError::Status`] carrying its body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::status(status.as_u16(), body))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl ImageIndex for HttpIndex {
    async fn add_images(&self, batch: &UploadBatch) -> Result<AddImagesResponse, ApiError> {
        let mut form = Form::new();
        for file in batch.files() {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.media_type)
                .map_err(|_| {
                    ApiError::InvalidRequest(format!(
                        "invalid media type '{}' for {}",
                        file.media_type, file.name
                    ))
                })?;
            form = form.part("files", part);
        }
        for tags in batch.tag_strings() {
            form = form.text("tags", tags.clone());
        }

        let url = self.endpoint("/images");
        debug!("POST {} ({} files)", url, batch.len());
        let response = self.client.post(&url).multipart(form).send().await?;
        decode(check_status(response).await?).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<ImageResult>, ApiError> {
        let response = self.post_json("/query", request).await?;
        let body: QueryResponse = decode(response).await?;
        Ok(body.results)
    }

    async fn update_tags(&self, path: &str, tags: &[String]) -> Result<(), ApiError> {
        let body = UpdateTagsRequest {
            path: path.to_string(),
            tags: tags.to_vec(),
        };
        self.post_json("/tags", &body).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let body = DeleteRequest {
            path: path.to_string(),
        };
        self.post_json("/delete", &body).await?;
        Ok(())
    }

    async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.asset_url(path);
        debug!("GET {}", url);
        let response = check_status(self.client.get(&url).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn asset_url(&self, path: &str) -> String {
        asset_url(&self.asset_prefix, path)
    }
}
