//! In-memory [`ImageIndex`] for tests and offline runs.
//!
//! Behaves like the service closely enough to drive the controller end to
//! end: identical content is skipped as a duplicate, each stored image gets
//! the path `store/<file name>`, and a query ranks images by how many query
//! words appear in their file name or tags. When a tag filter is given,
//! images carrying any of those tags are returned with `tag_match = true`.
//!
//! Every call is recorded, and [`InMemoryIndex::fail_next`] makes the next
//! call of a given kind fail with a chosen status body.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::ImageIndex;
use crate::error::ApiError;
use crate::models::{AddImagesResponse, ImageResult, QueryRequest};
use crate::results::{asset_basename, asset_url};
use crate::staging::UploadBatch;
use crate::tags::{split_tags, TagSet};

const ASSET_PREFIX: &str = "memory://assets/";
const STORE_DIR: &str = "store";

/// Which operation a recorded call or injected failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Query,
    UpdateTags,
    Delete,
    FetchAsset,
}

/// One recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add {
        file_names: Vec<String>,
        tags: Vec<String>,
    },
    Query(QueryRequest),
    UpdateTags {
        path: String,
        tags: TagSet,
    },
    Delete {
        path: String,
    },
    FetchAsset {
        path: String,
    },
}

struct StoredImage {
    path: String,
    tags: TagSet,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct State {
    images: Vec<StoredImage>,
    calls: Vec<Call>,
    failures: HashMap<Operation, String>,
}

pub struct InMemoryIndex {
    state: RwLock<State>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Store an image directly, bypassing the call log.
    pub fn insert(&self, name: &str, tags: &[&str], bytes: &[u8]) -> String {
        let path = format!("{}/{}", STORE_DIR, name);
        let mut state = self.state.write().unwrap();
        state.images.push(StoredImage {
            path: path.clone(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            bytes: bytes.to_vec(),
        });
        path
    }

    /// Make the next `op` call fail with `body` as its message.
    pub fn fail_next(&self, op: Operation, body: &str) {
        let mut state = self.state.write().unwrap();
        state.failures.insert(op, body.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.read().unwrap().calls.clone()
    }

    /// Stored tags for `path`, if the image exists.
    pub fn tags_of(&self, path: &str) -> Option<TagSet> {
        let state = self.state.read().unwrap();
        state
            .images
            .iter()
            .find(|img| img.path == path)
            .map(|img| img.tags.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, op: Operation, call: Call) -> Result<(), ApiError> {
        let mut state = self.state.write().unwrap();
        state.calls.push(call);
        match state.failures.remove(&op) {
            Some(body) => Err(ApiError::status(500, body)),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn relevance(image: &StoredImage, words: &[String]) -> usize {
    let name = asset_basename(&image.path).to_lowercase();
    words
        .iter()
        .filter(|w| name.contains(w.as_str()) || image.tags.iter().any(|t| t.to_lowercase() == **w))
        .count()
}

#[async_trait]
impl ImageIndex for InMemoryIndex {
    async fn add_images(&self, batch: &UploadBatch) -> Result<AddImagesResponse, ApiError> {
        self.record(
            Operation::Add,
            Call::Add {
                file_names: batch.files().iter().map(|f| f.name.clone()).collect(),
                tags: batch.tag_strings().to_vec(),
            },
        )?;

        let mut state = self.state.write().unwrap();
        let mut response = AddImagesResponse {
            added: 0,
            skipped: 0,
        };
        for (file, tags) in batch.iter() {
            if state.images.iter().any(|img| img.bytes == file.bytes) {
                response.skipped += 1;
                continue;
            }
            state.images.push(StoredImage {
                path: format!("{}/{}", STORE_DIR, file.name),
                tags: split_tags(tags),
                bytes: file.bytes.clone(),
            });
            response.added += 1;
        }
        Ok(response)
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<ImageResult>, ApiError> {
        self.record(Operation::Query, Call::Query(request.clone()))?;

        let words: Vec<String> = request
            .text
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        let filter = request.tags.as_deref().unwrap_or_default();

        let state = self.state.read().unwrap();
        let mut scored: Vec<(usize, bool, &StoredImage)> = state
            .images
            .iter()
            .map(|img| {
                let tag_match = img.tags.iter().any(|t| filter.contains(t));
                (relevance(img, &words), tag_match, img)
            })
            .filter(|(score, tag_match, _)| *score > 0 || *tag_match)
            .collect();
        scored.sort_by(|a, b| (b.1, b.0).cmp(&(a.1, a.0)));

        Ok(scored
            .into_iter()
            .take(request.top_k as usize)
            .map(|(_, tag_match, img)| ImageResult {
                path: img.path.clone(),
                tags: img.tags.clone(),
                tag_match,
            })
            .collect())
    }

    async fn update_tags(&self, path: &str, tags: &[String]) -> Result<(), ApiError> {
        self.record(
            Operation::UpdateTags,
            Call::UpdateTags {
                path: path.to_string(),
                tags: tags.to_vec(),
            },
        )?;
        let mut state = self.state.write().unwrap();
        if let Some(img) = state.images.iter_mut().find(|img| img.path == path) {
            img.tags = tags.to_vec();
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.record(
            Operation::Delete,
            Call::Delete {
                path: path.to_string(),
            },
        )?;
        let mut state = self.state.write().unwrap();
        state.images.retain(|img| img.path != path);
        Ok(())
    }

    async fn fetch_asset(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        self.record(
            Operation::FetchAsset,
            Call::FetchAsset {
                path: path.to_string(),
            },
        )?;
        let basename = asset_basename(path);
        let state = self.state.read().unwrap();
        state
            .images
            .iter()
            .find(|img| asset_basename(&img.path) == basename)
            .map(|img| img.bytes.clone())
            .ok_or_else(|| ApiError::status(404, "Not Found"))
    }

    fn asset_url(&self, path: &str) -> String {
        asset_url(ASSET_PREFIX, path)
    }
}
