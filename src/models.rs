//! Wire types exchanged with the image search service.
//!
//! Field names match the service's JSON exactly (`top_k`, `tag_match`).

use serde::{Deserialize, Serialize};

use crate::tags::TagSet;

/// One indexed image as returned by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    /// Server-assigned identifier. Not directly fetchable; see
    /// [`asset_basename`](crate::results::asset_basename).
    pub path: String,
    #[serde(default)]
    pub tags: TagSet,
    /// Set by the server when the result matched through the tag filter.
    #[serde(default)]
    pub tag_match: bool,
}

/// Response to `POST /images`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddImagesResponse {
    pub added: u64,
    #[serde(default)]
    pub skipped: u64,
}

/// Body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagSet>,
}

/// Response to `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<ImageResult>,
}

/// Body of `POST /tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTagsRequest {
    pub path: String,
    pub tags: TagSet,
}

/// Body of `POST /delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub path: String,
}
