//! Current query results, addressed by path.
//!
//! A [`ResultSet`] keeps the server's order but also indexes entries by
//! `path`, so edits and deletes hit exactly one entry. Paths are unique
//! within a set: if a response repeats a path, only its first occurrence
//! is kept.

use log::warn;
use std::collections::HashMap;

use crate::models::ImageResult;
use crate::tags::TagSet;

#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: Vec<ImageResult>,
    positions: HashMap<String, usize>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set with a fresh response, keeping its order.
    ///
    /// Returns the number of duplicate-path entries dropped.
    pub fn replace(&mut self, results: Vec<ImageResult>) -> usize {
        self.entries.clear();
        self.positions.clear();
        let mut dropped = 0;
        for result in results {
            if self.positions.contains_key(&result.path) {
                warn!("dropping duplicate result path {}", result.path);
                dropped += 1;
                continue;
            }
            self.positions.insert(result.path.clone(), self.entries.len());
            self.entries.push(result);
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    pub fn as_slice(&self) -> &[ImageResult] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&ImageResult> {
        self.positions.get(path).map(|&i| &self.entries[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&ImageResult> {
        self.entries.get(index)
    }

    /// Replace the tags of the entry at `path`. Returns `false` if absent.
    pub fn patch_tags(&mut self, path: &str, tags: TagSet) -> bool {
        match self.positions.get(path) {
            Some(&i) => {
                self.entries[i].tags = tags;
                true
            }
            None => false,
        }
    }

    /// Remove the entry at `path`; every other entry is left untouched.
    pub fn remove(&mut self, path: &str) -> Option<ImageResult> {
        let index = self.positions.remove(path)?;
        let removed = self.entries.remove(index);
        for pos in self.positions.values_mut() {
            if *pos > index {
                *pos -= 1;
            }
        }
        Some(removed)
    }
}

/// Final `/`-separated segment of a result path.
pub fn asset_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Fetch URL for a result: the asset prefix plus the path's basename.
pub fn asset_url(prefix: &str, path: &str) -> String {
    let basename = asset_basename(path);
    if prefix.ends_with('/') {
        format!("{}{}", prefix, basename)
    } else {
        format!("{}/{}", prefix, basename)
    }
}
