//! Upload staging area.
//!
//! Accumulates image files, each with its own [`TagChipInput`], and turns
//! them into one [`UploadBatch`] for `POST /images`. The batch keeps files
//! and tag strings index-aligned: entry *i*'s file always travels with tag
//! string *i*.
//!
//! Submitting is split in two so the network call can happen without
//! holding the staging area:
//!
//! ```text
//! begin_submit() ──▶ UploadBatch ──▶ (index.add_images) ──▶ finish_submit(ok)
//!      │                                                        │
//!      └──── staging frozen: add/remove/update rejected ────────┘
//! ```
//!
//! On success every entry is dropped and its preview released; on failure
//! the entries stay exactly as they were so the user can retry.

use log::{debug, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::files::FileHandle;
use crate::tags::{join_tags, TagChipInput, TagPolicy};

/// Transient display reference for a staged file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    fn create() -> Self {
        PreviewHandle(format!("preview:{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One staged file with its own tag input.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file: FileHandle,
    pub preview: PreviewHandle,
    pub tags: TagChipInput,
}

/// Why a staging mutation was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StagingError {
    #[error("an upload is already in progress")]
    Busy,
    #[error("no staged upload at index {0}")]
    NoSuchEntry(usize),
}

/// Files plus index-aligned joined tag strings, ready for `POST /images`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBatch {
    files: Vec<FileHandle>,
    tags: Vec<String>,
}

impl UploadBatch {
    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    /// One comma-joined tag string per file, in file order.
    pub fn tag_strings(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileHandle, &str)> {
        self.files.iter().zip(self.tags.iter().map(String::as_str))
    }
}

/// Ordered list of pending uploads.
#[derive(Debug, Default)]
pub struct UploadStaging {
    entries: Vec<PendingUpload>,
    policy: TagPolicy,
    in_flight: bool,
}

impl UploadStaging {
    pub fn new(policy: TagPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
            in_flight: false,
        }
    }

    pub fn entries(&self) -> &[PendingUpload] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a submitted batch is still waiting for its response.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Stage every handle whose media type is `image/*`, in order.
    ///
    /// Anything else is dropped without error. Returns how many were staged.
    pub fn add_files(
        &mut self,
        handles: impl IntoIterator<Item = FileHandle>,
    ) -> Result<usize, StagingError> {
        self.ensure_idle()?;
        let mut accepted = 0;
        for file in handles {
            if !file.is_image() {
                debug!("dropping non-image {} ({})", file.name, file.media_type);
                continue;
            }
            self.entries.push(PendingUpload {
                file,
                preview: PreviewHandle::create(),
                tags: TagChipInput::new(self.policy),
            });
            accepted += 1;
        }
        Ok(accepted)
    }

    /// Remove one staged entry, releasing its preview.
    pub fn remove_upload(&mut self, index: usize) -> Result<PendingUpload, StagingError> {
        self.ensure_idle()?;
        if index >= self.entries.len() {
            return Err(StagingError::NoSuchEntry(index));
        }
        let removed = self.entries.remove(index);
        debug!("released {}", removed.preview.as_str());
        Ok(removed)
    }

    /// Change the tags or draft of exactly one entry.
    pub fn update_upload_tags(
        &mut self,
        index: usize,
        patch: impl FnOnce(&mut TagChipInput),
    ) -> Result<(), StagingError> {
        self.ensure_idle()?;
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(StagingError::NoSuchEntry(index))?;
        patch(&mut entry.tags);
        Ok(())
    }

    /// Build the batch from each entry's chips plus its pending draft.
    ///
    /// The entries themselves are not modified, so a failed submit leaves
    /// them exactly as the user left them.
    ///
    /// Returns `Ok(None)` when nothing is staged. On `Some`, staging stays
    /// frozen until [`finish_submit`](Self::finish_submit) is called.
    pub fn begin_submit(&mut self) -> Result<Option<UploadBatch>, StagingError> {
        self.ensure_idle()?;
        if self.entries.is_empty() {
            return Ok(None);
        }
        let mut files = Vec::with_capacity(self.entries.len());
        let mut tags = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            tags.push(join_tags(&entry.tags.committed_with_draft()));
            files.push(entry.file.clone());
        }
        self.in_flight = true;
        Ok(Some(UploadBatch { files, tags }))
    }

    /// Resolve the in-flight batch. Success clears staging; failure keeps it.
    pub fn finish_submit(&mut self, succeeded: bool) {
        if !self.in_flight {
            warn!("finish_submit called with no upload in flight");
            return;
        }
        self.in_flight = false;
        if succeeded {
            for entry in self.entries.drain(..) {
                debug!("released {}", entry.preview.as_str());
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), StagingError> {
        if self.in_flight {
            Err(StagingError::Busy)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> FileHandle {
        FileHandle::new(name, "image/png", name.as_bytes().to_vec())
    }

    fn staging() -> UploadStaging {
        UploadStaging::new(TagPolicy::Verbatim)
    }

    #[test]
    fn test_add_files_keeps_only_images_in_order() {
        let mut s = staging();
        let added = s
            .add_files(vec![
                png("a.png"),
                FileHandle::new("notes.txt", "text/plain", vec![]),
                png("b.png"),
            ])
            .unwrap();
        assert_eq!(added, 2);
        let names: Vec<&str> = s.entries().iter().map(|e| e.file.name.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png"]);
        assert!(s.entries().iter().all(|e| e.tags.tags().is_empty()));

        s.add_files(vec![png("c.png")]).unwrap();
        assert_eq!(s.entries()[2].file.name, "c.png");
    }

    #[test]
    fn test_previews_are_unique() {
        let mut s = staging();
        s.add_files(vec![png("a.png"), png("a.png")]).unwrap();
        assert_ne!(s.entries()[0].preview, s.entries()[1].preview);
    }

    #[test]
    fn test_update_touches_one_entry() {
        let mut s = staging();
        s.add_files(vec![png("a.png"), png("b.png")]).unwrap();
        s.update_upload_tags(1, |t| t.type_str("dog,")).unwrap();
        assert!(s.entries()[0].tags.tags().is_empty());
        assert_eq!(s.entries()[1].tags.tags(), ["dog"]);
        assert_eq!(
            s.update_upload_tags(5, |_| {}),
            Err(StagingError::NoSuchEntry(5))
        );
    }

    #[test]
    fn test_remove_upload() {
        let mut s = staging();
        s.add_files(vec![png("a.png"), png("b.png")]).unwrap();
        let removed = s.remove_upload(0).unwrap();
        assert_eq!(removed.file.name, "a.png");
        assert_eq!(s.len(), 1);
        assert!(s.remove_upload(3).is_err());
    }

    #[test]
    fn test_empty_submit_is_noop() {
        let mut s = staging();
        assert_eq!(s.begin_submit(), Ok(None));
        assert!(!s.is_in_flight());
    }

    #[test]
    fn test_batch_aligns_files_and_tags() {
        let mut s = staging();
        s.add_files(vec![png("cat.png"), png("empty.png")]).unwrap();
        s.update_upload_tags(0, |t| t.on_text_change("cat")).unwrap();

        let batch = s.begin_submit().unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.tag_strings(), ["cat", ""]);
        let pairs: Vec<(&str, &str)> = batch.iter().map(|(f, t)| (f.name.as_str(), t)).collect();
        assert_eq!(pairs, [("cat.png", "cat"), ("empty.png", "")]);
    }

    #[test]
    fn test_staging_frozen_while_in_flight() {
        let mut s = staging();
        s.add_files(vec![png("a.png")]).unwrap();
        s.begin_submit().unwrap();
        assert_eq!(s.add_files(vec![png("b.png")]), Err(StagingError::Busy));
        assert_eq!(s.remove_upload(0).unwrap_err(), StagingError::Busy);
        assert_eq!(s.begin_submit(), Err(StagingError::Busy));
    }

    #[test]
    fn test_success_clears_failure_keeps() {
        let mut s = staging();
        s.add_files(vec![png("a.png"), png("b.png")]).unwrap();
        s.update_upload_tags(0, |t| t.type_str("x,y")).unwrap();

        let batch = s.begin_submit().unwrap().unwrap();
        assert_eq!(batch.tag_strings(), ["x,y", ""]);
        s.finish_submit(false);
        assert_eq!(s.len(), 2);
        assert!(!s.is_in_flight());
        assert_eq!(s.entries()[0].tags.tags(), ["x"]);
        assert_eq!(s.entries()[0].tags.draft(), "y");

        s.begin_submit().unwrap();
        s.finish_submit(true);
        assert!(s.is_empty());
    }
}
