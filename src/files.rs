//! Raw file handles fed into upload staging.
//!
//! A [`FileHandle`] is the headless stand-in for a browser `File`: a name,
//! a declared media type, and the bytes. Paths given on the command line are
//! expanded here; directories are walked recursively in file-name order.
//! Nothing is filtered at this stage; deciding what counts as an image is
//! the staging area's job.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// An opaque byte source with a declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its media type from its content.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_for(path, &bytes);
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// Media type of a file: sniffed from its leading bytes, else guessed
/// from the extension.
pub fn media_type_for(path: &Path, bytes: &[u8]) -> String {
    match infer::get(bytes) {
        Some(kind) => kind.mime_type().to_string(),
        None => mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Expand files and directories into file handles, in argument order.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<FileHandle>> {
    let mut handles = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry =
                    entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if entry.file_type().is_file() {
                    handles.push(FileHandle::from_path(entry.path())?);
                }
            }
        } else {
            handles.push(FileHandle::from_path(path)?);
        }
    }
    Ok(handles)
}
