//! Uploaded media storage
//!
//! Uploaded audio and cover files are written under `<root>/storage` with a
//! random name and served back from `/storage`. The public URL of a stored
//! file is what ends up in the song row, so replacing or deleting a song can
//! map the URL back to the file and remove it.

use crate::error::ApiResult;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// URL path prefix uploaded files are served under
pub const STORAGE_ROUTE: &str = "/storage";

/// Category of uploaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Cover,
}

impl MediaKind {
    fn directory(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Cover => "covers",
        }
    }

    fn mime_prefix(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/",
            MediaKind::Cover => "image/",
        }
    }

    /// Name used in validation messages
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Cover => "image",
        }
    }

    pub fn accepts(self, file: &UploadedFile) -> bool {
        file.mime_type().starts_with(self.mime_prefix())
    }
}

/// File part received in a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Browsers send an empty nameless part for untouched file inputs
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.file_name.is_empty()
    }

    /// Declared content type, falling back to a guess from the file name
    pub fn mime_type(&self) -> String {
        match self.content_type.as_deref().map(str::trim) {
            Some(declared)
                if !declared.is_empty() && declared != "application/octet-stream" =>
            {
                declared.to_ascii_lowercase()
            }
            _ => mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }

    /// Extension for the stored copy
    fn extension(&self) -> String {
        let from_name = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(str::to_ascii_lowercase);

        from_name
            .or_else(|| {
                mime_guess::get_mime_extensions_str(&self.mime_type())
                    .and_then(|exts| exts.first())
                    .map(|ext| ext.to_string())
            })
            .unwrap_or_else(|| "bin".to_string())
    }
}

/// Local directory holding uploaded files
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    public_base: String,
}

impl MediaStorage {
    /// Storage rooted at `<root_folder>/storage`
    ///
    /// Public URLs are relative (`/storage/...`) unless an application URL
    /// is configured.
    pub fn new(root_folder: &Path, app_url: Option<&Url>) -> Self {
        let public_base = match app_url {
            Some(url) => format!("{}{}", url.as_str().trim_end_matches('/'), STORAGE_ROUTE),
            None => STORAGE_ROUTE.to_string(),
        };

        Self {
            root: root_folder.join("storage"),
            public_base,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an upload to disk and return its public URL
    pub async fn store(&self, kind: MediaKind, file: &UploadedFile) -> ApiResult<String> {
        let directory = self.root.join(kind.directory());
        tokio::fs::create_dir_all(&directory).await?;

        let name = format!("{}.{}", Uuid::new_v4(), file.extension());
        let path = directory.join(&name);
        tokio::fs::write(&path, &file.bytes).await?;

        info!(
            "Stored {} upload '{}' ({} bytes) as {}",
            kind.label(),
            file.file_name,
            file.bytes.len(),
            path.display()
        );

        Ok(format!("{}/{}/{}", self.public_base, kind.directory(), name))
    }

    /// Map a public URL produced by [`MediaStorage::store`] back to its file
    ///
    /// Returns `None` for anything that is not one of our stored files.
    pub fn local_path(&self, public_url: &str) -> Option<PathBuf> {
        let rest = public_url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
        let (directory, name) = rest.split_once('/')?;

        if ![MediaKind::Audio, MediaKind::Cover]
            .iter()
            .any(|kind| kind.directory() == directory)
        {
            return None;
        }
        if name.is_empty()
            || name.starts_with('.')
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return None;
        }

        Some(self.root.join(directory).join(name))
    }

    /// Delete a stored upload; URLs pointing elsewhere are ignored
    pub async fn remove(&self, public_url: &str) {
        let Some(path) = self.local_path(public_url) else {
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed stored upload {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove stored upload {}: {}", path.display(), e),
        }
    }
}
