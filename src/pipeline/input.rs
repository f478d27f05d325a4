//! Input files: a PDF source with a display name.
//!
//! The converter reads the whole file into memory before decoding, so an
//! input is either bytes the caller already holds or a path that is read
//! on demand with `tokio::fs`.

use crate::error::Pdf2ImgError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
enum Source {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

/// A named PDF handed to [`crate::convert_pdf_to_image`].
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    source: Source,
}

impl InputFile {
    /// An in-memory file, e.g. an upload or a database blob.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: Source::Memory(bytes.into()),
        }
    }

    /// A file on disk. The name is the path's final component.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            source: Source::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the full content.
    pub async fn read_bytes(&self) -> Result<Arc<[u8]>, Pdf2ImgError> {
        match &self.source {
            Source::Memory(bytes) => Ok(Arc::clone(bytes)),
            Source::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| Pdf2ImgError::Io {
                    path: path.clone(),
                    source: e,
                })?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes.into())
            }
        }
    }
}
