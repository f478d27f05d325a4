//! Output data structures returned by the conversion entry point.

use crate::error::Pdf2ImgError;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// MIME type of every produced image.
pub const PNG_MIME: &str = "image/png";

/// Scheme prefix of URLs handed out by [`ObjectUrlRegistry`].
pub const OBJECT_URL_PREFIX: &str = "blob:pdf2img/";

// ── Blob ─────────────────────────────────────────────────────────────────

/// Immutable bytes tagged with a MIME type.
///
/// Cloning is cheap: the payload sits behind an `Arc`, so the registry and
/// the [`ImageFile`] returned to the caller share one allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    data: Arc<[u8]>,
    mime_type: String,
}

impl Blob {
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

// ── ImageFile ────────────────────────────────────────────────────────────

/// A named PNG, the file-like half of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub blob: Blob,
}

impl ImageFile {
    /// Wrap `blob` as a PNG file called `name`.
    ///
    /// The MIME type is always `image/png`, whatever the blob carried.
    pub fn new(name: impl Into<String>, blob: Blob) -> Self {
        Self {
            name: name.into(),
            mime_type: PNG_MIME.to_string(),
            blob,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        self.blob.bytes()
    }

    pub fn size(&self) -> usize {
        self.blob.len()
    }
}

/// Derive the output file name from the input PDF's name.
///
/// A trailing `.pdf` (any case) is replaced by `.png`; any other name gets
/// `.png` appended unchanged.
pub fn png_file_name(name: &str) -> String {
    const EXT: &str = ".pdf";
    let stem = match name.len().checked_sub(EXT.len()) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(EXT) => {
            &name[..cut]
        }
        _ => name,
    };
    format!("{stem}.png")
}

// ── ConversionResult ─────────────────────────────────────────────────────

/// Outcome of converting one page.
///
/// Exactly one side is populated: on success `image_url` is non-empty and
/// `file` is `Some`; on failure `image_url` is `""`, `file` is `None` and
/// `error` holds the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub image_url: String,
    pub file: Option<ImageFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    pub fn success(image_url: String, file: ImageFile) -> Self {
        Self {
            image_url,
            file: Some(file),
            error: None,
        }
    }

    /// Fold an error into the failure shape, using its user-facing message.
    pub fn failure(err: &Pdf2ImgError) -> Self {
        Self {
            image_url: String::new(),
            file: None,
            error: Some(err.user_message()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.file.is_some()
    }

    /// Convert into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> Result<(String, ImageFile), String> {
        match (self.error, self.file) {
            (None, Some(file)) => Ok((self.image_url, file)),
            (Some(err), _) => Err(err),
            (None, None) => Err("conversion produced no file".to_string()),
        }
    }
}

// ── Object URLs ──────────────────────────────────────────────────────────

/// In-process table of revocable URLs pointing at blobs.
///
/// URLs live until [`ObjectUrlRegistry::revoke_object_url`] is called;
/// the converter hands them out and never revokes them itself.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    entries: Mutex<HashMap<String, Blob>>,
}

static GLOBAL_REGISTRY: Lazy<Arc<ObjectUrlRegistry>> =
    Lazy::new(|| Arc::new(ObjectUrlRegistry::default()));

impl ObjectUrlRegistry {
    /// The process-wide registry used by default renderers.
    pub fn global() -> Arc<ObjectUrlRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    pub fn create_object_url(&self, blob: &Blob) -> String {
        let url = format!("{OBJECT_URL_PREFIX}{}", Uuid::new_v4());
        self.lock().insert(url.clone(), blob.clone());
        debug!("Created object URL {} ({} bytes)", url, blob.len());
        url
    }

    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Release `url`. Returns `false` if it was unknown or already revoked.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Blob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
