//! Error type for the pdf2img library.
//!
//! The public conversion entry point never returns `Err`: every failure is
//! folded into a [`crate::output::ConversionResult`] whose `error` field
//! carries the message produced here. Three variants are "reported
//! conditions" with a fixed message of their own; everything else is an
//! unexpected fault and gets the `Failed to convert PDF:` prefix when it
//! reaches the result (see [`Pdf2ImgError::user_message`]).

use std::path::PathBuf;
use thiserror::Error;

/// All errors raised while converting a PDF page to PNG.
#[derive(Debug, Error)]
pub enum Pdf2ImgError {
    // ── Reported conditions ───────────────────────────────────────────────
    /// Requested page lies outside `[1, page_count]`.
    #[error("Invalid page number")]
    InvalidPageNumber,

    /// The drawing surface could not hand out a 2-D context.
    #[error("Canvas context unavailable")]
    ContextUnavailable,

    /// Neither the primary encoder nor the data-URL fallback produced bytes.
    #[error("Failed to create PNG blob")]
    BlobCreationFailed,

    // ── Library errors ────────────────────────────────────────────────────
    /// The rendering library could not be loaded or configured.
    ///
    /// Carried as a string because one load attempt is shared by every
    /// caller that was waiting on it.
    #[error("Failed to load PDF library: {0}")]
    LibraryLoad(String),

    /// The byte buffer could not be decoded as a PDF document.
    #[error("Could not decode PDF: {0}")]
    Decode(String),

    /// pdfium failed while rasterising a page.
    #[error("Rendering failed for page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// A `data:` URL did not carry a decodable base64 payload.
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a panicked render task).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImgError {
    /// Whether this error is one of the conditions the converter reports
    /// verbatim rather than as a wrapped fault.
    pub fn is_reported_condition(&self) -> bool {
        matches!(
            self,
            Pdf2ImgError::InvalidPageNumber
                | Pdf2ImgError::ContextUnavailable
                | Pdf2ImgError::BlobCreationFailed
        )
    }

    /// The text placed in `ConversionResult::error`.
    pub fn user_message(&self) -> String {
        if self.is_reported_condition() {
            self.to_string()
        } else {
            format!("Failed to convert PDF: {self}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_conditions_keep_their_text() {
        assert_eq!(
            Pdf2ImgError::InvalidPageNumber.user_message(),
            "Invalid page number"
        );
        assert_eq!(
            Pdf2ImgError::ContextUnavailable.user_message(),
            "Canvas context unavailable"
        );
        assert_eq!(
            Pdf2ImgError::BlobCreationFailed.user_message(),
            "Failed to create PNG blob"
        );
    }

    #[test]
    fn faults_are_prefixed() {
        let e = Pdf2ImgError::Decode("trailer not found".into());
        let msg = e.user_message();
        assert!(msg.starts_with("Failed to convert PDF: "), "got: {msg}");
        assert!(msg.contains("trailer not found"));
    }

    #[test]
    fn render_display_names_page() {
        let e = Pdf2ImgError::Render {
            page: 4,
            detail: "bitmap alloc".into(),
        };
        assert!(e.to_string().contains("page 4"));
        assert!(!e.is_reported_condition());
    }
}
