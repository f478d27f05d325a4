//! Pipeline stages for PDF-page-to-PNG conversion.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (bytes)   (pdfium)   (PNG, data-URL fallback)
//! ```
//!
//! 1. [`input`]  — read the named PDF source into memory
//! 2. [`render`] — decode, validate the page number and rasterise at 3×;
//!    runs in `spawn_blocking` because pdfium is CPU-bound and synchronous
//! 3. [`encode`] — turn the surface into PNG bytes, racing the primary
//!    encoder against a timed data-URL fallback

pub mod encode;
pub mod input;
pub mod render;
