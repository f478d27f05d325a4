//! # pdf2img
//!
//! Render a single page of a PDF document to a PNG image.
//!
//! Pages are rasterised with pdfium at a fixed 3× scale onto an offscreen
//! RGBA surface, encoded as PNG and handed back as an object URL plus a
//! named [`ImageFile`]. The conversion never fails with `Err`: every outcome
//! is a [`ConversionResult`] carrying either the image or an error message.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Load    bind pdfium once per process (shared by concurrent callers)
//!  ├─ 2. Input   read the whole file into memory
//!  ├─ 3. Render  decode, validate page, rasterise at 3× (spawn_blocking)
//!  ├─ 4. Encode  PNG via the primary encoder, data-URL fallback after 100 ms
//!  └─ 5. Output  object URL + `<name>.png` ImageFile
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2img::{convert_pdf_to_image, InputFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = InputFile::from_path("report.pdf");
//!     let (url, file) = convert_pdf_to_image(&input, 1).await.into_result()?;
//!     std::fs::write(&file.name, file.bytes())?;
//!     eprintln!("{url}: {} bytes", file.size());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Finding pdfium
//!
//! The library is bound from [`ConverterConfig::library_dir`] (default `./`,
//! overridable with `PDFIUM_LIB_PATH`), falling back to the system library
//! search path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod surface;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::{convert_pdf_to_image, PdfPageRenderer, DEFAULT_PAGE_NUMBER};
pub use error::Pdf2ImgError;
pub use loader::{LibraryLoader, LibraryProvider, PdfiumProvider};
pub use output::{png_file_name, Blob, ConversionResult, ImageFile, ObjectUrlRegistry, PNG_MIME};
pub use pipeline::encode::data_url_to_blob;
pub use pipeline::input::InputFile;
pub use pipeline::render::{
    PdfDocumentHandle, PdfEngine, PdfPageHandle, PdfiumEngine, Viewport, RENDER_SCALE,
};
pub use surface::{
    surface_fits, Canvas2d, RasterSurface, RasterSurfaceFactory, SmoothingQuality, Surface,
    SurfaceFactory, MAX_SURFACE_AREA, MAX_SURFACE_SIDE,
};
