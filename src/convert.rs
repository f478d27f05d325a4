//! Page-to-PNG conversion entry points.
//!
//! [`PdfPageRenderer`] wires the pipeline together:
//!
//! ```text
//! loader ──▶ input ──▶ render (spawn_blocking) ──▶ encode ──▶ object URL
//! (engine)   (bytes)   (decode, validate, draw)    (PNG race)  (+ ImageFile)
//! ```
//!
//! Nothing here returns `Err`: every failure is reported through
//! [`ConversionResult`].

use crate::config::ConverterConfig;
use crate::error::Pdf2ImgError;
use crate::loader::{LibraryLoader, LibraryProvider, PdfiumProvider};
use crate::output::{png_file_name, ConversionResult, ImageFile, ObjectUrlRegistry};
use crate::pipeline::input::InputFile;
use crate::pipeline::{encode, render};
use crate::surface::{RasterSurfaceFactory, Surface, SurfaceFactory};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Page converted when the caller does not name one.
pub const DEFAULT_PAGE_NUMBER: usize = 1;

static DEFAULT_RENDERER: Lazy<PdfPageRenderer> =
    Lazy::new(|| PdfPageRenderer::with_config(ConverterConfig::from_env()));

/// Convert one page of `file` to PNG using the process-wide renderer.
///
/// The renderer binds pdfium on first use (see [`ConverterConfig::from_env`])
/// and keeps it for the rest of the process.
///
/// # Example
/// ```rust,no_run
/// use pdf2img::{convert_pdf_to_image, InputFile};
///
/// # #[tokio::main]
/// # async fn main() {
/// let file = InputFile::from_path("slides.pdf");
/// let result = convert_pdf_to_image(&file, 1).await;
/// match result.error {
///     None => println!("{} → {}", result.file.unwrap().name, result.image_url),
///     Some(err) => eprintln!("{err}"),
/// }
/// # }
/// ```
pub async fn convert_pdf_to_image(file: &InputFile, page_number: usize) -> ConversionResult {
    DEFAULT_RENDERER.convert_pdf_to_image(file, page_number).await
}

/// Renders single PDF pages to PNG.
///
/// Holds the lazily loaded library, so one renderer should be shared
/// rather than built per call.
pub struct PdfPageRenderer {
    loader: LibraryLoader,
    surfaces: Arc<dyn SurfaceFactory>,
    urls: Arc<ObjectUrlRegistry>,
    config: ConverterConfig,
}

impl PdfPageRenderer {
    /// Renderer over an explicit library provider and surface factory.
    pub fn new(
        provider: Arc<dyn LibraryProvider>,
        surfaces: Arc<dyn SurfaceFactory>,
        config: ConverterConfig,
    ) -> Self {
        Self {
            loader: LibraryLoader::new(provider),
            surfaces,
            urls: ObjectUrlRegistry::global(),
            config,
        }
    }

    /// pdfium bound from `config.library_dir`, drawing on raster surfaces.
    pub fn with_config(config: ConverterConfig) -> Self {
        Self::new(
            Arc::new(PdfiumProvider::from_config(&config)),
            Arc::new(RasterSurfaceFactory),
            config,
        )
    }

    /// Hand out object URLs from `urls` instead of the global registry.
    pub fn with_url_registry(mut self, urls: Arc<ObjectUrlRegistry>) -> Self {
        self.urls = urls;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn url_registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.urls
    }

    /// Convert page `page_number` (1-based) of `file` to PNG.
    ///
    /// On success the result carries an object URL registered in this
    /// renderer's [`ObjectUrlRegistry`] (the caller owns revoking it) and an
    /// [`ImageFile`] named after the input with `.png` in place of `.pdf`.
    pub async fn convert_pdf_to_image(
        &self,
        file: &InputFile,
        page_number: usize,
    ) -> ConversionResult {
        let start = Instant::now();
        match self.convert_page(file, page_number).await {
            Ok((image_url, image)) => {
                info!(
                    "Converted '{}' page {} → '{}' ({} bytes) in {}ms",
                    file.name(),
                    page_number,
                    image.name,
                    image.size(),
                    start.elapsed().as_millis()
                );
                ConversionResult::success(image_url, image)
            }
            Err(e) => {
                warn!("Conversion of '{}' page {} failed: {}", file.name(), page_number, e);
                ConversionResult::failure(&e)
            }
        }
    }

    async fn convert_page(
        &self,
        file: &InputFile,
        page_number: usize,
    ) -> Result<(String, ImageFile), Pdf2ImgError> {
        // ── Step 1: Library ──────────────────────────────────────────────
        let engine = self.loader.ensure_loaded().await?;

        // ── Step 2: Bytes ────────────────────────────────────────────────
        let bytes = file.read_bytes().await?;

        // ── Steps 3–8: Decode, validate, rasterise ───────────────────────
        let surfaces = Arc::clone(&self.surfaces);
        let surface = tokio::task::spawn_blocking(move || {
            render::render_page_blocking(engine.as_ref(), surfaces.as_ref(), &bytes, page_number)
        })
        .await
        .map_err(|e| Pdf2ImgError::Internal(format!("Render task panicked: {}", e)))??;

        // ── Step 9: PNG ──────────────────────────────────────────────────
        let surface: Arc<dyn Surface> = Arc::from(surface);
        let blob = encode::encode_surface(surface, self.config.fallback_delay()).await?;

        // ── Step 10: URL + file ──────────────────────────────────────────
        let image_url = self.urls.create_object_url(&blob);
        let image = ImageFile::new(png_file_name(file.name()), blob);
        Ok((image_url, image))
    }
}
