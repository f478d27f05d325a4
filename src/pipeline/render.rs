//! PDF rasterisation: decode bytes, pick a page, draw it onto a surface.
//!
//! The rendering library sits behind three small traits so the converter
//! never names pdfium directly:
//!
//! ```text
//! PdfEngine ──open_document──▶ PdfDocumentHandle ──page──▶ PdfPageHandle
//!                                (page_count)               (viewport, render)
//! ```
//!
//! [`PdfiumEngine`] is the production implementation. All of this is
//! synchronous and CPU-bound; the converter runs [`render_page_blocking`]
//! inside `spawn_blocking`.

use crate::error::Pdf2ImgError;
use crate::surface::{Canvas2d, SmoothingQuality, Surface, SurfaceFactory};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Magnification applied to every rendered page.
pub const RENDER_SCALE: f32 = 3.0;

/// Page geometry at a given scale, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl Viewport {
    /// Build a viewport from a page size in PDF points.
    pub fn from_points(width_pt: f32, height_pt: f32, scale: f32) -> Self {
        Self {
            width: width_pt * scale,
            height: height_pt * scale,
            scale,
        }
    }

    /// Surface width: the viewport width truncated to whole pixels, at least 1.
    pub fn pixel_width(&self) -> u32 {
        (self.width.floor() as u32).max(1)
    }

    pub fn pixel_height(&self) -> u32 {
        (self.height.floor() as u32).max(1)
    }
}

/// A loaded rendering library able to open documents.
pub trait PdfEngine: Send + Sync {
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> Result<Box<dyn PdfDocumentHandle + 'a>, Pdf2ImgError>;
}

/// A decoded document.
pub trait PdfDocumentHandle {
    fn page_count(&self) -> usize;

    /// Fetch a page by 1-based number. Callers validate the range first.
    fn page<'p>(&'p self, number: usize) -> Result<Box<dyn PdfPageHandle + 'p>, Pdf2ImgError>;
}

/// A single page of a decoded document.
pub trait PdfPageHandle {
    fn viewport(&self, scale: f32) -> Viewport;

    /// Rasterise the page into `ctx` at the viewport's size.
    fn render(&self, ctx: &mut Canvas2d, viewport: &Viewport) -> Result<(), Pdf2ImgError>;
}

/// Decode `bytes`, validate `page_number` and render that page onto a new
/// surface at [`RENDER_SCALE`].
///
/// # Errors
/// - [`Pdf2ImgError::InvalidPageNumber`] outside `[1, page_count]`
/// - [`Pdf2ImgError::ContextUnavailable`] when the surface has no context
/// - decode / render failures from the engine
pub fn render_page_blocking(
    engine: &dyn PdfEngine,
    surfaces: &dyn SurfaceFactory,
    bytes: &[u8],
    page_number: usize,
) -> Result<Box<dyn Surface>, Pdf2ImgError> {
    let document = engine.open_document(bytes)?;
    let total_pages = document.page_count();
    info!("PDF loaded: {} pages", total_pages);

    if page_number < 1 || page_number > total_pages {
        debug!(
            "Page {} out of range (total={})",
            page_number, total_pages
        );
        return Err(Pdf2ImgError::InvalidPageNumber);
    }

    let page = document.page(page_number)?;
    let viewport = page.viewport(RENDER_SCALE);

    let mut surface = surfaces.create(viewport.pixel_width(), viewport.pixel_height());
    let ctx = surface
        .context_2d()
        .ok_or(Pdf2ImgError::ContextUnavailable)?;

    ctx.set_image_smoothing_enabled(true);
    ctx.set_image_smoothing_quality(SmoothingQuality::High);

    page.render(ctx, &viewport)?;

    debug!(
        "Rendered page {} → {}x{} px",
        page_number,
        surface.width(),
        surface.height()
    );

    Ok(surface)
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`PdfEngine`] over a bound pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    pub fn new(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }
}

impl PdfEngine for PdfiumEngine {
    fn open_document<'a>(
        &'a self,
        bytes: &'a [u8],
    ) -> Result<Box<dyn PdfDocumentHandle + 'a>, Pdf2ImgError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| Pdf2ImgError::Decode(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfDocumentHandle for PdfiumDocument<'a> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page<'p>(&'p self, number: usize) -> Result<Box<dyn PdfPageHandle + 'p>, Pdf2ImgError> {
        let index = u16::try_from(number.saturating_sub(1))
            .map_err(|_| Pdf2ImgError::InvalidPageNumber)?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| Pdf2ImgError::Render {
                page: number,
                detail: format!("{:?}", e),
            })?;
        Ok(Box::new(PdfiumPage { page, number }))
    }
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    number: usize,
}

impl<'a> PdfPageHandle for PdfiumPage<'a> {
    fn viewport(&self, scale: f32) -> Viewport {
        Viewport::from_points(self.page.width().value, self.page.height().value, scale)
    }

    fn render(&self, ctx: &mut Canvas2d, viewport: &Viewport) -> Result<(), Pdf2ImgError> {
        let smooth = ctx.image_smoothing_enabled();
        let render_config = PdfRenderConfig::new()
            .set_target_width(viewport.pixel_width() as i32)
            .set_target_height(viewport.pixel_height() as i32)
            .set_text_smoothing(smooth)
            .set_image_smoothing(smooth)
            .set_path_smoothing(smooth)
            .render_form_data(true)
            .render_annotations(true);

        let bitmap = self
            .page
            .render_with_config(&render_config)
            .map_err(|e| Pdf2ImgError::Render {
                page: self.number,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image().to_rgba8();
        ctx.draw_image(&image, 0, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RasterSurface, RasterSurfaceFactory};
    use image::Rgba;
    use std::sync::Mutex;

    /// Engine whose "documents" are a page count in the first byte.
    struct CountingEngine;

    struct FakeDocument(usize);

    struct FakePage;

    impl PdfEngine for CountingEngine {
        fn open_document<'a>(
            &'a self,
            bytes: &'a [u8],
        ) -> Result<Box<dyn PdfDocumentHandle + 'a>, Pdf2ImgError> {
            match bytes.first() {
                Some(&n) => Ok(Box::new(FakeDocument(n as usize))),
                None => Err(Pdf2ImgError::Decode("empty input".into())),
            }
        }
    }

    impl PdfDocumentHandle for FakeDocument {
        fn page_count(&self) -> usize {
            self.0
        }
        fn page<'p>(&'p self, _number: usize) -> Result<Box<dyn PdfPageHandle + 'p>, Pdf2ImgError> {
            Ok(Box::new(FakePage))
        }
    }

    impl PdfPageHandle for FakePage {
        fn viewport(&self, scale: f32) -> Viewport {
            Viewport::from_points(10.5, 20.0, scale)
        }
        fn render(&self, ctx: &mut Canvas2d, _viewport: &Viewport) -> Result<(), Pdf2ImgError> {
            assert!(ctx.image_smoothing_enabled());
            assert_eq!(ctx.image_smoothing_quality(), SmoothingQuality::High);
            ctx.fill(Rgba([255, 255, 255, 255]));
            Ok(())
        }
    }

    /// Records requested sizes; optionally refuses a context.
    struct RecordingFactory {
        sizes: Mutex<Vec<(u32, u32)>>,
        with_context: bool,
    }

    struct ContextlessSurface;

    impl Surface for ContextlessSurface {
        fn width(&self) -> u32 {
            0
        }
        fn height(&self) -> u32 {
            0
        }
        fn context_2d(&mut self) -> Option<&mut Canvas2d> {
            None
        }
        fn encode_png(&self) -> futures::future::BoxFuture<'static, Option<crate::output::Blob>> {
            Box::pin(futures::future::ready(None))
        }
        fn to_data_url(&self) -> String {
            String::new()
        }
    }

    impl SurfaceFactory for RecordingFactory {
        fn create(&self, width: u32, height: u32) -> Box<dyn Surface> {
            self.sizes.lock().unwrap().push((width, height));
            if self.with_context {
                Box::new(RasterSurface::new(width, height))
            } else {
                Box::new(ContextlessSurface)
            }
        }
    }

    #[test]
    fn pdfium_engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfiumEngine>();
    }

    #[test]
    fn viewport_truncates_to_pixels() {
        let v = Viewport::from_points(10.5, 20.0, RENDER_SCALE);
        assert_eq!(v.width, 31.5);
        assert_eq!(v.pixel_width(), 31);
        assert_eq!(v.pixel_height(), 60);
        assert_eq!(Viewport::from_points(0.0, 0.0, 3.0).pixel_width(), 1);
    }

    #[test]
    fn renders_valid_page_at_fixed_scale() {
        let factory = RecordingFactory {
            sizes: Mutex::new(Vec::new()),
            with_context: true,
        };
        let surface = render_page_blocking(&CountingEngine, &factory, &[2], 2).unwrap();
        assert_eq!((surface.width(), surface.height()), (31, 60));
        assert_eq!(*factory.sizes.lock().unwrap(), vec![(31, 60)]);
    }

    #[test]
    fn rejects_out_of_range_pages() {
        for page in [0, 3, 99] {
            let err = render_page_blocking(&CountingEngine, &RasterSurfaceFactory, &[2], page)
                .err()
                .expect("out of range");
            assert!(matches!(err, Pdf2ImgError::InvalidPageNumber), "page {page}");
        }
    }

    #[test]
    fn zero_page_document_has_no_valid_page() {
        let err = render_page_blocking(&CountingEngine, &RasterSurfaceFactory, &[0], 1)
            .err()
            .unwrap();
        assert!(matches!(err, Pdf2ImgError::InvalidPageNumber));
    }

    #[test]
    fn missing_context_is_reported() {
        let factory = RecordingFactory {
            sizes: Mutex::new(Vec::new()),
            with_context: false,
        };
        let err = render_page_blocking(&CountingEngine, &factory, &[1], 1)
            .err()
            .unwrap();
        assert!(matches!(err, Pdf2ImgError::ContextUnavailable));
    }

    /// One page the size of the largest page PDF allows and then some.
    struct OversizedEngine;

    struct OversizedDocument;

    struct OversizedPage;

    impl PdfEngine for OversizedEngine {
        fn open_document<'a>(
            &'a self,
            _bytes: &'a [u8],
        ) -> Result<Box<dyn PdfDocumentHandle + 'a>, Pdf2ImgError> {
            Ok(Box::new(OversizedDocument))
        }
    }

    impl PdfDocumentHandle for OversizedDocument {
        fn page_count(&self) -> usize {
            1
        }
        fn page<'p>(&'p self, _number: usize) -> Result<Box<dyn PdfPageHandle + 'p>, Pdf2ImgError> {
            Ok(Box::new(OversizedPage))
        }
    }

    impl PdfPageHandle for OversizedPage {
        fn viewport(&self, scale: f32) -> Viewport {
            Viewport::from_points(15000.0, 15000.0, scale)
        }
        fn render(&self, _ctx: &mut Canvas2d, _viewport: &Viewport) -> Result<(), Pdf2ImgError> {
            panic!("oversized page must not reach the renderer");
        }
    }

    #[test]
    fn oversized_page_has_no_context() {
        let err = render_page_blocking(&OversizedEngine, &RasterSurfaceFactory, b"%PDF", 1)
            .err()
            .unwrap();
        assert!(matches!(err, Pdf2ImgError::ContextUnavailable), "got: {err:?}");
    }

    #[test]
    fn decode_failure_propagates() {
        let err = render_page_blocking(&CountingEngine, &RasterSurfaceFactory, &[], 1)
            .err()
            .unwrap();
        assert!(matches!(err, Pdf2ImgError::Decode(_)));
    }
}
