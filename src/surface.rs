//! Offscreen drawing surfaces.
//!
//! A [`Surface`] owns a pixel buffer, hands out a [`Canvas2d`] drawing
//! context, and can serialise itself two ways: an asynchronous PNG encode
//! (the primary path) and a synchronous base64 `data:` URL snapshot (the
//! fallback). Both are trait methods so a renderer can be driven with a
//! surface whose encoder misbehaves.

use crate::output::{Blob, PNG_MIME};
use crate::pipeline::encode;
use futures::future::{self, BoxFuture, FutureExt};
use image::{Rgba, RgbaImage};
use tracing::warn;

/// Resampling quality requested for image smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothingQuality {
    #[default]
    Low,
    Medium,
    High,
}

/// 2-D drawing context over an RGBA pixel buffer.
#[derive(Debug, Clone)]
pub struct Canvas2d {
    pixels: RgbaImage,
    image_smoothing_enabled: bool,
    image_smoothing_quality: SmoothingQuality,
}

impl Canvas2d {
    /// A fully transparent canvas of `width × height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])),
            image_smoothing_enabled: true,
            image_smoothing_quality: SmoothingQuality::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn image_smoothing_enabled(&self) -> bool {
        self.image_smoothing_enabled
    }

    pub fn set_image_smoothing_enabled(&mut self, enabled: bool) {
        self.image_smoothing_enabled = enabled;
    }

    pub fn image_smoothing_quality(&self) -> SmoothingQuality {
        self.image_smoothing_quality
    }

    pub fn set_image_smoothing_quality(&mut self, quality: SmoothingQuality) {
        self.image_smoothing_quality = quality;
    }

    /// Copy `image` onto the canvas with its top-left corner at `(x, y)`.
    /// Parts falling outside the canvas are clipped.
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        image::imageops::replace(&mut self.pixels, image, x, y);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for p in self.pixels.pixels_mut() {
            *p = color;
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// An offscreen surface a page is rendered onto.
pub trait Surface: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// The 2-D context, or `None` when the surface cannot provide one.
    fn context_2d(&mut self) -> Option<&mut Canvas2d>;

    /// Encode the current pixels as PNG at maximum quality.
    ///
    /// The returned future may resolve to `None`, or never resolve at all;
    /// callers race it against [`Surface::to_data_url`].
    fn encode_png(&self) -> BoxFuture<'static, Option<Blob>>;

    /// Synchronous `data:image/png;base64,…` snapshot of the pixels.
    fn to_data_url(&self) -> String;
}

/// Creates surfaces sized to a page viewport.
pub trait SurfaceFactory: Send + Sync {
    fn create(&self, width: u32, height: u32) -> Box<dyn Surface>;
}

// ── Raster surface ───────────────────────────────────────────────────────

/// Longest side, in pixels, a [`RasterSurface`] will allocate.
pub const MAX_SURFACE_SIDE: u32 = 32_767;

/// Largest pixel count a [`RasterSurface`] will allocate (1 GiB of RGBA).
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// Whether a `width × height` surface fits the allocation limits.
pub fn surface_fits(width: u32, height: u32) -> bool {
    width <= MAX_SURFACE_SIDE
        && height <= MAX_SURFACE_SIDE
        && u64::from(width) * u64::from(height) <= MAX_SURFACE_AREA
}

/// In-memory surface backed by an [`RgbaImage`].
///
/// Sizes beyond [`MAX_SURFACE_SIDE`] / [`MAX_SURFACE_AREA`] get no pixel
/// buffer and therefore no 2-D context.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    context: Option<Canvas2d>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let context = if surface_fits(width, height) {
            Some(Canvas2d::new(width, height))
        } else {
            warn!(
                "Refusing {}x{} surface (limits: side {}, area {})",
                width, height, MAX_SURFACE_SIDE, MAX_SURFACE_AREA
            );
            None
        };
        Self {
            width,
            height,
            context,
        }
    }

    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.context.as_ref().map(Canvas2d::pixels)
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn context_2d(&mut self) -> Option<&mut Canvas2d> {
        self.context.as_mut()
    }

    fn encode_png(&self) -> BoxFuture<'static, Option<Blob>> {
        let Some(pixels) = self.pixels().cloned() else {
            return future::ready(None).boxed();
        };
        async move {
            match tokio::task::spawn_blocking(move || encode::encode_png(&pixels)).await {
                Ok(Ok(bytes)) => Some(Blob::new(bytes, PNG_MIME)),
                Ok(Err(e)) => {
                    warn!("PNG encoder failed: {}", e);
                    None
                }
                Err(e) => {
                    warn!("PNG encode task panicked: {}", e);
                    None
                }
            }
        }
        .boxed()
    }

    fn to_data_url(&self) -> String {
        let encoded = match self.pixels() {
            Some(pixels) => encode::encode_png(pixels),
            None => return format!("data:{PNG_MIME};base64,"),
        };
        match encoded {
            Ok(bytes) => encode::to_data_url(&bytes, PNG_MIME),
            Err(e) => {
                warn!("Data-URL snapshot failed: {}", e);
                format!("data:{PNG_MIME};base64,")
            }
        }
    }
}

/// Default factory: every surface is a [`RasterSurface`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterSurfaceFactory;

impl SurfaceFactory for RasterSurfaceFactory {
    fn create(&self, width: u32, height: u32) -> Box<dyn Surface> {
        Box::new(RasterSurface::new(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::data_url_to_blob;

    #[test]
    fn canvas_starts_transparent_with_low_quality() {
        let c = Canvas2d::new(4, 3);
        assert_eq!((c.width(), c.height()), (4, 3));
        assert_eq!(c.pixels().get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(c.image_smoothing_quality(), SmoothingQuality::Low);
    }

    #[test]
    fn draw_image_clips_at_edges() {
        let mut c = Canvas2d::new(4, 4);
        let red = RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 255]));
        c.draw_image(&red, 2, 2);
        assert_eq!(c.pixels().get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(c.pixels().get_pixel(1, 1), &Rgba([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn raster_surface_encodes_png() {
        let mut s = RasterSurface::new(8, 8);
        s.context_2d().unwrap().fill(Rgba([0, 128, 255, 255]));

        let blob = s.encode_png().await.expect("primary encode");
        assert_eq!(blob.mime_type(), "image/png");
        assert_eq!(&blob.bytes()[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(blob.bytes()).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(7, 7), &Rgba([0, 128, 255, 255]));
    }

    #[test]
    fn oversized_surface_has_no_context() {
        assert!(surface_fits(MAX_SURFACE_SIDE, 8));
        assert!(!surface_fits(45_000, 45_000));
        assert!(!surface_fits(20_000, 20_000));

        let mut s = RasterSurface::new(45_000, 45_000);
        assert_eq!((s.width(), s.height()), (45_000, 45_000));
        assert!(s.context_2d().is_none());
        assert!(s.pixels().is_none());
        assert!(data_url_to_blob(&s.to_data_url()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_surface_encodes_nothing() {
        let s = RasterSurface::new(MAX_SURFACE_SIDE + 1, 1);
        assert!(s.encode_png().await.is_none());
    }

    #[test]
    fn data_url_snapshot_matches_pixels() {
        let mut s = RasterSurface::new(2, 2);
        s.context_2d().unwrap().fill(Rgba([1, 2, 3, 255]));
        let url = s.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let blob = data_url_to_blob(&url).unwrap();
        let decoded = image::load_from_memory(blob.bytes()).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
    }
}
