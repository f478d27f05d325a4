//! PNG encoding: surface pixels → PNG [`Blob`].
//!
//! Two independent paths produce the PNG. The primary one is the surface's
//! asynchronous encoder. Some encoders never deliver (or deliver nothing),
//! so after a short delay the surface is snapshotted as a base64 `data:` URL
//! and decoded back into bytes. Whichever path yields a non-empty blob first
//! wins; the other result is dropped.
//!
//! The delay is a timing heuristic. Once it has passed, the snapshot is
//! taken on the blocking pool while the primary keeps running, and a slow
//! primary still wins if it finishes first.

use crate::error::Pdf2ImgError;
use crate::output::{Blob, PNG_MIME};
use crate::surface::Surface;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::RgbaImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

static RE_DATA_URL_MIME: Lazy<Regex> = Lazy::new(|| Regex::new(r":(.*?);").unwrap());

/// Encode pixels as PNG.
///
/// PNG is lossless, so the compression level only trades encode time for
/// size. The default level keeps a 3× page well inside the fallback delay.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, CompressionType::Default, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Wrap encoded bytes as a base64 `data:` URL.
pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Decode a `data:<mime>;base64,<payload>` URL into a [`Blob`].
///
/// The MIME type falls back to `image/png` when the header does not carry
/// one. A payload that is not valid base64 is an error.
pub fn data_url_to_blob(data_url: &str) -> Result<Blob, Pdf2ImgError> {
    let (header, payload) = data_url.split_once(',').unwrap_or((data_url, ""));

    let mime = RE_DATA_URL_MIME
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or(PNG_MIME);

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Pdf2ImgError::MalformedDataUrl(e.to_string()))?;

    Ok(Blob::new(bytes, mime))
}

/// Produce the PNG for a rendered surface.
///
/// Races [`Surface::encode_png`] against a `fallback_delay` timer. If the
/// primary encoder has not produced a non-empty blob when the timer fires,
/// a [`Surface::to_data_url`] snapshot is taken on the blocking pool and
/// raced against the still-running primary; the first non-empty blob wins.
///
/// # Errors
/// [`Pdf2ImgError::BlobCreationFailed`] when both paths come up empty.
pub async fn encode_surface(
    surface: Arc<dyn Surface>,
    fallback_delay: Duration,
) -> Result<Blob, Pdf2ImgError> {
    let mut primary = surface.encode_png();
    let timer = tokio::time::sleep(fallback_delay);
    tokio::pin!(timer);

    let primary_outcome = tokio::select! {
        blob = &mut primary => Some(blob),
        _ = &mut timer => None,
    };

    match primary_outcome {
        Some(Some(blob)) if !blob.is_empty() => {
            debug!("PNG produced by primary encoder ({} bytes)", blob.len());
            Ok(blob)
        }
        Some(_) => {
            // Encoder answered with nothing; the timer still decides when
            // the fallback runs.
            debug!("Primary encoder returned no blob");
            (&mut timer).await;
            snapshot_blob(surface).await
        }
        None => {
            debug!("Primary encoder silent after {:?}", fallback_delay);
            let fallback = snapshot_blob(surface);
            tokio::pin!(fallback);
            tokio::select! {
                biased;
                result = &mut fallback => result,
                blob = &mut primary => match blob {
                    Some(blob) if !blob.is_empty() => {
                        debug!("PNG produced by primary encoder ({} bytes)", blob.len());
                        Ok(blob)
                    }
                    _ => fallback.await,
                },
            }
        }
    }
}

/// Snapshot `surface` as a data URL and decode it, off the async task.
async fn snapshot_blob(surface: Arc<dyn Surface>) -> Result<Blob, Pdf2ImgError> {
    let decoded =
        tokio::task::spawn_blocking(move || data_url_to_blob(&surface.to_data_url())).await;

    match decoded {
        Ok(Ok(blob)) if !blob.is_empty() => {
            info!("PNG produced by data-URL fallback ({} bytes)", blob.len());
            Ok(blob)
        }
        Ok(Ok(_)) => {
            warn!("Data-URL fallback produced an empty blob");
            Err(Pdf2ImgError::BlobCreationFailed)
        }
        Ok(Err(e)) => {
            warn!("Data-URL fallback failed: {}", e);
            Err(Pdf2ImgError::BlobCreationFailed)
        }
        Err(e) => {
            warn!("Data-URL snapshot task panicked: {}", e);
            Err(Pdf2ImgError::BlobCreationFailed)
        }
    }
}
