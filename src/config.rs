//! Configuration for the page renderer.
//!
//! The render scale is not configurable: pages are always rasterised at
//! [`crate::pipeline::render::RENDER_SCALE`]. What is configurable is where the
//! pdfium shared library lives and how long the encoder gets before the
//! data-URL fallback kicks in.

use crate::error::Pdf2ImgError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Directory the pdfium shared library is bound from by default.
pub const DEFAULT_LIBRARY_DIR: &str = "./";

/// Delay before the encoder fallback checks for a blob.
pub const DEFAULT_FALLBACK_DELAY_MS: u64 = 100;

/// Environment variable that overrides [`ConverterConfig::library_dir`]
/// in [`ConverterConfig::from_env`].
pub const LIBRARY_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Configuration for a [`crate::convert::PdfPageRenderer`].
///
/// # Example
/// ```rust
/// use pdf2img::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .library_dir("/opt/pdfium/lib")
///     .fallback_delay_ms(250)
///     .build()
///     .unwrap();
/// assert_eq!(config.fallback_delay().as_millis(), 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory holding `libpdfium.so` / `libpdfium.dylib` / `pdfium.dll`.
    /// Default: `./`.
    ///
    /// When no library is found there, the system library search path is
    /// tried instead.
    pub library_dir: PathBuf,

    /// Milliseconds to wait on the primary PNG encoder before synthesising
    /// the image from a data-URL snapshot. Default: 100.
    pub fallback_delay_ms: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from(DEFAULT_LIBRARY_DIR),
            fallback_delay_ms: DEFAULT_FALLBACK_DELAY_MS,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with `PDFIUM_LIB_PATH` applied when set.
    ///
    /// The variable may name either the library directory or the library
    /// file itself; a file path is reduced to its parent directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(LIBRARY_PATH_ENV) {
            if !raw.is_empty() {
                let path = PathBuf::from(raw);
                config.library_dir = if path.is_file() {
                    path.parent().map(PathBuf::from).unwrap_or(path)
                } else {
                    path
                };
            }
        }
        config
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.library_dir = dir.into();
        self
    }

    pub fn fallback_delay_ms(mut self, ms: u64) -> Self {
        self.config.fallback_delay_ms = ms.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, Pdf2ImgError> {
        if self.config.library_dir.as_os_str().is_empty() {
            return Err(Pdf2ImgError::InvalidConfig(
                "library directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
