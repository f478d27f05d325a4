//! Lazy, single-flight loading of the rendering library.
//!
//! The library is loaded the first time a conversion needs it and then kept
//! for the lifetime of the [`LibraryLoader`]. Callers arriving while a load
//! is in flight share that attempt instead of starting their own. A failed
//! attempt is forgotten so the next caller starts a fresh one, but every
//! caller that was waiting on the failed attempt sees its error.
//!
//! ```text
//!           ensure_loaded()
//!  Idle ──────────────────▶ Loading{gen, shared future} ──ok──▶ Ready(engine)
//!   ▲                                  │
//!   └────────────── err ───────────────┘
//! ```

use crate::config::ConverterConfig;
use crate::error::Pdf2ImgError;
use crate::pipeline::render::{PdfEngine, PdfiumEngine};
use futures::future::{BoxFuture, FutureExt, Shared};
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Obtains and configures a rendering library.
///
/// `load` is called once per load attempt; the loader guarantees no two
/// attempts overlap.
pub trait LibraryProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn PdfEngine>, Pdf2ImgError>>;
}

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<dyn PdfEngine>, String>>>;

enum LoadState {
    Idle,
    Loading { generation: u64, load: SharedLoad },
    Ready(Arc<dyn PdfEngine>),
}

struct Inner {
    state: LoadState,
    next_generation: u64,
}

/// Memoises one [`LibraryProvider`] load.
pub struct LibraryLoader {
    provider: Arc<dyn LibraryProvider>,
    inner: Mutex<Inner>,
}

impl LibraryLoader {
    pub fn new(provider: Arc<dyn LibraryProvider>) -> Self {
        Self {
            provider,
            inner: Mutex::new(Inner {
                state: LoadState::Idle,
                next_generation: 0,
            }),
        }
    }

    /// Whether a previous call has finished loading the library.
    pub fn is_loaded(&self) -> bool {
        matches!(self.lock().state, LoadState::Ready(_))
    }

    /// Return the loaded library, loading it first if necessary.
    ///
    /// # Errors
    /// [`Pdf2ImgError::LibraryLoad`] when the attempt this call joined
    /// failed. The next call retries.
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn PdfEngine>, Pdf2ImgError> {
        let (generation, load) = {
            let mut inner = self.lock();
            let joined = match &inner.state {
                LoadState::Ready(engine) => return Ok(Arc::clone(engine)),
                LoadState::Loading { generation, load } => Some((*generation, load.clone())),
                LoadState::Idle => None,
            };
            match joined {
                Some(attempt) => {
                    debug!("Joining in-flight {} load", self.provider.name());
                    attempt
                }
                None => {
                    let generation = inner.next_generation;
                    inner.next_generation += 1;
                    info!("Loading {} (attempt {})", self.provider.name(), generation + 1);
                    let load = self
                        .provider
                        .load()
                        .map(|r| {
                            r.map_err(|e| match e {
                                Pdf2ImgError::LibraryLoad(msg) => msg,
                                other => other.to_string(),
                            })
                        })
                        .boxed()
                        .shared();
                    inner.state = LoadState::Loading {
                        generation,
                        load: load.clone(),
                    };
                    (generation, load)
                }
            }
        };

        let outcome = load.await;

        let mut inner = self.lock();
        let current = matches!(
            &inner.state,
            LoadState::Loading { generation: g, .. } if *g == generation
        );
        match outcome {
            Ok(engine) => {
                if current {
                    info!("{} loaded", self.provider.name());
                    inner.state = LoadState::Ready(Arc::clone(&engine));
                }
                Ok(engine)
            }
            Err(msg) => {
                if current {
                    warn!("{} failed to load: {}", self.provider.name(), msg);
                    inner.state = LoadState::Idle;
                }
                Err(Pdf2ImgError::LibraryLoad(msg))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── pdfium provider ──────────────────────────────────────────────────────

/// Binds pdfium from a fixed library directory, falling back to the system
/// library search path.
#[derive(Debug, Clone)]
pub struct PdfiumProvider {
    library_dir: PathBuf,
}

impl PdfiumProvider {
    pub fn new(library_dir: impl Into<PathBuf>) -> Self {
        Self {
            library_dir: library_dir.into(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.library_dir.clone())
    }

    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }
}

impl LibraryProvider for PdfiumProvider {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn load(&self) -> BoxFuture<'static, Result<Arc<dyn PdfEngine>, Pdf2ImgError>> {
        let dir = self.library_dir.clone();
        async move {
            tokio::task::spawn_blocking(move || bind_pdfium(&dir))
                .await
                .map_err(|e| Pdf2ImgError::LibraryLoad(format!("bind task panicked: {}", e)))?
        }
        .boxed()
    }
}

fn bind_pdfium(dir: &Path) -> Result<Arc<dyn PdfEngine>, Pdf2ImgError> {
    let lib_path = Pdfium::pdfium_platform_library_name_at_path(dir);
    let bindings = Pdfium::bind_to_library(&lib_path)
        .or_else(|e| {
            debug!(
                "No pdfium at {} ({:?}); trying system library",
                lib_path.display(),
                e
            );
            Pdfium::bind_to_system_library()
        })
        .map_err(|e| {
            Pdf2ImgError::LibraryLoad(format!(
                "could not bind pdfium from '{}' or the system library: {:?}",
                dir.display(),
                e
            ))
        })?;
    debug!("Bound pdfium");
    Ok(Arc::new(PdfiumEngine::new(Pdfium::new(bindings))))
}
