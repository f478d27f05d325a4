//! CLI binary for pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig`, converts one page and writes the PNG.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2img::{ConversionResult, ConverterConfig, InputFile, PdfPageRenderer, DEFAULT_PAGE_NUMBER};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # First page → report.png next to the input
  pdf2img report.pdf

  # Page 3 to an explicit path
  pdf2img --page 3 slides.pdf -o slide3.png

  # Structured result on stdout
  pdf2img --json report.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Directory (or file) of an existing libpdfium
  RUST_LOG                Log filter, e.g. pdf2img=debug
"#;

/// Render one page of a PDF to a PNG image.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Render one page of a PDF to a PNG image",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// 1-based page number.
    #[arg(short, long, env = "PDF2IMG_PAGE", default_value_t = DEFAULT_PAGE_NUMBER)]
    page: usize,

    /// Write the PNG here instead of `<input stem>.png` beside the input.
    #[arg(short, long, env = "PDF2IMG_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory holding the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    library_dir: Option<PathBuf>,

    /// Milliseconds before the encoder fallback kicks in.
    #[arg(long, env = "PDF2IMG_FALLBACK_DELAY_MS", default_value_t = 100)]
    fallback_delay_ms: u64,

    /// Print the conversion result as JSON instead of writing a file.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let renderer = PdfPageRenderer::with_config(config);

    // ── Run conversion ───────────────────────────────────────────────────
    let input = InputFile::from_path(&cli.input);
    let result = renderer.convert_pdf_to_image(&input, cli.page).await;

    if cli.json {
        let (json, failed) = json_report(&result)?;
        println!("{json}");
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let (_url, file) = match result.into_result() {
        Ok(ok) => ok,
        Err(err) => {
            eprintln!("{} {}", red("✘"), err);
            std::process::exit(1);
        }
    };

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, &file.name));

    tokio::fs::write(&output_path, file.bytes())
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} page {} → {}  ({} bytes)",
            green("✔"),
            cli.page,
            bold(&output_path.display().to_string()),
            file.size()
        );
    }

    Ok(())
}

/// Serialise `result` for `--json`; the flag is set when it failed.
///
/// The error text travels inside the JSON only, so the caller exits
/// without printing it again.
fn json_report(result: &ConversionResult) -> Result<(String, bool)> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialise result")?;
    Ok((json, result.error.is_some()))
}

/// Map CLI args to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder().fallback_delay_ms(cli.fallback_delay_ms);
    if let Some(ref dir) = cli.library_dir {
        builder = builder.library_dir(library_dir_of(dir));
    }
    builder.build().context("Invalid configuration")
}

/// `PDFIUM_LIB_PATH` may point at the library file itself.
fn library_dir_of(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

/// Place the derived PNG name next to the input file.
fn default_output_path(input: &Path, png_name: &str) -> PathBuf {
    match input.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(png_name),
        _ => PathBuf::from(png_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf2img::{Blob, ImageFile, Pdf2ImgError, PNG_MIME};

    #[test]
    fn json_failure_carries_error_once() {
        let result = ConversionResult::failure(&Pdf2ImgError::InvalidPageNumber);
        let (json, failed) = json_report(&result).unwrap();
        assert!(failed);
        assert_eq!(json.matches("Invalid page number").count(), 1);
        assert!(json.contains("\"imageUrl\": \"\""));
    }

    #[test]
    fn json_success_has_no_error() {
        let file = ImageFile::new("a.png", Blob::new(vec![1u8, 2], PNG_MIME));
        let result = ConversionResult::success("blob:pdf2img/x".into(), file);
        let (json, failed) = json_report(&result).unwrap();
        assert!(!failed);
        assert!(!json.contains("error"));
        assert!(json.contains("a.png"));
    }

    #[test]
    fn output_defaults_beside_input() {
        assert_eq!(
            default_output_path(Path::new("docs/report.pdf"), "report.png"),
            PathBuf::from("docs/report.png")
        );
        assert_eq!(
            default_output_path(Path::new("report.pdf"), "report.png"),
            PathBuf::from("report.png")
        );
    }
}
