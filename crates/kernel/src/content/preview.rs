//! Preview generation for page-based content.
//!
//! PDF-backed payloads get a raster preview of their first page; the
//! rasterizer is an external process invoked with a two-page limit to
//! bound cost on large documents. Kinds without a meaningful preview
//! simply do not implement [`Previewable`].

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::debug;

use crate::file::{FileStorage, LocalFileStorage, sanitize_filename};
use crate::models::{ExercisePayload, LatexPayload, Payload, PdfPayload};

/// Capability of payloads that can be rendered to a raster preview.
pub trait Previewable {
    /// Storage URI of the PDF the preview is rasterized from.
    fn preview_pdf_uri(&self) -> &str;
}

impl Previewable for PdfPayload {
    fn preview_pdf_uri(&self) -> &str {
        &self.pdf_uri
    }
}

impl Previewable for LatexPayload {
    fn preview_pdf_uri(&self) -> &str {
        &self.pdf_uri
    }
}

impl Previewable for ExercisePayload {
    fn preview_pdf_uri(&self) -> &str {
        &self.task_uri
    }
}

/// The previewable view of a payload, if its kind has one.
pub fn previewable(payload: &Payload) -> Option<&(dyn Previewable + Send + Sync)> {
    match payload {
        Payload::Pdf(pdf) => Some(pdf),
        Payload::Latex(latex) => Some(latex),
        Payload::Exercise(exercise) => Some(exercise),
        _ => None,
    }
}

/// Rasterizes page 1 of stored PDFs into the preview directory.
pub struct PreviewGenerator {
    rasterizer_bin: PathBuf,
    storage: Arc<LocalFileStorage>,
    previews_dir: String,
}

impl PreviewGenerator {
    /// Create a new preview generator.
    pub fn new(
        rasterizer_bin: PathBuf,
        storage: Arc<LocalFileStorage>,
        previews_dir: String,
    ) -> Self {
        Self {
            rasterizer_bin,
            storage,
            previews_dir,
        }
    }

    /// Rasterize page 1 of the PDF at `pdf_uri` to `<stem>.jpg` in the
    /// preview directory (created on demand) and return the preview URI.
    ///
    /// The rasterizer runs with a page limit of 2; only page 1 is kept.
    /// Re-generating for the same stem overwrites the previous preview.
    pub async fn generate(&self, pdf_uri: &str, stem: &str) -> Result<String> {
        let pdf_path = self.storage.absolute_path(pdf_uri)?;
        let scratch = tempfile::tempdir().context("failed to create rasterizer scratch dir")?;
        let out_prefix = scratch.path().join("page");

        let status = Command::new(&self.rasterizer_bin)
            .arg("-png")
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg("2")
            .arg(&pdf_path)
            .arg(&out_prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .context("failed to run pdf rasterizer")?;

        if !status.success() {
            bail!("pdf rasterizer exited with {status}");
        }

        // Output filenames carry a page-number suffix whose padding depends
        // on the document, so pick the lexicographically first page file.
        let mut pages: Vec<PathBuf> = std::fs::read_dir(scratch.path())
            .context("failed to read rasterizer output dir")?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        pages.sort();

        let Some(first_page) = pages.first() else {
            bail!("pdf rasterizer produced no pages");
        };

        let raster = image::open(first_page).context("failed to decode rasterized page")?;
        let mut jpeg = Vec::new();
        raster
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .context("failed to encode preview jpeg")?;

        let preview_uri = format!(
            "local://{}/{}.jpg",
            self.previews_dir.trim_matches('/'),
            sanitize_filename(stem)
        );
        self.storage.write(&preview_uri, &jpeg).await?;

        debug!(pdf = %pdf_uri, preview = %preview_uri, "preview generated");
        Ok(preview_uri)
    }
}

impl std::fmt::Debug for PreviewGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewGenerator")
            .field("rasterizer_bin", &self.rasterizer_bin)
            .field("previews_dir", &self.previews_dir)
            .finish()
    }
}
