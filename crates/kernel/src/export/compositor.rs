//! Export compositor.
//!
//! Assembles favorited content into one LaTeX document and compiles it
//! with the external toolchain. Compilation is two-pass: if the first run
//! logs errors, the document is re-rendered with an error summary and
//! compiled again, so the user still receives an openable PDF alongside
//! the diagnostics. Each call works in its own scratch directory, removed
//! on every exit path.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tera::Tera;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::content::{ERROR_TEMPLATE, UNSUPPORTED, is_known, resolve};
use crate::file::{FileStorage, LocalFileStorage};
use crate::models::{Content, Course, ImageAttachment, Payload, Profile, Topic};

use super::tex::{register_filters, scan_errors, tex_escape};

/// Fixed output filename of a stdin-driven compiler run.
const OUTPUT_FILENAME: &str = "texput.pdf";

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The compiler produced no output file even after the diagnostics pass.
    #[error("compilation failed: compiler produced no output")]
    CompilationFailed,

    /// One compiler pass exceeded the configured timeout.
    #[error("compilation timed out")]
    CompilationTimeout,

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// One content item prepared for export.
#[derive(Debug, Clone)]
pub struct ExportItem {
    pub content: Content,
    pub payload: Option<Payload>,
    pub attachments: Vec<ImageAttachment>,
    pub topic_title: String,
}

/// A compiled export document.
pub struct CompiledDocument {
    /// Compiled PDF bytes.
    pub pdf: Vec<u8>,

    /// Compiler log of the final pass.
    pub log: String,

    /// Escaped error lines found in the first pass; empty on clean compiles.
    pub errors: Vec<String>,

    /// The LaTeX source of the final pass.
    pub source: Vec<u8>,
}

/// Assembles and compiles export documents.
pub struct ExportCompositor {
    tera: Tera,
    latex_bin: PathBuf,
    timeout: Duration,
    storage: Arc<LocalFileStorage>,
}

impl ExportCompositor {
    /// Create a compositor loading templates from the given directory.
    pub fn new(
        templates_dir: &std::path::Path,
        latex_bin: PathBuf,
        timeout: Duration,
        storage: Arc<LocalFileStorage>,
    ) -> Result<Self, ExportError> {
        let pattern = templates_dir.join("**").join("*.tex");
        let mut tera = Tera::new(&pattern.to_string_lossy())?;
        tera.autoescape_on(vec![]);
        register_filters(&mut tera);

        Ok(Self {
            tera,
            latex_bin,
            timeout,
            storage,
        })
    }

    /// Compose and compile a user's coursebook for a course.
    ///
    /// Items are rendered in the order given (favorite insertion order);
    /// an unrecognized kind yields an inline notice, never an abort.
    pub async fn compose_coursebook(
        &self,
        course: &Course,
        user: &Profile,
        items: &[ExportItem],
    ) -> Result<CompiledDocument, ExportError> {
        self.compose(&course.title, &user.display_name, items, true)
            .await
    }

    /// Compose and compile a single content item (content preview download
    /// and ingest-time LaTeX compilation).
    pub async fn compose_single(
        &self,
        topic: &Topic,
        user: &Profile,
        item: &ExportItem,
    ) -> Result<CompiledDocument, ExportError> {
        self.compose(&topic.title, &user.display_name, std::slice::from_ref(item), false)
            .await
    }

    async fn compose(
        &self,
        title: &str,
        author: &str,
        items: &[ExportItem],
        export_pdf: bool,
    ) -> Result<CompiledDocument, ExportError> {
        let head = self.render_head(title, author)?;

        let mut source = head.clone();
        for item in items {
            source.extend_from_slice(&self.render_fragment(item, export_pdf));
        }
        source.extend_from_slice(b"\\end{document}");

        let (pdf, log) = self.compile_pass(&source).await?;

        let errors = scan_errors(&log);
        if errors.is_empty() {
            let pdf = pdf.ok_or(ExportError::CompilationFailed)?;
            info!(items = items.len(), "export compiled");
            return Ok(CompiledDocument {
                pdf,
                log,
                errors,
                source,
            });
        }

        // Second pass: the first run's log is the useful diagnostic, but
        // the user-facing document should still open. Re-render with the
        // error summary and compile once more.
        debug!(errors = errors.len(), "recompiling with diagnostics");

        let mut source = head;
        source.extend_from_slice(&self.render_error_fragment(&errors, export_pdf)?);
        source.extend_from_slice(b"\\end{document}");

        let (pdf, log) = self.compile_pass(&source).await?;
        let pdf = pdf.ok_or(ExportError::CompilationFailed)?;

        info!(
            items = items.len(),
            errors = errors.len(),
            "export compiled with diagnostics"
        );
        Ok(CompiledDocument {
            pdf,
            log,
            errors,
            source,
        })
    }

    /// Render the document head (preamble and title page).
    fn render_head(&self, title: &str, author: &str) -> Result<Vec<u8>, ExportError> {
        let mut context = tera::Context::new();
        context.insert("title", title);
        context.insert("author", author);
        Ok(self.tera.render("export/base.tex", &context)?.into_bytes())
    }

    /// Render one item's export fragment.
    ///
    /// Degrades per item: an unrecognized kind, a missing payload, or a
    /// template failure all produce a visible notice fragment instead of
    /// failing the document.
    pub fn render_fragment(&self, item: &ExportItem, export_pdf: bool) -> Vec<u8> {
        let descriptor = resolve(&item.content.kind);

        let rendered = match &item.payload {
            Some(payload) if is_known(&item.content.kind) => {
                self.render_payload_fragment(descriptor.template, item, payload, export_pdf)
            }
            _ => self.render_notice_fragment(item),
        };

        match rendered {
            Ok(fragment) => fragment.into_bytes(),
            Err(e) => {
                warn!(content_id = item.content.id, error = %e, "fragment render failed");
                self.render_notice_fragment(item)
                    .map(String::into_bytes)
                    .unwrap_or_else(|_| fallback_notice(&item.content.kind))
            }
        }
    }

    fn render_payload_fragment(
        &self,
        template: &str,
        item: &ExportItem,
        payload: &Payload,
        export_pdf: bool,
    ) -> Result<String, ExportError> {
        let mut context = tera::Context::new();
        context.insert("content", &item.content);
        context.insert("topic_title", &item.topic_title);
        context.insert("export_pdf", &export_pdf);
        context.insert("payload", payload);

        match payload {
            Payload::Image(image) => {
                context.insert("path", &self.tex_path(&image.image_uri)?);
            }
            Payload::Pdf(pdf) => {
                context.insert("path", &self.tex_path(&pdf.pdf_uri)?);
            }
            Payload::Latex(latex) => {
                context.insert("path", &self.tex_path(&latex.pdf_uri)?);
            }
            Payload::Exercise(exercise) => {
                context.insert("path", &self.tex_path(&exercise.task_uri)?);
                if let Some(solution_uri) = &exercise.solution_uri {
                    context.insert("solution_path", &self.tex_path(solution_uri)?);
                }
            }
            Payload::Youtube(youtube) => {
                context.insert("video_id", &youtube.video_id().unwrap_or_default());
                context.insert("start", &json!(split_time(youtube.start_time)));
                context.insert("end", &json!(split_time(youtube.end_time)));
            }
            Payload::Text(_) | Payload::Markdown(_) => {}
        }

        let mut fragment = self.tera.render(template, &context)?;

        // Replace `Image-<n>` placeholders with the stored image paths.
        for attachment in &item.attachments {
            let path = self.tex_path(&attachment.image_uri)?;
            let pattern = regex::Regex::new(&format!(
                r"\\includegraphics(\[[^\]]*\])?\{{Image-{}\}}",
                attachment.ordinal
            ))
            .map_err(|e| anyhow::anyhow!("placeholder regex: {e}"))?;
            fragment = pattern
                .replace_all(&fragment, format!(r"\includegraphics$1{{{path}}}"))
                .into_owned();
        }

        Ok(fragment)
    }

    fn render_notice_fragment(&self, item: &ExportItem) -> Result<String, ExportError> {
        let mut context = tera::Context::new();
        context.insert("content", &item.content);
        context.insert("topic_title", &item.topic_title);
        context.insert("kind", &tex_escape(&item.content.kind));
        Ok(self.tera.render(UNSUPPORTED.template, &context)?)
    }

    fn render_error_fragment(
        &self,
        errors: &[String],
        export_pdf: bool,
    ) -> Result<Vec<u8>, ExportError> {
        let mut context = tera::Context::new();
        context.insert("errors", errors);
        context.insert("count", &errors.len());
        context.insert("export_pdf", &export_pdf);
        Ok(self.tera.render(ERROR_TEMPLATE, &context)?.into_bytes())
    }

    /// Absolute path of a stored file, with backslashes normalized for TeX.
    fn tex_path(&self, uri: &str) -> Result<String, ExportError> {
        let path = self.storage.absolute_path(uri)?;
        Ok(path.to_string_lossy().replace('\\', "/"))
    }

    /// Run one compiler pass in a fresh scratch directory.
    ///
    /// Returns the output PDF (None if the compiler produced none) and the
    /// textual log. The scratch directory and everything in it is removed
    /// when this function returns, success or failure.
    async fn compile_pass(&self, source: &[u8]) -> Result<(Option<Vec<u8>>, String), ExportError> {
        let scratch = tempfile::tempdir()?;

        let mut child = Command::new(&self.latex_bin)
            .arg("-interaction=nonstopmode")
            .current_dir(scratch.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let source = source.to_vec();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&source).await {
                    warn!(error = %e, "failed to feed compiler stdin");
                }
                // stdin drops here, signalling EOF to the compiler
            });
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!("compiler pass exceeded timeout, killing");
                ExportError::CompilationTimeout
            })??;

        let log = String::from_utf8_lossy(&output.stdout).into_owned();

        let pdf_path = scratch.path().join(OUTPUT_FILENAME);
        let pdf = match tokio::fs::read(&pdf_path).await {
            Ok(bytes) => Some(bytes),
            Err(_) => None,
        };

        debug!(
            status = %output.status,
            pdf = pdf.is_some(),
            "compiler pass finished"
        );

        Ok((pdf, log))
    }
}

/// Split a second count into (hours, minutes, seconds).
fn split_time(total_seconds: i32) -> (i32, i32, i32) {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    (hours, minutes, seconds)
}

/// Last-resort notice when even the notice template fails to render.
fn fallback_notice(kind: &str) -> Vec<u8> {
    format!(
        "\\par\\textbf{{Content of type {} is not supported.}}\\par\n",
        tex_escape(kind)
    )
    .into_bytes()
}

impl std::fmt::Debug for ExportCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCompositor")
            .field("latex_bin", &self.latex_bin)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn split_time_breaks_down_seconds() {
        assert_eq!(split_time(0), (0, 0, 0));
        assert_eq!(split_time(59), (0, 0, 59));
        assert_eq!(split_time(61), (0, 1, 1));
        assert_eq!(split_time(3661), (1, 1, 1));
    }

    #[test]
    fn fallback_notice_escapes_kind() {
        let notice = String::from_utf8(fallback_notice("bad_type")).unwrap();
        assert!(notice.contains(r"bad\_type"));
    }
}
