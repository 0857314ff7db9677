//! Content type registry and per-kind content pipeline.

mod markdown;
mod pipeline;
mod preview;
mod registry;
mod validate;

pub use markdown::render_markdown;
pub use pipeline::{AttachmentUpload, ContentPipeline, ContentSubmission, UploadedFile};
pub use preview::{PreviewGenerator, Previewable, previewable};
pub use registry::{CONTENT_TYPES, ERROR_TEMPLATE, TypeDescriptor, UNSUPPORTED, is_known, resolve};
pub use validate::{validate_image, validate_pdf};

use thiserror::Error;

/// Content pipeline errors.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The submitted kind tag is not a registry key.
    #[error("unknown content type: {0:?}")]
    UnknownKind(String),

    /// Magic-byte sniffing did not match the expected type.
    #[error("unsupported file type")]
    UnsupportedFileType,

    /// The filename extension did not match the expected type.
    #[error("unacceptable file extension")]
    UnacceptableExtension,

    /// An attachment row was submitted without an image file.
    #[error("attachment {0} has no image file")]
    EmptyAttachment(usize),

    /// Attachments were submitted for a kind outside the allowed set.
    #[error("content type {0:?} does not allow image attachments")]
    AttachmentsNotAllowed(String),

    /// A required form field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The video URL is not a recognized YouTube URL.
    #[error("invalid video url: {0:?}")]
    InvalidVideoUrl(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
