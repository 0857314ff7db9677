//! Typeset export of content into compiled PDF documents.

mod compositor;
mod tex;

pub use compositor::{CompiledDocument, ExportCompositor, ExportError, ExportItem};
pub use tex::{register_filters, scan_errors, tex_escape};
