//! Content type registry.
//!
//! The single source of truth mapping a kind tag to its behavior: the
//! export template, whether image attachments are permitted, and whether a
//! preview can be rendered. The set is closed; resolution never fails.

/// Behavior descriptor of one content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Kind tag stored on content rows.
    pub tag: &'static str,

    /// Human-readable label.
    pub label: &'static str,

    /// Tera template rendering the export fragment.
    pub template: &'static str,

    /// May this kind hold embedded image attachments?
    pub allows_attachments: bool,

    /// Is a raster preview generated from this kind's payload?
    pub previewable: bool,
}

/// All registered content kinds.
pub const CONTENT_TYPES: &[TypeDescriptor] = &[
    TypeDescriptor {
        tag: "textfield",
        label: "Textfield",
        template: "export/textfield.tex",
        allows_attachments: true,
        previewable: false,
    },
    TypeDescriptor {
        tag: "latex",
        label: "Latex Textfield",
        template: "export/latex.tex",
        allows_attachments: true,
        previewable: true,
    },
    TypeDescriptor {
        tag: "markdown",
        label: "Markdown",
        template: "export/markdown.tex",
        allows_attachments: true,
        previewable: false,
    },
    TypeDescriptor {
        tag: "image",
        label: "Single Image",
        template: "export/image.tex",
        allows_attachments: false,
        previewable: false,
    },
    TypeDescriptor {
        tag: "pdf",
        label: "PDF",
        template: "export/pdf.tex",
        allows_attachments: false,
        previewable: true,
    },
    TypeDescriptor {
        tag: "youtube",
        label: "YouTube Video",
        template: "export/youtube.tex",
        allows_attachments: false,
        previewable: false,
    },
    TypeDescriptor {
        tag: "exercise",
        label: "Exercise",
        template: "export/exercise.tex",
        allows_attachments: false,
        previewable: true,
    },
];

/// Sentinel descriptor for unknown tags: export renders a visible
/// "unsupported type" notice instead of failing.
pub const UNSUPPORTED: TypeDescriptor = TypeDescriptor {
    tag: "unsupported",
    label: "Unsupported",
    template: "export/invalid.tex",
    allows_attachments: false,
    previewable: false,
};

/// Template rendering the compile-error summary on the export's second pass.
pub const ERROR_TEMPLATE: &str = "export/error.tex";

/// Resolve a kind tag. Total: unknown tags resolve to [`UNSUPPORTED`].
pub fn resolve(tag: &str) -> &'static TypeDescriptor {
    CONTENT_TYPES
        .iter()
        .find(|descriptor| descriptor.tag == tag)
        .unwrap_or(&UNSUPPORTED)
}

/// Is the tag a registered content kind?
pub fn is_known(tag: &str) -> bool {
    CONTENT_TYPES.iter().any(|descriptor| descriptor.tag == tag)
}
