#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Export pipeline integration tests.
//!
//! Escaping and log scanning are pure; fragment rendering uses the real
//! templates; the full two-pass compile runs only when a LaTeX toolchain
//! is installed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use coursebook_kernel::export::{ExportCompositor, ExportItem, scan_errors, tex_escape};
use coursebook_kernel::file::LocalFileStorage;
use coursebook_kernel::models::{
    Content, Course, LatexPayload, Payload, Profile, TextPayload, Topic,
};

fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

fn compositor(scratch: &std::path::Path) -> ExportCompositor {
    let storage = Arc::new(LocalFileStorage::new(scratch, "/files"));
    ExportCompositor::new(
        &templates_dir(),
        PathBuf::from("pdflatex"),
        Duration::from_secs(120),
        storage,
    )
    .expect("compositor initializes from bundled templates")
}

fn content(kind: &str) -> Content {
    Content {
        id: 1,
        topic_id: 1,
        author_id: 1,
        kind: kind.to_string(),
        description: "A & B".to_string(),
        language: "en".to_string(),
        readonly: false,
        public: false,
        preview_uri: None,
        created: 0,
        changed: 0,
    }
}

fn text_item(body: &str) -> ExportItem {
    ExportItem {
        content: content("textfield"),
        payload: Some(Payload::Text(TextPayload {
            content_id: 1,
            body: body.to_string(),
            source: "lecture notes".to_string(),
            license: None,
        })),
        attachments: Vec::new(),
        topic_title: "Graphs".to_string(),
    }
}

fn latex_item(body: &str) -> ExportItem {
    ExportItem {
        content: content("latex"),
        payload: Some(Payload::Latex(LatexPayload {
            content_id: 1,
            body: body.to_string(),
            source: String::new(),
            pdf_uri: String::new(),
        })),
        attachments: Vec::new(),
        topic_title: "Graphs".to_string(),
    }
}

async fn latex_available() -> bool {
    match tokio::process::Command::new("pdflatex")
        .arg("--version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => {
            eprintln!("skipping: pdflatex not installed");
            false
        }
    }
}

// -------------------------------------------------------------------------
// Escaping
// -------------------------------------------------------------------------

#[test]
fn escape_map_is_exact() {
    assert_eq!(
        tex_escape("100% _sure_ & $ready$ #1 {ok} <tag> ~x^ \\"),
        r"100\% \_sure\_ \& \$ready\$ \#1 \{ok\} \textless{}tag\textgreater{} \textasciitilde{}x\^{} \textbackslash{}"
    );
    assert_eq!(tex_escape("line\nbreak"), r"line\newline break");
}

#[test]
fn scan_errors_escapes_and_dedupes() {
    let log = "ok line\n! Undefined control sequence.\n! Undefined control sequence.\nmid ! Missing $ inserted\n";
    let errors = scan_errors(log);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], "! Undefined control sequence.");
    assert_eq!(errors[1], r"! Missing \$ inserted");
}

// -------------------------------------------------------------------------
// Fragment rendering against the real templates
// -------------------------------------------------------------------------

#[test]
fn text_fragment_escapes_free_text() {
    let scratch = tempfile::tempdir().unwrap();
    let compositor = compositor(scratch.path());

    let fragment = compositor.render_fragment(&text_item("50% of $10 & more"), true);
    let rendered = String::from_utf8(fragment).unwrap();

    assert!(rendered.contains(r"50\% of \$10 \& more"));
    assert!(rendered.contains(r"A \& B"));
    assert!(rendered.contains("Graphs"));
}

#[test]
fn latex_fragment_keeps_body_raw() {
    let scratch = tempfile::tempdir().unwrap();
    let compositor = compositor(scratch.path());

    let fragment = compositor.render_fragment(&latex_item(r"$e^{i\pi} = -1$"), true);
    let rendered = String::from_utf8(fragment).unwrap();

    assert!(rendered.contains(r"$e^{i\pi} = -1$"));
}

#[test]
fn unknown_kind_renders_visible_notice() {
    let scratch = tempfile::tempdir().unwrap();
    let compositor = compositor(scratch.path());

    let item = ExportItem {
        content: content("hologram"),
        payload: None,
        attachments: Vec::new(),
        topic_title: "Graphs".to_string(),
    };

    let fragment = compositor.render_fragment(&item, true);
    let rendered = String::from_utf8(fragment).unwrap();

    assert!(rendered.contains("not supported"));
    assert!(rendered.contains("hologram"));
}

// -------------------------------------------------------------------------
// Two-pass compilation (skipped without a LaTeX toolchain)
// -------------------------------------------------------------------------

#[tokio::test]
async fn clean_document_compiles_in_one_pass() {
    if !latex_available().await {
        return;
    }

    let scratch = tempfile::tempdir().unwrap();
    let compositor = compositor(scratch.path());

    let course = Course {
        id: 1,
        title: "Discrete Mathematics".to_string(),
        description: String::new(),
        category_id: 1,
        period_id: None,
        image_uri: None,
        restrict_changes: false,
        created: 0,
    };
    let user = Profile {
        id: 1,
        username: "tester".to_string(),
        display_name: "Tester".to_string(),
        biography: None,
        created: 0,
    };

    let document = compositor
        .compose_coursebook(&course, &user, &[text_item("All good here.")])
        .await
        .unwrap();

    assert!(document.pdf.starts_with(b"%PDF"));
    assert!(document.errors.is_empty());
}

#[tokio::test]
async fn failing_document_recompiles_with_diagnostics() {
    if !latex_available().await {
        return;
    }

    let scratch = tempfile::tempdir().unwrap();
    let compositor = compositor(scratch.path());

    let topic = Topic {
        id: 1,
        title: "Graphs".to_string(),
        category_id: 1,
    };
    let user = Profile {
        id: 1,
        username: "tester".to_string(),
        display_name: "Tester".to_string(),
        biography: None,
        created: 0,
    };

    // A LaTeX body guaranteed to fail the first pass.
    let item = latex_item(r"\thiscommanddoesnotexist");

    let document = compositor
        .compose_single(&topic, &user, &item)
        .await
        .unwrap();

    // The returned binary is still a PDF, and the log surfaced at least
    // one escaped error line.
    assert!(document.pdf.starts_with(b"%PDF"));
    assert!(!document.errors.is_empty());
    assert!(document.errors.iter().any(|e| e.starts_with('!')));
}

#[tokio::test]
async fn mixed_document_with_unknown_kind_still_compiles() {
    if !latex_available().await {
        return;
    }

    let scratch = tempfile::tempdir().unwrap();
    let compositor = compositor(scratch.path());

    let course = Course {
        id: 1,
        title: "Mixed".to_string(),
        description: String::new(),
        category_id: 1,
        period_id: None,
        image_uri: None,
        restrict_changes: false,
        created: 0,
    };
    let user = Profile {
        id: 1,
        username: "tester".to_string(),
        display_name: "Tester".to_string(),
        biography: None,
        created: 0,
    };

    let unknown = ExportItem {
        content: content("hologram"),
        payload: None,
        attachments: Vec::new(),
        topic_title: "Mystery".to_string(),
    };

    let document = compositor
        .compose_coursebook(&course, &user, &[text_item("First."), unknown, text_item("Last.")])
        .await
        .unwrap();

    assert!(document.pdf.starts_with(b"%PDF"));
    // The notice is part of the final source even though the kind is unknown.
    let source = String::from_utf8_lossy(&document.source);
    assert!(source.contains("not supported"));
    assert!(source.contains("First."));
    assert!(source.contains("Last."));
}
