//! Markdown rendering for web display.

use pulldown_cmark::{Options, Parser, html};
use regex::Regex;
use std::sync::LazyLock;

use crate::models::ImageAttachment;

/// Matches `![alt](Image-<n>)` attachment placeholders in markdown bodies.
static IMAGE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    let regex = Regex::new(r"!\[([^\]]*)\]\(Image-(\d+)\)").expect("placeholder regex is valid");
    regex
});

/// Render a markdown body to sanitized HTML, resolving `Image-<n>`
/// placeholders against the item's stored attachments.
///
/// `resolve_url` maps an attachment to its public URL.
pub fn render_markdown(
    body: &str,
    attachments: &[ImageAttachment],
    resolve_url: impl Fn(&ImageAttachment) -> String,
) -> String {
    let resolved = IMAGE_PLACEHOLDER.replace_all(body, |caps: &regex::Captures<'_>| {
        let alt = &caps[1];
        let ordinal: usize = caps[2].parse().unwrap_or(usize::MAX);
        match attachments.iter().find(|a| a.ordinal as usize == ordinal) {
            Some(attachment) => format!("![{}]({})", alt, resolve_url(attachment)),
            None => caps[0].to_string(),
        }
    });

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(&resolved, options);

    let mut raw = String::new();
    html::push_html(&mut raw, parser);

    ammonia::clean(&raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn attachment(ordinal: i32) -> ImageAttachment {
        ImageAttachment {
            id: ordinal as i64 + 1,
            content_id: 1,
            ordinal,
            image_uri: format!("local://contents/img{ordinal}.png"),
            source: "someone".to_string(),
            license: None,
        }
    }

    #[test]
    fn renders_basic_markdown() {
        let out = render_markdown("# Title\n\nSome *text*.", &[], |_| String::new());
        assert!(out.contains("<h1>"));
        assert!(out.contains("<em>text</em>"));
    }

    #[test]
    fn resolves_image_placeholders() {
        let attachments = vec![attachment(0)];
        let out = render_markdown("![figure](Image-0)", &attachments, |a| {
            format!("/files/{}", a.ordinal)
        });
        assert!(out.contains(r#"src="/files/0""#));
    }

    #[test]
    fn leaves_unknown_placeholders_alone() {
        let out = render_markdown("![figure](Image-7)", &[], |_| String::new());
        // No attachment 7: the placeholder text survives as the link target.
        assert!(out.contains("Image-7"));
    }

    #[test]
    fn strips_script_tags() {
        let out = render_markdown("hello <script>alert(1)</script>", &[], |_| String::new());
        assert!(!out.contains("<script>"));
    }
}
