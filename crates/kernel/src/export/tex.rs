//! LaTeX escaping and compile-log scanning.

use tera::Tera;

/// Marker prefixing error lines in the compiler log.
const ERROR_PREFIX: char = '!';

/// Escape a string for safe inclusion in LaTeX source.
///
/// The mapping must be exact: one unescaped control character corrupts
/// the whole document, not just the field it appears in.
pub fn tex_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str(r"\&"),
            '%' => out.push_str(r"\%"),
            '$' => out.push_str(r"\$"),
            '#' => out.push_str(r"\#"),
            '_' => out.push_str(r"\_"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\^{}"),
            '\\' => out.push_str(r"\textbackslash{}"),
            '<' => out.push_str(r"\textless{}"),
            '>' => out.push_str(r"\textgreater{}"),
            '\n' => out.push_str(r"\newline "),
            _ => out.push(c),
        }
    }
    out
}

/// Extract error messages from a compiler log.
///
/// LaTeX marks errors with a `!` prefix; everything from the marker to the
/// end of the line is kept, duplicates are dropped, and each message is
/// escaped so it can be typeset in the diagnostics pass.
pub fn scan_errors(log: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for line in log.lines() {
        if let Some(index) = line.find(ERROR_PREFIX) {
            let message = &line[index..];
            if found.iter().any(|seen| seen == message) {
                continue;
            }
            found.push(message.to_string());
        }
    }
    found.into_iter().map(|m| tex_escape(&m)).collect()
}

/// Register the `tex_escape` filter on a Tera instance.
pub fn register_filters(tera: &mut Tera) {
    tera.register_filter(
        "tex_escape",
        |value: &tera::Value, _args: &std::collections::HashMap<String, tera::Value>| {
            let text = tera::try_get_value!("tex_escape", "value", String, value);
            Ok(tera::Value::String(tex_escape(&text)))
        },
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn escapes_every_special_character() {
        let cases = [
            ("&", r"\&"),
            ("%", r"\%"),
            ("$", r"\$"),
            ("#", r"\#"),
            ("_", r"\_"),
            ("{", r"\{"),
            ("}", r"\}"),
            ("~", r"\textasciitilde{}"),
            ("^", r"\^{}"),
            ("\\", r"\textbackslash{}"),
            ("<", r"\textless{}"),
            (">", r"\textgreater{}"),
            ("\n", r"\newline "),
        ];
        for (input, expected) in cases {
            assert_eq!(tex_escape(input), expected, "escaping {input:?}");
        }
    }

    #[test]
    fn leaves_safe_text_alone() {
        assert_eq!(tex_escape("plain text 123"), "plain text 123");
    }

    #[test]
    fn escapes_mixed_content() {
        assert_eq!(
            tex_escape("50% of $10 & more"),
            r"50\% of \$10 \& more"
        );
    }

    #[test]
    fn scan_finds_and_escapes_error_lines() {
        let log = "This is pdfTeX\n! Undefined control sequence.\nl.5 \\foo\n";
        let errors = scan_errors(log);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("! Undefined"));
    }

    #[test]
    fn scan_dedupes_and_starts_at_marker() {
        let log = "noise ! Missing $ inserted.\n! Missing $ inserted.\nall good\n";
        let errors = scan_errors(log);
        assert_eq!(errors.len(), 1);
        // Everything from the marker onward is kept, escaped.
        assert_eq!(errors[0], r"! Missing \$ inserted.");
    }

    #[test]
    fn scan_returns_empty_for_clean_log() {
        assert!(scan_errors("Output written on texput.pdf (1 page).").is_empty());
    }
}
