//! Parsing of accumulated generation text into code artifacts.
//!
//! Text-mode responses arrive as markdown with fenced code blocks.
//! HTML is required; a response without a fence still counts when it is
//! a bare document. CSS and JS are optional and default to empty.

use std::sync::OnceLock;

use regex::Regex;

use forge_core::{CodeArtifact, GenMode};

use crate::error::{GenError, GenResult};

fn fence_regex(lang: &'static str) -> &'static Regex {
    // One cached regex per supported language
    static HTML: OnceLock<Regex> = OnceLock::new();
    static CSS: OnceLock<Regex> = OnceLock::new();
    static JS: OnceLock<Regex> = OnceLock::new();
    let (cell, pattern) = match lang {
        "html" => (&HTML, r"(?s)```html\s*(.*?)```"),
        "css" => (&CSS, r"(?s)```css\s*(.*?)```"),
        _ => (&JS, r"(?s)```(?:js|javascript)\s*(.*?)```"),
    };
    cell.get_or_init(|| Regex::new(pattern).expect("static fence pattern"))
}

fn extract_fence(lang: &'static str, text: &str) -> Option<String> {
    fence_regex(lang)
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pull the HTML document out of a response: fenced block first, then the
/// whole text when it already reads as markup.
fn extract_html(text: &str) -> Option<String> {
    if let Some(html) = extract_fence("html", text) {
        return Some(html);
    }
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    if lower.contains("<!doctype") || lower.contains("<html") {
        return Some(trimmed.to_string());
    }
    None
}

/// Parse accumulated text into the artifact shape for a text mode.
///
/// Project modes never come through here; their files are written as a
/// side effect of tool calls during streaming.
pub fn parse(mode: GenMode, text: &str) -> GenResult<CodeArtifact> {
    match mode {
        GenMode::Html => {
            let html = extract_html(text).ok_or_else(|| {
                GenError::Validation("response contains no HTML document".into())
            })?;
            Ok(CodeArtifact::Html { html })
        }
        GenMode::MultiFile => {
            let html = extract_html(text).ok_or_else(|| {
                GenError::Validation("response contains no HTML document".into())
            })?;
            let css = extract_fence("css", text).unwrap_or_default();
            let js = extract_fence("js", text).unwrap_or_default();
            Ok(CodeArtifact::MultiFile { html, css, js })
        }
        GenMode::VueProject | GenMode::ReactProject => Err(GenError::Validation(format!(
            "mode {} writes files through tool calls and has no text to parse",
            mode
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "Here is your page.\n\
        ```html\n<html><body>hi</body></html>\n```\n\
        ```css\nbody { margin: 0; }\n```\n\
        ```js\nconsole.log('hi');\n```\n";

    #[test]
    fn test_parse_multi_file() {
        let artifact = parse(GenMode::MultiFile, RESPONSE).unwrap();
        match artifact {
            CodeArtifact::MultiFile { html, css, js } => {
                assert_eq!(html, "<html><body>hi</body></html>");
                assert_eq!(css, "body { margin: 0; }");
                assert_eq!(js, "console.log('hi');");
            }
            other => panic!("unexpected artifact: {:?}", other),
        }
    }

    #[test]
    fn test_missing_css_js_default_empty() {
        let artifact = parse(GenMode::MultiFile, "```html\n<html></html>\n```").unwrap();
        match artifact {
            CodeArtifact::MultiFile { css, js, .. } => {
                assert!(css.is_empty());
                assert!(js.is_empty());
            }
            other => panic!("unexpected artifact: {:?}", other),
        }
    }

    #[test]
    fn test_bare_document_accepted() {
        let artifact = parse(GenMode::Html, "<!DOCTYPE html><html></html>").unwrap();
        assert!(matches!(artifact, CodeArtifact::Html { .. }));
    }

    #[test]
    fn test_missing_html_rejected() {
        let err = parse(GenMode::Html, "sorry, I could not help with that").unwrap_err();
        assert!(matches!(err, GenError::Validation(_)));
        let err = parse(GenMode::MultiFile, "```css\nbody{}\n```").unwrap_err();
        assert!(matches!(err, GenError::Validation(_)));
    }

    #[test]
    fn test_javascript_fence_alias() {
        let text = "```html\n<html></html>\n```\n```javascript\nlet x = 1;\n```";
        match parse(GenMode::MultiFile, text).unwrap() {
            CodeArtifact::MultiFile { js, .. } => assert_eq!(js, "let x = 1;"),
            other => panic!("unexpected artifact: {:?}", other),
        }
    }

    #[test]
    fn test_project_mode_has_no_parse() {
        assert!(parse(GenMode::VueProject, "anything").is_err());
    }
}
