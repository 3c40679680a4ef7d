//! PDF link extraction from markup fragments.
//!
//! Rules run in a fixed order and the first match wins. Unwrap rules (a
//! wrapped `/pdf?url=` target, a URL passed as the second argument of an inline
//! handler) come before the generic URL sniffers, since a bare `.pdf` pattern
//! can also hit unrelated links elsewhere on the page.

use regex::Regex;
use std::sync::OnceLock;

/// What part of a match a rule returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// The first capture group
    Group,
    /// The entire match
    Whole,
}

/// One pattern in the fallback chain
#[derive(Debug)]
pub struct LinkRule {
    pub name: &'static str,
    pattern: Regex,
    capture: Capture,
}

impl LinkRule {
    fn new(name: &'static str, pattern: &str, capture: Capture) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            capture,
        })
    }

    /// Apply this rule alone
    pub fn apply(&self, fragment: &str) -> Option<String> {
        let caps = self.pattern.captures(fragment)?;
        match self.capture {
            // wrapped targets are frequently percent-encoded
            Capture::Group => {
                let raw = caps.get(1)?.as_str();
                Some(
                    urlencoding::decode(raw)
                        .map(|s| s.into_owned())
                        .unwrap_or_else(|_| raw.to_string()),
                )
            }
            Capture::Whole => caps.get(0).map(|m| m.as_str().to_string()),
        }
    }
}

const RULE_SPECS: [(&str, &str, Capture); 5] = [
    ("wrapped_query", r#"/pdf\?url=([^"'&\s)]+)"#, Capture::Group),
    (
        "inline_handler",
        r#"[A-Za-z_$][\w$]*\(\s*[^,()]+,\s*['"](https?://[^'"]+)['"]"#,
        Capture::Group,
    ),
    ("arxiv_direct", r#"https://arxiv\.org/pdf/[^"'&\s)]+"#, Capture::Whole),
    (
        "openreview_direct",
        r#"https://openreview\.net/pdf\?id=[^"'&\s)]+"#,
        Capture::Whole,
    ),
    (
        "generic_pdf",
        r#"https://[^"'&\s)]+\.pdf(?:\?[^"'&\s)]*)?"#,
        Capture::Whole,
    ),
];

static RULES: OnceLock<Vec<LinkRule>> = OnceLock::new();

/// The ordered rule chain
pub fn rules() -> &'static [LinkRule] {
    RULES.get_or_init(|| {
        RULE_SPECS
            .iter()
            .filter_map(|(name, pattern, capture)| match LinkRule::new(name, pattern, *capture) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::error!("Link rule '{}' failed to compile: {}", name, e);
                    None
                }
            })
            .collect()
    })
}

/// Find a document URL in an `onclick` value or an HTML body
pub fn extract_pdf_link(fragment: &str) -> Option<String> {
    rules().iter().find_map(|rule| rule.apply(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static LinkRule {
        rules().iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_all_rules_compile_in_order() {
        let names: Vec<_> = rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "wrapped_query",
                "inline_handler",
                "arxiv_direct",
                "openreview_direct",
                "generic_pdf"
            ]
        );
    }

    #[test]
    fn test_wrapped_query_rule() {
        let html = r#"<a href="/pdf?url=https://arxiv.org/pdf/2401.00001">PDF</a>"#;
        assert_eq!(
            rule("wrapped_query").apply(html).as_deref(),
            Some("https://arxiv.org/pdf/2401.00001")
        );

        let encoded = r#"<a href="/pdf?url=https%3A%2F%2Fexample.org%2Fa.pdf">PDF</a>"#;
        assert_eq!(
            rule("wrapped_query").apply(encoded).as_deref(),
            Some("https://example.org/a.pdf")
        );
    }

    #[test]
    fn test_inline_handler_rule() {
        let onclick = "togglePdf('2401.12345', 'https://arxiv.org/pdf/2401.12345', this)";
        assert_eq!(
            rule("inline_handler").apply(onclick).as_deref(),
            Some("https://arxiv.org/pdf/2401.12345")
        );
        assert!(rule("inline_handler")
            .apply("toggleKimi('2401.12345', this)")
            .is_none());
    }

    #[test]
    fn test_direct_rules_return_whole_match() {
        assert_eq!(
            rule("arxiv_direct")
                .apply(r#"see "https://arxiv.org/pdf/2401.12345v2" now"#)
                .as_deref(),
            Some("https://arxiv.org/pdf/2401.12345v2")
        );
        assert_eq!(
            rule("openreview_direct")
                .apply(r#"href="https://openreview.net/pdf?id=AbC123""#)
                .as_deref(),
            Some("https://openreview.net/pdf?id=AbC123")
        );
        assert_eq!(
            rule("generic_pdf")
                .apply(r#"href="https://proceedings.mlr.press/v202/x23a/x23a.pdf?download=1""#)
                .as_deref(),
            Some("https://proceedings.mlr.press/v202/x23a/x23a.pdf?download=1")
        );
    }

    #[test]
    fn test_wrapped_form_beats_generic_pdf() {
        let html = r#"
            <a href="https://cdn.example.com/unrelated/brochure.pdf">brochure</a>
            <a href="/pdf?url=https://openreview.net/pdf?id=XYZ">paper</a>
        "#;
        assert_eq!(
            extract_pdf_link(html).as_deref(),
            Some("https://openreview.net/pdf?id=XYZ")
        );
    }

    #[test]
    fn test_inline_handler_beats_direct_urls() {
        let html = r#"
            <a href="https://arxiv.org/pdf/1111.11111">old</a>
            <a onclick="togglePdf('x', 'https://arxiv.org/pdf/2222.22222', this)">new</a>
        "#;
        assert_eq!(
            extract_pdf_link(html).as_deref(),
            Some("https://arxiv.org/pdf/2222.22222")
        );
    }

    #[test]
    fn test_no_match() {
        assert!(extract_pdf_link("<p>no links here</p>").is_none());
        assert!(extract_pdf_link("").is_none());
    }
}
