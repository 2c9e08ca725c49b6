//! Markup normalization for content-keyed matching.
//!
//! Two fragments are "the same content" when their normalized forms are equal:
//! trimmed, internal whitespace runs collapsed to one space, ASCII-lowercased.
//! This deliberately erases formatting differences introduced by editors and
//! by LLM-emitted proposals while keeping tag structure significant.

/// Normalize a markup string for index keys and resolver comparisons.
pub fn normalize_markup(markup: &str) -> String {
    markup
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Text content of a markup fragment with all tags removed.
///
/// A plain scan is enough here: this feeds the text-content fallback key,
/// which is itself normalized afterwards.
pub fn text_of_markup(markup: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(
            normalize_markup("  <P>Hello   World</P>\n"),
            "<p>hello world</p>"
        );
    }

    #[test]
    fn test_normalize_equates_reformatted_fragments() {
        let a = normalize_markup("<p>Some text</p>");
        let b = normalize_markup("<p>\n  Some   text\n</p>");
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_of_markup_strips_tags() {
        assert_eq!(text_of_markup("<p>Hello <b>world</b></p>"), "Hello world");
    }
}
