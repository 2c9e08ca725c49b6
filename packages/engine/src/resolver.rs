//! # Fallback Recursive Resolver
//!
//! Safety net behind the Content Index: a depth-first search over the current
//! working tree (not the baseline) for content the index missed, e.g. nodes
//! freshly inserted by an earlier chain member in the same pass.
//!
//! Strategies run in order of decreasing strictness; within one strategy the
//! first hit in document order wins. The final text+tag strategy only accepts
//! a unique candidate; an ambiguous match is reported, never guessed.

use std::collections::HashSet;

use plaud_markup::{normalize_markup, Dom, NodeId};

use crate::index::PREVIEW_ATTR;

/// Result of a fallback search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOutcome {
    Found(NodeId),
    /// Multiple equally valid text+tag candidates; treated as no match.
    Ambiguous(usize),
    NotFound,
}

/// Element nodes eligible for fallback matching: attached, outside preview
/// wrappers, not yet consumed.
fn candidates(dom: &Dom, used: &HashSet<NodeId>) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![dom.root()];
    while let Some(id) = stack.pop() {
        if dom.attr(id, PREVIEW_ATTR).is_some() {
            continue;
        }
        if dom.is_element(id) && !used.contains(&id) {
            out.push(id);
        }
        for &child in dom.children(id).iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// Depth-first content search for `target` markup.
pub fn find_node_recursive(dom: &Dom, target: &str, used: &HashSet<NodeId>) -> FallbackOutcome {
    let normalized = normalize_markup(target);
    if normalized.is_empty() {
        return FallbackOutcome::NotFound;
    }
    let nodes = candidates(dom, used);

    for &id in &nodes {
        if normalize_markup(&dom.inner_html(id)) == normalized {
            return FallbackOutcome::Found(id);
        }
    }
    for &id in &nodes {
        if normalize_markup(&dom.outer_html(id)) == normalized {
            return FallbackOutcome::Found(id);
        }
    }
    for &id in &nodes {
        if normalize_markup(&dom.outer_html_stripped(id)) == normalized {
            return FallbackOutcome::Found(id);
        }
    }

    // Text + tag, unique-candidate only. Derive the expected tag and text
    // from the target fragment itself.
    let mut scratch = Dom::new();
    let Ok(roots) = scratch.parse_fragment(target) else {
        return FallbackOutcome::NotFound;
    };
    let Some(&fragment_root) = roots.iter().find(|&&id| scratch.is_element(id)) else {
        return FallbackOutcome::NotFound;
    };
    let want_tag = scratch.tag(fragment_root).unwrap_or_default().to_string();
    let want_text = scratch.text_content(fragment_root).trim().to_lowercase();
    if want_text.is_empty() {
        return FallbackOutcome::NotFound;
    }

    let matches: Vec<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&id| {
            dom.tag(id) == Some(want_tag.as_str())
                && dom.text_content(id).trim().to_lowercase() == want_text
        })
        .collect();

    match matches.len() {
        0 => FallbackOutcome::NotFound,
        1 => FallbackOutcome::Found(matches[0]),
        n => FallbackOutcome::Ambiguous(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_stripped_attributes() {
        let dom = Dom::parse(r#"<p class="intro" data-node-id="n1">Hello there</p>"#).unwrap();
        let outcome = find_node_recursive(&dom, "<p>Hello there</p>", &HashSet::new());
        assert!(matches!(outcome, FallbackOutcome::Found(_)));
    }

    #[test]
    fn test_text_tag_match_requires_unique_candidate() {
        let dom = Dom::parse("<p><b>Repeated</b> text</p><p>Repeated text</p>").unwrap();
        // Neither inner, outer, nor stripped-outer markup matches the
        // fragment, but tag+text matches both paragraphs.
        let outcome = find_node_recursive(&dom, "<p><i>Repeated</i> text</p>", &HashSet::new());
        assert_eq!(outcome, FallbackOutcome::Ambiguous(2));
    }

    #[test]
    fn test_text_tag_match_unique() {
        let dom = Dom::parse("<p><b>Unique</b> enough text</p>").unwrap();
        let outcome = find_node_recursive(&dom, "<p><i>Unique</i> enough text</p>", &HashSet::new());
        assert!(matches!(outcome, FallbackOutcome::Found(_)));
    }

    #[test]
    fn test_used_nodes_excluded() {
        let dom = Dom::parse("<p>Only one</p>").unwrap();
        let p = dom.descendant_elements(dom.root())[0];
        let mut used = HashSet::new();
        used.insert(p);
        assert_eq!(
            find_node_recursive(&dom, "<p>Only one</p>", &used),
            FallbackOutcome::NotFound
        );
    }
}
