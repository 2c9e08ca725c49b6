//! Token stream → Dom arena tree builder.
//!
//! Tolerant by design: a stray end tag pops to the nearest matching open
//! element or is ignored, and anything still open at end of input is closed
//! there. Comments and doctypes are dropped; editor bodies never carry them,
//! and the reconciliation engine only matches on elements and text.

use crate::dom::{Dom, NodeData, NodeId};
use crate::error::ParseResult;
use crate::tokenizer::{tokenize, Token};

/// Elements that never take children.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `source` into `dom` as a list of detached root nodes.
pub(crate) fn build_fragment(dom: &mut Dom, source: &str) -> ParseResult<Vec<NodeId>> {
    let tokens = tokenize(source)?;

    let mut roots: Vec<NodeId> = Vec::new();
    // Stack of currently open elements; new nodes attach to the top.
    let mut open: Vec<NodeId> = Vec::new();

    let mut attach = |dom: &mut Dom, open: &[NodeId], roots: &mut Vec<NodeId>, id: NodeId| {
        match open.last() {
            Some(&parent) => dom.append_child(parent, id),
            None => roots.push(id),
        }
    };

    for token in tokens {
        match token {
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                let id = dom.alloc(NodeData::Element {
                    tag: name.clone(),
                    attrs,
                });
                attach(dom, &open, &mut roots, id);
                if !self_closing && !is_void_element(&name) {
                    open.push(id);
                }
            }
            Token::EndTag(name) => {
                // Pop to the matching open element, closing anything opened
                // in between; ignore end tags that match nothing.
                if let Some(pos) = open
                    .iter()
                    .rposition(|&id| dom.tag(id) == Some(name.as_str()))
                {
                    open.truncate(pos);
                }
            }
            Token::Text(text) => {
                let id = dom.alloc(NodeData::Text(text));
                attach(dom, &open, &mut roots, id);
            }
            Token::Comment(_) | Token::Doctype(_) => {}
        }
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let source = r#"<p class="intro">Hello <b>world</b></p><p>Second</p>"#;
        let dom = Dom::parse(source).unwrap();
        assert_eq!(dom.serialize(), source);
    }

    #[test]
    fn test_whitespace_text_nodes_survive() {
        let source = "<p>A</p>\n<p>B</p>";
        let dom = Dom::parse(source).unwrap();
        assert_eq!(dom.serialize(), source);
    }

    #[test]
    fn test_void_elements_take_no_children() {
        let dom = Dom::parse("<p>a<br>b</p>").unwrap();
        let elements = dom.descendant_elements(dom.root());
        let p = elements[0];
        let br = elements[1];
        assert_eq!(dom.tag(br), Some("br"));
        assert_eq!(dom.parent(br), Some(p));
        assert_eq!(dom.children(p).len(), 3);
    }

    #[test]
    fn test_unclosed_tags_close_at_end_of_input() {
        let dom = Dom::parse("<div><p>open").unwrap();
        assert_eq!(dom.serialize(), "<div><p>open</p></div>");
    }

    #[test]
    fn test_stray_end_tag_ignored() {
        let dom = Dom::parse("<p>a</span></p>").unwrap();
        assert_eq!(dom.serialize(), "<p>a</p>");
    }

    #[test]
    fn test_mismatched_end_tag_pops_to_match() {
        let dom = Dom::parse("<div><span>x</div>after").unwrap();
        assert_eq!(dom.serialize(), "<div><span>x</span></div>after");
    }

    #[test]
    fn test_fragment_parses_as_detached_roots() {
        let mut dom = Dom::parse("<p>doc</p>").unwrap();
        let roots = dom.parse_fragment("<h1>A</h1><p>B</p>").unwrap();
        assert_eq!(roots.len(), 2);
        for &id in &roots {
            assert!(!dom.is_attached(id));
        }
        // Document untouched.
        assert_eq!(dom.serialize(), "<p>doc</p>");
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        let dom = Dom::parse("<!DOCTYPE html><!-- x --><p>a</p>").unwrap();
        assert_eq!(dom.serialize(), "<p>a</p>");
    }
}
