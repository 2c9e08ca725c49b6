//! Serializer converts a Dom arena back to markup.
//!
//! Text nodes are emitted verbatim (the tokenizer never decodes entities, so
//! parse → serialize round-trips editor content). Attribute values are always
//! double-quoted with `"` escaped; everything else passes through.

use crate::dom::{Dom, NodeData, NodeId};
use crate::parser::is_void_element;

pub struct Serializer {
    include_attrs: bool,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            include_attrs: true,
        }
    }

    /// Variant that drops all attributes; used for attributes-stripped
    /// fallback comparison.
    pub fn without_attrs() -> Self {
        Self {
            include_attrs: false,
        }
    }

    /// Serialize a single node including its own tag.
    pub fn serialize_node(&self, dom: &Dom, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(dom, id, &mut out);
        out
    }

    /// Serialize the children of `id` only.
    pub fn serialize_children(&self, dom: &Dom, id: NodeId) -> String {
        let mut out = String::new();
        for &child in dom.children(id) {
            self.write_node(dom, child, &mut out);
        }
        out
    }

    fn write_node(&self, dom: &Dom, id: NodeId, out: &mut String) {
        match dom.data(id) {
            NodeData::Document => {
                for &child in dom.children(id) {
                    self.write_node(dom, child, out);
                }
            }
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                if self.include_attrs {
                    for (name, value) in attrs {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&value.replace('"', "&quot;"));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void_element(tag) {
                    return;
                }
                for &child in dom.children(id) {
                    self.write_node(dom, child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void_elements_have_no_close_tag() {
        let dom = Dom::parse("<p>a<br>b</p>").unwrap();
        assert_eq!(dom.serialize(), "<p>a<br>b</p>");
    }

    #[test]
    fn test_outer_and_inner_html() {
        let dom = Dom::parse(r#"<div id="x"><p>Hi</p></div>"#).unwrap();
        let div = dom.descendant_elements(dom.root())[0];
        assert_eq!(dom.outer_html(div), r#"<div id="x"><p>Hi</p></div>"#);
        assert_eq!(dom.inner_html(div), "<p>Hi</p>");
    }

    #[test]
    fn test_stripped_serialization_drops_attributes() {
        let dom = Dom::parse(r#"<p class="a" data-node-id="n1">Hi</p>"#).unwrap();
        let p = dom.descendant_elements(dom.root())[0];
        assert_eq!(dom.outer_html_stripped(p), "<p>Hi</p>");
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let mut dom = Dom::parse("<p>x</p>").unwrap();
        let p = dom.descendant_elements(dom.root())[0];
        dom.set_attr(p, "title", r#"say "hi""#);
        assert_eq!(dom.outer_html(p), r#"<p title="say &quot;hi&quot;">x</p>"#);
    }
}
