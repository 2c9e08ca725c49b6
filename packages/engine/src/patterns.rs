//! # Pattern Matcher
//!
//! Bulk-edit helper: finds all nodes satisfying a named declarative predicate
//! and emits a batch of change records. The records share a `PatternGroup`
//! stamp so the UI can present them as one logical batch, while the engine
//! still resolves and applies each one independently.

use plaud_markup::{Dom, IdGenerator, NodeId};

use crate::changes::{ChangeRecord, ChangeType, PatternGroup};
use crate::errors::EngineError;
use crate::index::NODE_ID_ATTR;

type NodePredicate = fn(&Dom, NodeId) -> bool;
type NodeRewrite = fn(&Dom, NodeId) -> String;

/// A named declarative predicate over tree nodes.
pub struct Pattern {
    pub name: &'static str,
    pub description: &'static str,
    /// Cheap tag-level filter applied before `matches`.
    selector: NodePredicate,
    matches: NodePredicate,
    /// Produces replacement markup when generating `modify` records.
    rewrite: Option<NodeRewrite>,
}

/// Registry of known patterns.
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
}

const BLOCK_TAGS: &[&str] = &["p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote"];

fn is_block(dom: &Dom, node: NodeId) -> bool {
    dom.tag(node).is_some_and(|t| BLOCK_TAGS.contains(&t))
}

fn is_whitespace_only(dom: &Dom, node: NodeId) -> bool {
    dom.text_content(node).trim().is_empty()
        && dom
            .children(node)
            .iter()
            .all(|&c| !dom.is_element(c) || dom.tag(c) == Some("br"))
}

fn is_br(dom: &Dom, node: NodeId) -> bool {
    dom.tag(node) == Some("br")
}

/// `br` whose next element sibling (ignoring whitespace text) is another `br`.
fn followed_by_br(dom: &Dom, node: NodeId) -> bool {
    let Some(parent) = dom.parent(node) else {
        return false;
    };
    let siblings = dom.children(parent);
    let Some(pos) = siblings.iter().position(|&c| c == node) else {
        return false;
    };
    for &sibling in &siblings[pos + 1..] {
        if dom.is_element(sibling) {
            return dom.tag(sibling) == Some("br");
        }
        if !dom.text_content(sibling).trim().is_empty() {
            return false;
        }
    }
    false
}

impl PatternRegistry {
    /// Registry with the built-in cleanup patterns.
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Pattern {
                    name: "empty-paragraph",
                    description: "Block element containing only whitespace",
                    selector: is_block,
                    matches: is_whitespace_only,
                    rewrite: None,
                },
                Pattern {
                    name: "consecutive-breaks",
                    description: "Line break immediately followed by another",
                    selector: is_br,
                    matches: followed_by_br,
                    rewrite: None,
                },
            ],
        }
    }

    pub fn register(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    fn get(&self, name: &str) -> Result<&Pattern, EngineError> {
        self.patterns
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::UnknownPattern(name.to_string()))
    }

    /// All nodes satisfying the named pattern, in document order.
    pub fn find_matches(&self, dom: &Dom, name: &str) -> Result<Vec<NodeId>, EngineError> {
        let pattern = self.get(name)?;
        Ok(dom
            .descendant_elements(dom.root())
            .into_iter()
            .filter(|&id| (pattern.selector)(dom, id) && (pattern.matches)(dom, id))
            .collect())
    }

    /// Convert every match into a change record of the given type, stamped
    /// with a shared pattern group.
    pub fn create_changes(
        &self,
        dom: &Dom,
        name: &str,
        change_type: ChangeType,
        ids: &mut IdGenerator,
    ) -> Result<Vec<ChangeRecord>, EngineError> {
        let pattern = self.get(name)?;
        if change_type == ChangeType::Add
            || (change_type == ChangeType::Modify && pattern.rewrite.is_none())
        {
            return Err(EngineError::PatternChangeUnsupported {
                pattern: name.to_string(),
                change_type: format!("{:?}", change_type).to_lowercase(),
            });
        }

        let matches = self.find_matches(dom, name)?;
        let total_matches = matches.len();
        let group_id = ids.new_id();

        let changes = matches
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                let original = dom.outer_html(node);
                let mut change = match change_type {
                    ChangeType::Delete => ChangeRecord::delete(ids.new_id(), original),
                    ChangeType::Modify => {
                        let rewrite = pattern.rewrite.expect("checked above");
                        ChangeRecord::modify(ids.new_id(), original, rewrite(dom, node))
                    }
                    ChangeType::Add => unreachable!("rejected above"),
                };
                if let Some(node_id) = dom.attr(node, NODE_ID_ATTR) {
                    change.target_id = Some(node_id.to_string());
                }
                change.pattern_group = Some(PatternGroup {
                    group_id: group_id.clone(),
                    pattern_name: name.to_string(),
                    total_matches,
                    index,
                });
                change
            })
            .collect();

        Ok(changes)
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_paragraph_matches() {
        let dom = Dom::parse("<p>Text</p><p>   </p><p><br></p><div></div>").unwrap();
        let registry = PatternRegistry::new();
        let matches = registry.find_matches(&dom, "empty-paragraph").unwrap();
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn test_consecutive_breaks_matches_first_of_pair() {
        let dom = Dom::parse("<p>a<br>\n<br>b<br>c</p>").unwrap();
        let registry = PatternRegistry::new();
        let matches = registry.find_matches(&dom, "consecutive-breaks").unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_create_changes_stamps_shared_group() {
        let dom = Dom::parse("<p> </p><p>keep</p><p></p>").unwrap();
        let registry = PatternRegistry::new();
        let mut ids = IdGenerator::new("doc_1");
        let changes = registry
            .create_changes(&dom, "empty-paragraph", ChangeType::Delete, &mut ids)
            .unwrap();

        assert_eq!(changes.len(), 2);
        let g0 = changes[0].pattern_group.as_ref().unwrap();
        let g1 = changes[1].pattern_group.as_ref().unwrap();
        assert_eq!(g0.group_id, g1.group_id);
        assert_eq!(g0.total_matches, 2);
        assert_eq!((g0.index, g1.index), (0, 1));
        assert_eq!(g0.pattern_name, "empty-paragraph");
    }

    #[test]
    fn test_unknown_pattern_errors() {
        let dom = Dom::parse("<p>x</p>").unwrap();
        let registry = PatternRegistry::new();
        assert!(matches!(
            registry.find_matches(&dom, "nope"),
            Err(EngineError::UnknownPattern(_))
        ));
    }

    #[test]
    fn test_modify_without_rewrite_unsupported() {
        let dom = Dom::parse("<p> </p>").unwrap();
        let registry = PatternRegistry::new();
        let mut ids = IdGenerator::new("doc_1");
        assert!(matches!(
            registry.create_changes(&dom, "empty-paragraph", ChangeType::Modify, &mut ids),
            Err(EngineError::PatternChangeUnsupported { .. })
        ));
    }
}
