//! # Content Index
//!
//! Disposable, single-pass lookup structure built over one tree snapshot.
//!
//! Built once per reconstruction (or preview) pass and dropped at the end;
//! it never outlives the `Dom` it indexes. Four content maps plus a used-node
//! set give near-O(1) candidate retrieval, and the used set is what guarantees
//! that N structurally identical fragments resolve to N distinct nodes across
//! N changes, never the same node twice.
//!
//! The maps are allowed to go stale after mutations: `remove_node` purges the
//! id map only. Correctness relies on the used set being consulted everywhere
//! it matters, not on keeping the content maps accurate.

use std::collections::{HashMap, HashSet};

use plaud_markup::{normalize_markup, text_of_markup, Dom, NodeId};

use crate::changes::{ChangeRecord, ChangeType};

/// Attribute the editing surface uses for persistent element ids.
pub const NODE_ID_ATTR: &str = "data-node-id";

/// Marker attribute on visual-preview wrapper elements. Anything inside such
/// a wrapper is overlay artifact, not real content, and is never indexed.
pub const PREVIEW_ATTR: &str = "data-plaud-preview";

/// Minimum text length for the text-content map; shorter keys produce too
/// many false positives.
const MIN_TEXT_KEY_LEN: usize = 10;

/// How a node was resolved; surfaced in debug logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    TargetId,
    CachedSignature,
    NormalizedOuter,
    NormalizedInner,
    TextContent,
    AnchorId,
    AnchorContent,
    Recursive,
}

#[derive(Debug, Clone, Copy)]
pub struct Resolution {
    pub node: NodeId,
    pub method: ResolutionMethod,
}

pub struct ContentIndex {
    by_id: HashMap<String, NodeId>,
    by_inner: HashMap<String, Vec<NodeId>>,
    by_outer: HashMap<String, Vec<NodeId>>,
    by_tag_text: HashMap<String, Vec<NodeId>>,
    by_text: HashMap<String, Vec<NodeId>>,
    used: HashSet<NodeId>,
}

fn tag_text_key(tag: &str, text: &str) -> String {
    format!("{}:{}", tag.to_ascii_lowercase(), text.trim().to_lowercase())
}

impl ContentIndex {
    /// Single traversal of all element nodes, skipping preview-wrapper
    /// subtrees. No mutation; cost is O(nodes).
    pub fn build(dom: &Dom) -> Self {
        let mut index = Self {
            by_id: HashMap::new(),
            by_inner: HashMap::new(),
            by_outer: HashMap::new(),
            by_tag_text: HashMap::new(),
            by_text: HashMap::new(),
            used: HashSet::new(),
        };

        let mut stack = vec![dom.root()];
        while let Some(id) = stack.pop() {
            if dom.attr(id, PREVIEW_ATTR).is_some() {
                continue;
            }
            if dom.is_element(id) {
                index.record(dom, id);
            }
            for &child in dom.children(id).iter().rev() {
                stack.push(child);
            }
        }

        index
    }

    fn record(&mut self, dom: &Dom, id: NodeId) {
        if let Some(node_id) = dom.attr(id, NODE_ID_ATTR) {
            self.by_id.insert(node_id.to_string(), id);
        }

        let inner = normalize_markup(&dom.inner_html(id));
        if !inner.is_empty() {
            self.by_inner.entry(inner).or_default().push(id);
        }

        let outer = normalize_markup(&dom.outer_html(id));
        self.by_outer.entry(outer).or_default().push(id);

        let tag = dom.tag(id).unwrap_or_default();
        let text = dom.text_content(id);
        self.by_tag_text
            .entry(tag_text_key(tag, &text))
            .or_default()
            .push(id);

        let text_key = text.trim().to_lowercase();
        if text_key.len() > MIN_TEXT_KEY_LEN {
            self.by_text.entry(text_key).or_default().push(id);
        }
    }

    fn first_unused(&self, candidates: &[NodeId]) -> Option<NodeId> {
        candidates
            .iter()
            .copied()
            .find(|id| !self.used.contains(id))
    }

    /// Resolve a change's node: the edit target for `delete`/`modify`, the
    /// insertion anchor for `add`.
    pub fn find_node(&self, change: &ChangeRecord) -> Option<Resolution> {
        match change.change_type {
            ChangeType::Add => self.find_anchor(change),
            ChangeType::Delete | ChangeType::Modify => self.find_target(change),
        }
    }

    /// Target lookup for `delete`/`modify`. Each step returns the first
    /// unused candidate.
    pub fn find_target(&self, change: &ChangeRecord) -> Option<Resolution> {
        // (a) stable id
        if let Some(target_id) = &change.target_id {
            if let Some(&node) = self.by_id.get(target_id) {
                if !self.used.contains(&node) {
                    return Some(Resolution {
                        node,
                        method: ResolutionMethod::TargetId,
                    });
                }
            }
        }

        // (b) cached signature from a previous preview pass
        if let Some(sig) = &change.cached_signature {
            let key = tag_text_key(&sig.tag_name, &sig.text_content);
            if let Some(node) = self.by_tag_text.get(&key).and_then(|c| self.first_unused(c)) {
                return Some(Resolution {
                    node,
                    method: ResolutionMethod::CachedSignature,
                });
            }
        }

        // (c) normalized markup
        if let Some(original) = &change.original_content {
            let key = normalize_markup(original);
            if let Some(node) = self.by_outer.get(&key).and_then(|c| self.first_unused(c)) {
                return Some(Resolution {
                    node,
                    method: ResolutionMethod::NormalizedOuter,
                });
            }
            if let Some(node) = self.by_inner.get(&key).and_then(|c| self.first_unused(c)) {
                return Some(Resolution {
                    node,
                    method: ResolutionMethod::NormalizedInner,
                });
            }

            // (c2) text content, only when exactly one unused candidate
            let text_key = text_of_markup(original).trim().to_lowercase();
            if text_key.len() > MIN_TEXT_KEY_LEN {
                if let Some(candidates) = self.by_text.get(&text_key) {
                    let unused: Vec<NodeId> = candidates
                        .iter()
                        .copied()
                        .filter(|id| !self.used.contains(id))
                        .collect();
                    if unused.len() == 1 {
                        return Some(Resolution {
                            node: unused[0],
                            method: ResolutionMethod::TextContent,
                        });
                    }
                }
            }
        }

        None
    }

    /// Anchor lookup for `add`. Deliberately does not consult the used set:
    /// one anchor may legitimately serve several subsequent inserts before
    /// being superseded.
    pub fn find_anchor(&self, change: &ChangeRecord) -> Option<Resolution> {
        if let Some(anchor_id) = &change.anchor_target_id {
            if let Some(&node) = self.by_id.get(anchor_id) {
                return Some(Resolution {
                    node,
                    method: ResolutionMethod::AnchorId,
                });
            }
        }

        if let Some(anchor) = change.anchor_content() {
            let key = normalize_markup(anchor);
            if let Some(&node) = self.by_outer.get(&key).and_then(|c| c.first()) {
                return Some(Resolution {
                    node,
                    method: ResolutionMethod::AnchorContent,
                });
            }
            if let Some(&node) = self.by_inner.get(&key).and_then(|c| c.first()) {
                return Some(Resolution {
                    node,
                    method: ResolutionMethod::AnchorContent,
                });
            }
        }

        None
    }

    /// Record that a change consumed this node.
    pub fn mark_used(&mut self, node: NodeId) {
        self.used.insert(node);
    }

    /// Record consumption of a node that is leaving the tree. Also purges
    /// its id-map entry; the content maps are left stale on purpose.
    pub fn remove_node(&mut self, dom: &Dom, node: NodeId) {
        self.used.insert(node);
        if let Some(id_value) = dom.attr(node, NODE_ID_ATTR) {
            self.by_id.remove(id_value);
        }
    }

    pub fn is_used(&self, node: NodeId) -> bool {
        self.used.contains(&node)
    }

    pub fn used_nodes(&self) -> &HashSet<NodeId> {
        &self.used
    }
}
