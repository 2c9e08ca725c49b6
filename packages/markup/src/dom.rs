//! # Dom Arena
//!
//! Flat-arena markup tree with index-based child references.
//!
//! Every node lives in `Dom::nodes` and is addressed by a [`NodeId`]. Parents
//! and children reference each other by id only, so subtrees can be detached,
//! re-parented, and replaced without any pointer juggling. Detached nodes stay
//! in the arena (ids are never recycled within one `Dom`); "removed" means
//! unreachable from the root, not deallocated.

use std::collections::HashMap;

use crate::error::ParseResult;
use crate::parser;
use crate::serializer::Serializer;

/// Index into the `Dom` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a single tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Synthetic root; never serialized, never matched.
    Document,

    /// Element node (`<p class="x">…</p>`).
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },

    /// Text node, stored verbatim (entities pass through untouched).
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Mutable markup tree.
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Dom {
    /// Create an empty tree containing only the synthetic root.
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Document,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId::new(0),
        }
    }

    /// Parse a full document into a fresh tree.
    pub fn parse(source: &str) -> ParseResult<Self> {
        let mut dom = Self::new();
        let roots = parser::build_fragment(&mut dom, source)?;
        for id in roots {
            dom.append_child(dom.root, id);
        }
        Ok(dom)
    }

    /// Parse a markup fragment into *this* arena as detached roots.
    ///
    /// The nodes are allocated here so they can later be attached anywhere in
    /// the tree without crossing arenas.
    pub fn parse_fragment(&mut self, source: &str) -> ParseResult<Vec<NodeId>> {
        parser::build_fragment(self, source)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element { .. })
    }

    /// Element tag name (lowercase), if this is an element.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.node_mut(id).data {
            if let Some(entry) = attrs.iter_mut().find(|(n, _)| n == name) {
                entry.1 = value.to_string();
            } else {
                attrs.push((name.to_string(), value.to_string()));
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.node(cur).parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Detach `id` from its parent. No-op for the root or already-detached
    /// nodes.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Append `child` as the last child of `parent` (detaching it first).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `node` immediately after `anchor` under the same parent.
    /// Returns false when `anchor` has no parent (detached or root).
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> bool {
        let Some(parent) = self.node(anchor).parent else {
            return false;
        };
        self.detach(node);
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == anchor)
            .map(|p| p + 1)
            .unwrap_or_else(|| self.node(parent).children.len());
        self.node_mut(parent).children.insert(pos, node);
        self.node_mut(node).parent = Some(parent);
        true
    }

    /// Insert `node` immediately before `anchor` under the same parent.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> bool {
        let Some(parent) = self.node(anchor).parent else {
            return false;
        };
        self.detach(node);
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == anchor)
            .unwrap_or(0);
        self.node_mut(parent).children.insert(pos, node);
        self.node_mut(node).parent = Some(parent);
        true
    }

    /// Replace `old` with `replacement` (in order), detaching `old`.
    ///
    /// Returns the first and last replacement node, or `None` when the
    /// replacement set is empty (the old node is still removed).
    pub fn replace_with(
        &mut self,
        old: NodeId,
        replacement: &[NodeId],
    ) -> Option<(NodeId, NodeId)> {
        let parent = self.node(old).parent?;
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == old)
            .unwrap_or(0);
        self.detach(old);
        for (offset, &id) in replacement.iter().enumerate() {
            self.detach(id);
            self.node_mut(parent).children.insert(pos + offset, id);
            self.node_mut(id).parent = Some(parent);
        }
        match (replacement.first(), replacement.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => None,
        }
    }

    /// Preorder walk of the subtree rooted at `from` (inclusive).
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// All element nodes in document order, excluding the synthetic root.
    pub fn descendant_elements(&self, from: NodeId) -> Vec<NodeId> {
        self.preorder(from)
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    /// Document-order ordinal for every attached node. Used to sort insertion
    /// anchors top to bottom.
    pub fn document_positions(&self) -> HashMap<NodeId, usize> {
        self.preorder(self.root)
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.preorder(id) {
            if let NodeData::Text(text) = self.data(n) {
                out.push_str(text);
            }
        }
        out
    }

    /// Serialize the whole document (children of the root).
    pub fn serialize(&self) -> String {
        Serializer::new().serialize_children(self, self.root)
    }

    /// Markup of `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        Serializer::new().serialize_node(self, id)
    }

    /// Markup of `id`'s children only.
    pub fn inner_html(&self, id: NodeId) -> String {
        Serializer::new().serialize_children(self, id)
    }

    /// Outer markup with all attributes removed; fallback comparison form.
    pub fn outer_html_stripped(&self, id: NodeId) -> String {
        Serializer::without_attrs().serialize_node(self, id)
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
