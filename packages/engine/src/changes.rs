//! # Change Records
//!
//! The data unit describing one proposed edit against the document.
//!
//! ## Design Principles
//!
//! 1. **Immutable identity, mutable status**: everything but `status` is
//!    fixed at creation; status only moves `pending → accepted|rejected`.
//! 2. **No live node references**: a record carries markup-level hints only
//!    (content fragments, stable id attributes, cached signatures), never a
//!    `NodeId`: the working tree is rebuilt from scratch on every
//!    reconstruction pass, so any held id would dangle.
//! 3. **Wire-shaped**: records serialize with the camelCase field names the
//!    external change producer and the UI speak.

use serde::{Deserialize, Serialize};

/// Kind of edit a record proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Delete,
    Modify,
}

/// Review status. Terminal states never revert except via whole-session
/// rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Which side of the anchor an `add` lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorDirection {
    After,
    Before,
}

/// Snapshot of a matched node's identity, captured the first time preview
/// rendering resolves it. Used to re-find the same logical node on later
/// passes without holding a live reference. Single-use: stripped after each
/// reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSignature {
    pub tag_name: String,
    pub text_content: String,
    pub inner_html: String,
    pub outer_html: String,
}

/// UI grouping metadata stamped by the bulk pattern matcher. Never consulted
/// during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternGroup {
    pub group_id: String,
    pub pattern_name: String,
    pub total_matches: usize,
    pub index: usize,
}

/// One proposed edit with status and resolution hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub change_type: ChangeType,

    #[serde(default)]
    pub status: ChangeStatus,

    /// Markup the edit expects to find (`delete`/`modify`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,

    /// Markup to insert (`add`/`modify`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,

    /// Stable id attribute of the target node, when the editing surface
    /// assigns one. Highest-confidence resolution hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// Stable id attribute of the anchor node (`add` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_target_id: Option<String>,

    /// Content anchor: insert after the node matching this fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after: Option<String>,

    /// Content anchor: insert before the node matching this fragment.
    /// Mutually exclusive with `insert_after`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_before: Option<String>,

    /// Explicit direction when only an anchor id is supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_direction: Option<AnchorDirection>,

    /// Insert immediately after wherever the named change's content ended up,
    /// independent of document anchors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chained_after: Option<String>,

    /// Bulk pattern-matcher grouping metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_group: Option<PatternGroup>,

    /// Ephemeral, never persisted or sent over the wire.
    #[serde(skip)]
    pub cached_signature: Option<CachedSignature>,
}

impl ChangeRecord {
    fn base(id: impl Into<String>, change_type: ChangeType) -> Self {
        Self {
            id: id.into(),
            change_type,
            status: ChangeStatus::Pending,
            original_content: None,
            new_content: None,
            target_id: None,
            anchor_target_id: None,
            insert_after: None,
            insert_before: None,
            anchor_direction: None,
            chained_after: None,
            pattern_group: None,
            cached_signature: None,
        }
    }

    pub fn add(id: impl Into<String>, new_content: impl Into<String>) -> Self {
        let mut change = Self::base(id, ChangeType::Add);
        change.new_content = Some(new_content.into());
        change
    }

    pub fn delete(id: impl Into<String>, original_content: impl Into<String>) -> Self {
        let mut change = Self::base(id, ChangeType::Delete);
        change.original_content = Some(original_content.into());
        change
    }

    pub fn modify(
        id: impl Into<String>,
        original_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        let mut change = Self::base(id, ChangeType::Modify);
        change.original_content = Some(original_content.into());
        change.new_content = Some(new_content.into());
        change
    }

    pub fn with_insert_after(mut self, anchor: impl Into<String>) -> Self {
        self.insert_after = Some(anchor.into());
        self
    }

    pub fn with_insert_before(mut self, anchor: impl Into<String>) -> Self {
        self.insert_before = Some(anchor.into());
        self
    }

    pub fn with_target_id(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_anchor_target_id(mut self, anchor_id: impl Into<String>) -> Self {
        self.anchor_target_id = Some(anchor_id.into());
        self
    }

    pub fn with_chained_after(mut self, change_id: impl Into<String>) -> Self {
        self.chained_after = Some(change_id.into());
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeStatus::Pending
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ChangeStatus::Accepted
    }

    /// Effective anchor side: content anchors win, then the explicit
    /// direction field, then `after`.
    pub fn direction(&self) -> AnchorDirection {
        if self.insert_before.is_some() {
            AnchorDirection::Before
        } else if self.insert_after.is_some() {
            AnchorDirection::After
        } else {
            self.anchor_direction.unwrap_or(AnchorDirection::After)
        }
    }

    /// The content-anchor fragment, whichever side it names.
    pub fn anchor_content(&self) -> Option<&str> {
        self.insert_after
            .as_deref()
            .or(self.insert_before.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_uses_wire_names() {
        let change = ChangeRecord::add("c1", "<p>X</p>").with_insert_after("<p>A</p>");

        let json = serde_json::to_string(&change).unwrap();
        assert!(json.contains(r#""type":"add""#));
        assert!(json.contains(r#""insertAfter":"<p>A</p>""#));
        assert!(json.contains(r#""newContent":"<p>X</p>""#));

        let back: ChangeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(change, back);
    }

    #[test]
    fn test_cached_signature_never_serialized() {
        let mut change = ChangeRecord::delete("c1", "<p>X</p>");
        change.cached_signature = Some(CachedSignature {
            tag_name: "p".into(),
            text_content: "X".into(),
            inner_html: "X".into(),
            outer_html: "<p>X</p>".into(),
        });

        let json = serde_json::to_string(&change).unwrap();
        assert!(!json.contains("cachedSignature"));
        assert!(!json.contains("cached_signature"));
    }

    #[test]
    fn test_direction_defaults() {
        let after = ChangeRecord::add("c1", "<p>X</p>").with_insert_after("<p>A</p>");
        assert_eq!(after.direction(), AnchorDirection::After);

        let before = ChangeRecord::add("c2", "<p>X</p>").with_insert_before("<p>A</p>");
        assert_eq!(before.direction(), AnchorDirection::Before);

        let id_only = ChangeRecord::add("c3", "<p>X</p>").with_anchor_target_id("n1");
        assert_eq!(id_only.direction(), AnchorDirection::After);
    }
}
