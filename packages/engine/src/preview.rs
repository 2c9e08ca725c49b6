//! # Visual Preview Rendering
//!
//! Decorates a fresh parse of the baseline with highlight wrappers so the UI
//! can show what each pending change would touch, without mutating real
//! content. Wrappers carry [`PREVIEW_ATTR`] (owning change id) and
//! [`PREVIEW_KIND_ATTR`]; the Content Index and the fallback resolver both
//! treat wrapper subtrees as overlay artifacts and skip them.
//!
//! This pass is also where a change's [`CachedSignature`] is captured: the
//! first time a node matches, its identity snapshot is stored on the record
//! so the same logical node can be re-found after the tree is rebuilt from
//! scratch, without ever holding a live reference.

use tracing::{debug, warn};

use plaud_markup::{Dom, NodeId};

use crate::changes::{AnchorDirection, CachedSignature, ChangeRecord, ChangeType};
use crate::errors::EngineError;
use crate::index::{ContentIndex, PREVIEW_ATTR};
use crate::resolver::{find_node_recursive, FallbackOutcome};

/// Secondary marker naming the preview kind (`delete`, `modify`, `add`).
pub const PREVIEW_KIND_ATTR: &str = "data-preview-kind";

#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    /// Baseline markup with highlight wrappers added.
    pub html: String,
    /// Ids of changes whose target/anchor resolved.
    pub matched: Vec<String>,
    /// Ids of changes that could not be located; flagged, never dropped.
    pub unmatched: Vec<String>,
}

/// Render the decorated preview for every pending change.
///
/// Captures cached signatures as a side effect, which is why `changes` is
/// mutable; statuses are never touched.
pub fn render_preview(
    baseline: &str,
    changes: &mut [ChangeRecord],
) -> Result<PreviewOutcome, EngineError> {
    let mut dom = Dom::parse(baseline)?;
    let mut index = ContentIndex::build(&dom);
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    // Wrapper node of each previewed add, for chained members.
    let mut add_wrappers: std::collections::HashMap<String, NodeId> =
        std::collections::HashMap::new();

    for change in changes.iter_mut().filter(|c| c.is_pending()) {
        let outcome = match change.change_type {
            ChangeType::Delete | ChangeType::Modify => {
                preview_target(&mut dom, &mut index, change)
            }
            ChangeType::Add => preview_add(&mut dom, &index, change, &add_wrappers)
                .map(|wrapper| {
                    add_wrappers.insert(change.id.clone(), wrapper);
                    wrapper
                }),
        };
        match outcome {
            Some(_) => matched.push(change.id.clone()),
            None => {
                warn!(change_id = %change.id, "preview could not locate change");
                unmatched.push(change.id.clone());
            }
        }
    }

    Ok(PreviewOutcome {
        html: dom.serialize(),
        matched,
        unmatched,
    })
}

/// Wrap a resolved target node; returns the wrapper.
fn preview_target(
    dom: &mut Dom,
    index: &mut ContentIndex,
    change: &mut ChangeRecord,
) -> Option<NodeId> {
    let node = match index.find_target(change) {
        Some(resolution) => Some(resolution.node),
        None => match find_node_recursive(
            dom,
            change.original_content.as_deref()?,
            index.used_nodes(),
        ) {
            FallbackOutcome::Found(node) => Some(node),
            _ => None,
        },
    }?;

    // Capture the identity snapshot on first match only; it is re-derived
    // after each reconstruction strips it.
    if change.cached_signature.is_none() {
        change.cached_signature = Some(CachedSignature {
            tag_name: dom.tag(node).unwrap_or_default().to_string(),
            text_content: dom.text_content(node),
            inner_html: dom.inner_html(node),
            outer_html: dom.outer_html(node),
        });
        debug!(change_id = %change.id, "captured node signature");
    }

    index.mark_used(node);
    let kind = match change.change_type {
        ChangeType::Delete => "delete",
        _ => "modify",
    };
    Some(wrap_node(dom, node, &change.id, kind))
}

/// Insert a highlighted rendering of an add's new content at its anchor;
/// returns the wrapper.
fn preview_add(
    dom: &mut Dom,
    index: &ContentIndex,
    change: &ChangeRecord,
    add_wrappers: &std::collections::HashMap<String, NodeId>,
) -> Option<NodeId> {
    // Chained adds hang off their predecessor's preview wrapper.
    let (anchor, direction) = if let Some(predecessor) = &change.chained_after {
        (
            add_wrappers.get(predecessor).copied()?,
            AnchorDirection::After,
        )
    } else {
        let resolution = match index.find_anchor(change) {
            Some(resolution) => Some(resolution.node),
            None => match find_node_recursive(dom, change.anchor_content()?, &Default::default())
            {
                FallbackOutcome::Found(node) => Some(node),
                _ => None,
            },
        }?;
        (resolution, change.direction())
    };

    let wrapper = make_wrapper(dom, &change.id, "add");
    let fragment = dom
        .parse_fragment(change.new_content.as_deref().unwrap_or(""))
        .ok()?;
    for id in fragment {
        dom.append_child(wrapper, id);
    }
    let attached = match direction {
        AnchorDirection::After => dom.insert_after(anchor, wrapper),
        AnchorDirection::Before => dom.insert_before(anchor, wrapper),
    };
    attached.then_some(wrapper)
}

fn make_wrapper(dom: &mut Dom, change_id: &str, kind: &str) -> NodeId {
    let fragment = dom
        .parse_fragment("<span></span>")
        .expect("static wrapper markup");
    let wrapper = fragment[0];
    dom.set_attr(wrapper, PREVIEW_ATTR, change_id);
    dom.set_attr(wrapper, PREVIEW_KIND_ATTR, kind);
    wrapper
}

/// Move `node` inside a fresh wrapper placed where `node` was.
fn wrap_node(dom: &mut Dom, node: NodeId, change_id: &str, kind: &str) -> NodeId {
    let wrapper = make_wrapper(dom, change_id, kind);
    dom.insert_before(node, wrapper);
    dom.append_child(wrapper, node);
    wrapper
}
