//! # Reconstruction Pipeline
//!
//! Deterministically rebuilds a clean document from the immutable baseline
//! plus the subset of changes currently accepted.
//!
//! ## Ordering invariant
//!
//! Changes are applied **modify → add (with chained sub-order) → delete**,
//! always, regardless of proposal order:
//!
//! - modifications must not destroy anchors that additions depend on, so they
//!   run first; and every non-chained addition's anchor is resolved *before*
//!   any mutation, while the tree is still pristine;
//! - deletions must not remove content other accepted changes still
//!   reference, so they run last.
//!
//! Reconstruction is a pure, synchronous function of
//! `(baseline, accepted set, options)`: the same inputs always produce the
//! same markup. It never reads the live, preview-decorated document.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use plaud_markup::{Dom, NodeId};

use crate::changes::{AnchorDirection, ChangeRecord, ChangeType};
use crate::errors::{EngineError, ReconcileError};
use crate::index::{ContentIndex, Resolution, ResolutionMethod};
use crate::resolver::{find_node_recursive, FallbackOutcome};

/// What to do with a change whose target or anchor cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record a diagnostic and continue. The primary contract.
    #[default]
    SkipAndReport,

    /// Legacy compatibility mode: append the change's new content to the end
    /// of the document. Explicitly opt-in; it can misplace content silently
    /// from the user's point of view, so it is never the default.
    AppendToEnd,
}

#[derive(Debug, Clone, Default)]
pub struct ReconstructOptions {
    pub failure_policy: FailurePolicy,
}

/// What happened to an unresolved change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    Skipped,
    AppendedToEnd,
}

/// Diagnostic for one change that could not be applied normally. Surfaced to
/// the UI and logged; no failure is ever silent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedChange {
    pub change_id: String,
    pub change_type: ChangeType,
    pub reason: ReconcileError,
    pub disposition: Disposition,
}

#[derive(Debug, Clone)]
pub struct ReconstructionReport {
    /// The rebuilt document markup.
    pub html: String,
    pub unresolved: Vec<UnresolvedChange>,
}

/// A non-chained addition whose anchor was pre-resolved against the pristine
/// tree.
struct PendingAdd<'a> {
    change: &'a ChangeRecord,
    anchor: NodeId,
    direction: AnchorDirection,
}

/// Rebuild the document from `baseline` plus every change in `changes` whose
/// status is accepted. Pending and rejected records are ignored, so a
/// session can pass its whole change list on every transition.
pub fn reconstruct(
    baseline: &str,
    changes: &[ChangeRecord],
    options: &ReconstructOptions,
) -> Result<ReconstructionReport, EngineError> {
    let mut dom = Dom::parse(baseline)?;
    let mut index = ContentIndex::build(&dom);
    let mut unresolved: Vec<UnresolvedChange> = Vec::new();

    // Partition the accepted set by operation type. Application order is the
    // pipeline's named invariant, never an artifact of proposal order.
    let mut deletions: Vec<&ChangeRecord> = Vec::new();
    let mut modifications: Vec<&ChangeRecord> = Vec::new();
    let mut additions: Vec<&ChangeRecord> = Vec::new();
    let mut chained: Vec<&ChangeRecord> = Vec::new();
    for change in changes.iter().filter(|c| c.is_accepted()) {
        match change.change_type {
            ChangeType::Delete => deletions.push(change),
            ChangeType::Modify => modifications.push(change),
            ChangeType::Add if change.chained_after.is_some() => chained.push(change),
            ChangeType::Add => additions.push(change),
        }
    }

    // Pre-resolve every non-chained addition's anchor while the tree is
    // still pristine: a later modification could alter or remove the exact
    // markup an anchor match depends on.
    let mut pending_adds: Vec<PendingAdd> = Vec::new();
    for change in additions {
        match resolve_anchor(&dom, &index, change) {
            Some(resolution) => {
                debug!(change_id = %change.id, method = ?resolution.method, "anchor resolved");
                pending_adds.push(PendingAdd {
                    change,
                    anchor: resolution.node,
                    direction: change.direction(),
                });
            }
            None => record_failure(
                &mut dom,
                &mut unresolved,
                options,
                change,
                ReconcileError::AnchorNotFound,
            )?,
        }
    }

    // Modifications first. Remember old node → replacement bounds, because an
    // already-resolved anchor might *be* a node we just replaced.
    let mut replaced: HashMap<NodeId, Option<(NodeId, NodeId)>> = HashMap::new();
    for change in modifications {
        let target = match resolve_target(&dom, &index, change) {
            Ok(resolution) => {
                debug!(change_id = %change.id, method = ?resolution.method, "target resolved");
                resolution.node
            }
            Err(reason) => {
                record_failure(&mut dom, &mut unresolved, options, change, reason)?;
                continue;
            }
        };

        let fragment = dom.parse_fragment(change.new_content.as_deref().unwrap_or(""))?;
        index.remove_node(&dom, target);
        let bounds = dom.replace_with(target, &fragment);
        replaced.insert(target, bounds);
    }

    // Patch pre-resolved anchors that pointed at a replaced node: redirect to
    // the replacement's last node for insert-after, first for insert-before.
    let mut patched_adds: Vec<PendingAdd> = Vec::new();
    for mut pending in pending_adds {
        match replaced.get(&pending.anchor) {
            Some(Some((first, last))) => {
                pending.anchor = match pending.direction {
                    AnchorDirection::After => *last,
                    AnchorDirection::Before => *first,
                };
                patched_adds.push(pending);
            }
            Some(None) => {
                // The anchor was modified away entirely.
                record_failure(
                    &mut dom,
                    &mut unresolved,
                    options,
                    pending.change,
                    ReconcileError::AnchorNotFound,
                )?;
            }
            None => patched_adds.push(pending),
        }
    }

    // Additions, ordered by the anchor's tree position so several inserts
    // landing near each other keep top-to-bottom order. Each insertion
    // records where its content ended up, keyed by change id, for the chain
    // pass below.
    let positions = dom.document_positions();
    patched_adds.sort_by_key(|p| positions.get(&p.anchor).copied().unwrap_or(usize::MAX));

    let mut inserted: HashMap<String, NodeId> = HashMap::new();
    for pending in patched_adds {
        if !dom.is_attached(pending.anchor) {
            record_failure(
                &mut dom,
                &mut unresolved,
                options,
                pending.change,
                ReconcileError::AnchorNotFound,
            )?;
            continue;
        }
        let landing = insert_fragment(
            &mut dom,
            pending.anchor,
            pending.direction,
            pending.change.new_content.as_deref().unwrap_or(""),
        )?;
        // An empty fragment leaves the chain continuation at the anchor.
        inserted.insert(pending.change.id.clone(), landing.unwrap_or(pending.anchor));
    }

    // Chained additions: fixed-point replay. A chain member becomes
    // insertable once its predecessor's content is in the tree; the loop is
    // bounded by chain length + 1 passes.
    let max_passes = chained.len() + 1;
    let mut remaining = chained;
    for _ in 0..max_passes {
        if remaining.is_empty() {
            break;
        }
        let mut progressed = false;
        let mut still_waiting = Vec::new();
        for change in remaining {
            let predecessor = change
                .chained_after
                .as_deref()
                .unwrap_or_default()
                .to_string();
            match inserted.get(&predecessor).copied() {
                Some(after) if dom.is_attached(after) => {
                    let landing = insert_fragment(
                        &mut dom,
                        after,
                        AnchorDirection::After,
                        change.new_content.as_deref().unwrap_or(""),
                    )?;
                    inserted.insert(change.id.clone(), landing.unwrap_or(after));
                    progressed = true;
                }
                _ => still_waiting.push(change),
            }
        }
        remaining = still_waiting;
        if !progressed {
            break;
        }
    }
    for change in remaining {
        let predecessor = change.chained_after.clone().unwrap_or_default();
        record_failure(
            &mut dom,
            &mut unresolved,
            options,
            change,
            ReconcileError::ChainedAnchorNotFound { predecessor },
        )?;
    }

    // Deletions last: a deletion must never remove content another accepted
    // change still needed as a reference point.
    for change in deletions {
        match resolve_target(&dom, &index, change) {
            Ok(resolution) => {
                debug!(change_id = %change.id, method = ?resolution.method, "target resolved");
                index.remove_node(&dom, resolution.node);
                dom.detach(resolution.node);
            }
            Err(reason) => {
                // Deletions have nothing to append; always skip-and-report.
                warn!(change_id = %change.id, %reason, "change skipped");
                unresolved.push(UnresolvedChange {
                    change_id: change.id.clone(),
                    change_type: change.change_type,
                    reason,
                    disposition: Disposition::Skipped,
                });
            }
        }
    }

    Ok(ReconstructionReport {
        html: dom.serialize(),
        unresolved,
    })
}

/// Resolve a `delete`/`modify` target: Content Index first, recursive
/// fallback second.
fn resolve_target(
    dom: &Dom,
    index: &ContentIndex,
    change: &ChangeRecord,
) -> Result<Resolution, ReconcileError> {
    if let Some(resolution) = index.find_target(change) {
        return Ok(resolution);
    }
    let Some(original) = change.original_content.as_deref() else {
        return Err(ReconcileError::TargetNotFound);
    };
    match find_node_recursive(dom, original, index.used_nodes()) {
        FallbackOutcome::Found(node) => Ok(Resolution {
            node,
            method: ResolutionMethod::Recursive,
        }),
        FallbackOutcome::Ambiguous(candidates) => {
            Err(ReconcileError::AmbiguousMatch { candidates })
        }
        FallbackOutcome::NotFound => Err(ReconcileError::TargetNotFound),
    }
}

/// Resolve an `add` anchor: Content Index first, recursive fallback second.
/// Anchor lookups ignore the used set (the fallback gets an empty one).
fn resolve_anchor(dom: &Dom, index: &ContentIndex, change: &ChangeRecord) -> Option<Resolution> {
    if let Some(resolution) = index.find_anchor(change) {
        return Some(resolution);
    }
    let anchor = change.anchor_content()?;
    match find_node_recursive(dom, anchor, &Default::default()) {
        FallbackOutcome::Found(node) => Some(Resolution {
            node,
            method: ResolutionMethod::Recursive,
        }),
        _ => None,
    }
}

/// Insert `content` relative to `anchor`; returns the last inserted node (the
/// chain continuation point), or `None` for an empty fragment.
fn insert_fragment(
    dom: &mut Dom,
    anchor: NodeId,
    direction: AnchorDirection,
    content: &str,
) -> Result<Option<NodeId>, EngineError> {
    let fragment = dom.parse_fragment(content)?;
    match direction {
        AnchorDirection::After => {
            let mut cursor = anchor;
            for &id in &fragment {
                dom.insert_after(cursor, id);
                cursor = id;
            }
        }
        AnchorDirection::Before => {
            for &id in &fragment {
                dom.insert_before(anchor, id);
            }
        }
    }
    Ok(fragment.last().copied())
}

/// Apply the failure policy to one unresolved change.
fn record_failure(
    dom: &mut Dom,
    unresolved: &mut Vec<UnresolvedChange>,
    options: &ReconstructOptions,
    change: &ChangeRecord,
    reason: ReconcileError,
) -> Result<(), EngineError> {
    let disposition = match (options.failure_policy, change.new_content.as_deref()) {
        (FailurePolicy::AppendToEnd, Some(content)) if !content.is_empty() => {
            let fragment = dom.parse_fragment(content)?;
            let root = dom.root();
            for id in fragment {
                dom.append_child(root, id);
            }
            Disposition::AppendedToEnd
        }
        _ => Disposition::Skipped,
    };
    warn!(change_id = %change.id, %reason, ?disposition, "change unresolved");
    unresolved.push(UnresolvedChange {
        change_id: change.id.clone(),
        change_type: change.change_type,
        reason,
        disposition,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeStatus;

    fn accepted(mut change: ChangeRecord) -> ChangeRecord {
        change.status = ChangeStatus::Accepted;
        change
    }

    #[test]
    fn test_pending_changes_are_not_applied() {
        let baseline = "<p>A</p>";
        let changes = vec![ChangeRecord::delete("c1", "<p>A</p>")];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.html, baseline);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_modify_then_delete_order() {
        // The delete arrives first in proposal order but must run last.
        let baseline = "<p>A</p><p>B</p>";
        let changes = vec![
            accepted(ChangeRecord::delete("c1", "<p>A</p>")),
            accepted(ChangeRecord::modify("c2", "<p>B</p>", "<p>B2</p>")),
        ];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.html, "<p>B2</p>");
    }

    #[test]
    fn test_insert_before_anchor() {
        let baseline = "<p>B</p>";
        let changes = vec![accepted(
            ChangeRecord::add("c1", "<p>A</p>").with_insert_before("<p>B</p>"),
        )];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.html, "<p>A</p><p>B</p>");
    }

    #[test]
    fn test_multi_node_fragment_keeps_order() {
        let baseline = "<p>A</p>";
        let changes = vec![accepted(
            ChangeRecord::add("c1", "<p>B</p><p>C</p>").with_insert_after("<p>A</p>"),
        )];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.html, "<p>A</p><p>B</p><p>C</p>");
    }

    #[test]
    fn test_additions_sorted_by_anchor_position() {
        let baseline = "<p>One</p><p>Two</p>";
        // Proposal order is reversed relative to document order.
        let changes = vec![
            accepted(ChangeRecord::add("c1", "<p>AfterTwo</p>").with_insert_after("<p>Two</p>")),
            accepted(ChangeRecord::add("c2", "<p>AfterOne</p>").with_insert_after("<p>One</p>")),
        ];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(
            report.html,
            "<p>One</p><p>AfterOne</p><p>Two</p><p>AfterTwo</p>"
        );
    }

    #[test]
    fn test_append_to_end_legacy_mode() {
        let baseline = "<p>A</p>";
        let changes = vec![accepted(
            ChangeRecord::add("c1", "<p>Lost</p>").with_insert_after("<p>Missing</p>"),
        )];

        let options = ReconstructOptions {
            failure_policy: FailurePolicy::AppendToEnd,
        };
        let report = reconstruct(baseline, &changes, &options).unwrap();
        assert_eq!(report.html, "<p>A</p><p>Lost</p>");
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].disposition, Disposition::AppendedToEnd);
    }

    #[test]
    fn test_unresolved_delete_is_always_skipped() {
        let baseline = "<p>A</p>";
        let changes = vec![accepted(ChangeRecord::delete("c1", "<p>Missing</p>"))];

        let options = ReconstructOptions {
            failure_policy: FailurePolicy::AppendToEnd,
        };
        let report = reconstruct(baseline, &changes, &options).unwrap();
        assert_eq!(report.html, baseline);
        assert_eq!(report.unresolved[0].disposition, Disposition::Skipped);
        assert_eq!(report.unresolved[0].reason, ReconcileError::TargetNotFound);
    }

    #[test]
    fn test_chain_member_with_missing_predecessor_reported() {
        let baseline = "<p>A</p>";
        let changes = vec![accepted(
            ChangeRecord::add("c2", "<p>X</p>").with_chained_after("c1"),
        )];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.html, baseline);
        assert_eq!(
            report.unresolved[0].reason,
            ReconcileError::ChainedAnchorNotFound {
                predecessor: "c1".to_string()
            }
        );
    }

    #[test]
    fn test_ambiguous_text_match_reported_not_guessed() {
        let baseline =
            "<p><b>a long enough</b> sentence</p><p>a long enough sentence</p>";
        let changes = vec![accepted(ChangeRecord::modify(
            "c1",
            "<p><u>a long enough</u> sentence</p>",
            "<p>replacement</p>",
        ))];
        let report = reconstruct(baseline, &changes, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.html, baseline);
        assert!(matches!(
            report.unresolved[0].reason,
            ReconcileError::AmbiguousMatch { .. }
        ));
    }
}
