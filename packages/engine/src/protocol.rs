//! # Proposal Protocol
//!
//! Parser for the tag-delimited change protocol emitted by the external
//! agent:
//!
//! ```text
//! <change type="modify" targetId="n4">
//!   <original><p>Old text</p></original>
//!   <new><p>New text</p></new>
//! </change>
//! ```
//!
//! Attribute values routinely contain nested quoted HTML
//! (`insertAfter="<p class="intro">Hi</p>"`), so a value's closing quote is
//! found by lookahead (the quote followed by another known attribute or by
//! the tag terminator), not by taking the first `"` encountered.
//!
//! Malformed blocks are dropped with a warning before they reach the engine;
//! proposal-format failures are not part of the reconciliation error
//! taxonomy.

use tracing::warn;

use plaud_markup::IdGenerator;

use crate::changes::{AnchorDirection, ChangeRecord, ChangeType};

const KNOWN_ATTRS: &[&str] = &[
    "type",
    "id",
    "targetId",
    "anchorTargetId",
    "insertAfter",
    "insertBefore",
    "anchorDirection",
    "chainedAfter",
];

/// Parse every well-formed `<change>` block in `input`. Blocks without an
/// explicit id are assigned sequential ids.
///
/// Consecutive `add` blocks with no anchor of their own are chained onto the
/// preceding `add`, forming an ordered insertion sequence.
pub fn parse_proposals(input: &str, ids: &mut IdGenerator) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();
    let mut previous_add: Option<String> = None;
    let mut pos = 0;

    while let Some(rel) = input[pos..].find("<change") {
        let block_start = pos + rel;
        let attrs_start = block_start + "<change".len();

        let Some(close_rel) = input[attrs_start..].find("</change>") else {
            warn!(offset = block_start, "unterminated change block dropped");
            break;
        };
        let close_idx = attrs_start + close_rel;
        pos = close_idx + "</change>".len();

        // The attribute region ends where the body's first section (or the
        // block terminator) begins; the tag-closing '>' lives inside it.
        let region_end = ["<original", "<new", "</change"]
            .iter()
            .filter_map(|marker| input[attrs_start..].find(marker))
            .min()
            .unwrap_or(close_rel);
        let attr_region = &input[attrs_start..attrs_start + region_end];
        let body = &input[attrs_start + region_end..close_idx];

        let Some(attrs) = scan_attrs(attr_region) else {
            warn!(offset = block_start, "unparsable change attributes; block dropped");
            previous_add = None;
            continue;
        };

        match build_change(&attrs, body, ids, &previous_add) {
            Ok(change) => {
                previous_add = match change.change_type {
                    ChangeType::Add => Some(change.id.clone()),
                    _ => None,
                };
                changes.push(change);
            }
            Err(reason) => {
                warn!(offset = block_start, reason, "invalid change block dropped");
                previous_add = None;
            }
        }
    }

    changes
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn build_change(
    attrs: &[(String, String)],
    body: &str,
    ids: &mut IdGenerator,
    previous_add: &Option<String>,
) -> Result<ChangeRecord, &'static str> {
    let change_type = match attr(attrs, "type") {
        Some("add") => ChangeType::Add,
        Some("delete") => ChangeType::Delete,
        Some("modify") => ChangeType::Modify,
        Some(_) => return Err("unknown change type"),
        None => return Err("missing change type"),
    };

    let insert_after = attr(attrs, "insertAfter");
    let insert_before = attr(attrs, "insertBefore");
    if insert_after.is_some() && insert_before.is_some() {
        return Err("insertAfter and insertBefore are mutually exclusive");
    }

    let original = extract_section(body, "original");
    let new = extract_section(body, "new");
    match change_type {
        ChangeType::Add if new.is_none() => return Err("add without <new> content"),
        ChangeType::Delete if original.is_none() => {
            return Err("delete without <original> content")
        }
        ChangeType::Modify if original.is_none() || new.is_none() => {
            return Err("modify needs <original> and <new> content")
        }
        _ => {}
    }

    let id = attr(attrs, "id")
        .map(str::to_string)
        .unwrap_or_else(|| ids.new_id());

    let mut change = ChangeRecord {
        id,
        change_type,
        status: Default::default(),
        original_content: original,
        new_content: new,
        target_id: attr(attrs, "targetId").map(str::to_string),
        anchor_target_id: attr(attrs, "anchorTargetId").map(str::to_string),
        insert_after: insert_after.map(str::to_string),
        insert_before: insert_before.map(str::to_string),
        anchor_direction: match attr(attrs, "anchorDirection") {
            Some("before") => Some(AnchorDirection::Before),
            Some("after") => Some(AnchorDirection::After),
            _ => None,
        },
        chained_after: attr(attrs, "chainedAfter").map(str::to_string),
        pattern_group: None,
        cached_signature: None,
    };

    // Anchorless adds chain onto the preceding add.
    if change.change_type == ChangeType::Add
        && change.chained_after.is_none()
        && change.anchor_target_id.is_none()
        && change.anchor_content().is_none()
    {
        match previous_add {
            Some(predecessor) => change.chained_after = Some(predecessor.clone()),
            None => return Err("add without anchor or predecessor"),
        }
    }

    Ok(change)
}

/// Extract `<name>…</name>` from the block body.
fn extract_section(body: &str, name: &str) -> Option<String> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let start = body.find(&open)? + open.len();
    // Last occurrence, in case the section itself carries nested markup with
    // a matching close tag.
    let end = body.rfind(&close)?;
    if end < start {
        return None;
    }
    Some(body[start..end].trim().to_string())
}

/// Sequentially scan `name="value"` pairs out of the attribute region.
fn scan_attrs(region: &str) -> Option<Vec<(String, String)>> {
    let bytes = region.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] == b'>' || region[pos..].starts_with("/>") {
            return Some(attrs);
        }

        let name_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'-') {
            pos += 1;
        }
        if pos == name_start || !region[pos..].starts_with("=\"") {
            return None;
        }
        let name = region[name_start..pos].to_string();
        pos += 2;

        let end = find_value_end(&region[pos..])?;
        attrs.push((name, region[pos..pos + end].to_string()));
        pos += end + 1;
    }
}

/// Locate the closing quote of an attribute value that may itself contain
/// quoted HTML.
///
/// Preference order: the first `"` followed by another known attribute
/// assignment; then the first `"` followed by the tag terminator with nothing
/// but whitespace after it; then the first `"` followed by any `>`.
fn find_value_end(rest: &str) -> Option<usize> {
    let candidates: Vec<usize> = rest
        .char_indices()
        .filter(|&(_, c)| c == '"')
        .map(|(i, _)| i)
        .collect();

    for &c in &candidates {
        let after = rest[c + 1..].trim_start();
        if followed_by_known_attr(after) {
            return Some(c);
        }
    }
    for &c in &candidates {
        let after = rest[c + 1..].trim_start();
        if let Some(tail) = after.strip_prefix("/>").or_else(|| after.strip_prefix('>')) {
            if tail.trim().is_empty() {
                return Some(c);
            }
        }
    }
    candidates.into_iter().find(|&c| {
        let after = rest[c + 1..].trim_start();
        after.starts_with('>') || after.starts_with("/>")
    })
}

fn followed_by_known_attr(after: &str) -> bool {
    let Some(eq) = after.find('=') else {
        return false;
    };
    let name = &after[..eq];
    name.len() < 24
        && KNOWN_ATTRS.contains(&name)
        && after[eq + 1..].starts_with('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> IdGenerator {
        IdGenerator::new("doc_test")
    }

    #[test]
    fn test_parse_modify_block() {
        let input = r#"
            <change type="modify" targetId="n4">
                <original><p>Old</p></original>
                <new><p>New</p></new>
            </change>
        "#;
        let changes = parse_proposals(input, &mut ids());
        assert_eq!(changes.len(), 1);
        let c = &changes[0];
        assert_eq!(c.change_type, ChangeType::Modify);
        assert_eq!(c.target_id.as_deref(), Some("n4"));
        assert_eq!(c.original_content.as_deref(), Some("<p>Old</p>"));
        assert_eq!(c.new_content.as_deref(), Some("<p>New</p>"));
    }

    #[test]
    fn test_nested_quoted_html_in_attribute() {
        let input = concat!(
            r#"<change type="add" insertAfter="<p class="intro">Hello</p>">"#,
            "<new><p>X</p></new></change>"
        );
        let changes = parse_proposals(input, &mut ids());
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].insert_after.as_deref(),
            Some(r#"<p class="intro">Hello</p>"#)
        );
    }

    #[test]
    fn test_nested_quotes_before_following_attribute() {
        let input = concat!(
            r#"<change type="add" insertAfter="<p class="intro">Hi</p>" anchorDirection="after">"#,
            "<new><p>X</p></new></change>"
        );
        let changes = parse_proposals(input, &mut ids());
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].insert_after.as_deref(),
            Some(r#"<p class="intro">Hi</p>"#)
        );
        assert_eq!(changes[0].anchor_direction, Some(AnchorDirection::After));
    }

    #[test]
    fn test_malformed_block_dropped_others_survive() {
        let input = r#"
            <change type="mystery"><new><p>A</p></new></change>
            <change type="delete"><original><p>B</p></original></change>
        "#;
        let changes = parse_proposals(input, &mut ids());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Delete);
    }

    #[test]
    fn test_consecutive_anchorless_adds_chain() {
        let input = r#"
            <change type="add" insertAfter="<p>A</p>"><new><p>One</p></new></change>
            <change type="add"><new><p>Two</p></new></change>
            <change type="add"><new><p>Three</p></new></change>
        "#;
        let changes = parse_proposals(input, &mut ids());
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].chained_after, None);
        assert_eq!(changes[1].chained_after.as_deref(), Some(changes[0].id.as_str()));
        assert_eq!(changes[2].chained_after.as_deref(), Some(changes[1].id.as_str()));
    }

    #[test]
    fn test_add_without_anchor_or_predecessor_dropped() {
        let input = r#"<change type="add"><new><p>Orphan</p></new></change>"#;
        let changes = parse_proposals(input, &mut ids());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_explicit_id_attribute_respected() {
        let input = r#"<change type="delete" id="custom-1"><original><p>B</p></original></change>"#;
        let changes = parse_proposals(input, &mut ids());
        assert_eq!(changes[0].id, "custom-1");
    }

    #[test]
    fn test_unterminated_block_dropped() {
        let input = r#"<change type="delete"><original><p>B</p></original>"#;
        let changes = parse_proposals(input, &mut ids());
        assert!(changes.is_empty());
    }
}
