//! Region DOM diff - patch live nodes against freshly parsed markup.
//!
//! This works without a virtual tree: both sides are DOM nodes. The previous
//! side is a run of live siblings, the next side is detached nodes (usually
//! from [`Document::parse_fragment`]). Next nodes are moved into place when
//! they have no live counterpart.
//!
//! # Matching
//!
//! - Elements with a `data-key` attribute match the previous element with the
//!   same key and tag, wherever it is.
//! - Everything else matches the next unclaimed, unkeyed previous node of the
//!   same kind (and tag) at the current position.
//!
//! # Opaque regions
//!
//! A nested virtual root renders between `<!--vroot:ID-->` and `<!--/vroot-->`.
//! The region diff never looks inside a matched region: only the start
//! marker's data is synced and the markers and everything between them stay
//! exactly where they are.
//!
//! ```text
//! prev: <p/> <!--vroot:a--> ...owned by a nested root... <!--/vroot--> <p/>
//! next: <p/> <!--vroot:a-->        (ignored)            <!--/vroot--> <p/>
//! ```

use rustc_hash::FxHashMap;

use crate::dom::{Document, DomId, NodeType};

/// Data prefix of a region start marker comment.
pub const START_PREFIX: &str = "vroot:";

/// Data of a region end marker comment.
pub const END_MARKER: &str = "/vroot";

/// Attribute that keys elements across a region diff.
pub const KEY_ATTRIBUTE: &str = "data-key";

/// Comment data that opens the region `id`.
pub fn start_marker(id: &str) -> String {
    format!("{START_PREFIX}{id}")
}

pub fn is_region_start(data: &str) -> bool {
    data.starts_with(START_PREFIX)
}

pub fn is_region_end(data: &str) -> bool {
    data == END_MARKER
}

// =============================================================================
// Entry points
// =============================================================================

/// Make the children of `parent` match `html`.
pub fn patch_children(doc: &Document, parent: DomId, html: &str) {
    let prev = doc.children(parent);
    let next = doc.parse_fragment(html);
    diff_nodes(doc, parent, &prev, &next, None);
}

/// Make the nodes strictly between `start` and `end` match `html`.
///
/// Both markers must be siblings; they are left untouched.
pub fn patch_range(doc: &Document, start: DomId, end: DomId, html: &str) {
    let parent = doc.parent(start);
    crate::invariant!(
        parent.is_some() && parent == doc.parent(end),
        "patch_range markers {start:?} and {end:?} are not attached siblings"
    );
    let Some(parent) = parent else {
        return;
    };
    let mut prev = Vec::new();
    let mut current = doc.next_sibling(start);
    while let Some(dom) = current.filter(|&dom| dom != end) {
        prev.push(dom);
        current = doc.next_sibling(dom);
    }
    crate::invariant!(current == Some(end), "patch_range end {end:?} does not follow start {start:?}");
    let next = doc.parse_fragment(html);
    diff_nodes(doc, parent, &prev, &next, Some(end));
}

/// Diff one live node against the first node parsed from `html`.
///
/// Returns the live node standing in its place afterwards.
pub fn patch_node(doc: &Document, node: DomId, html: &str) -> DomId {
    let parsed = doc.parse_fragment(html);
    if parsed.len() != 1 {
        log::warn!("patch_node expected one root node, parsed {}", parsed.len());
    }
    match parsed.first() {
        Some(&next) => diff_node(doc, node, next),
        None => node,
    }
}

// =============================================================================
// Node diff
// =============================================================================

/// Reconcile live `prev` against detached `next`.
///
/// Same kind (and same tag for elements) is patched in place and `prev` is
/// returned. Anything else is swapped for `next`, which is returned.
pub fn diff_node(doc: &Document, prev: DomId, next: DomId) -> DomId {
    match (doc.node_type(prev), doc.node_type(next)) {
        (NodeType::Text, NodeType::Text) | (NodeType::Comment, NodeType::Comment) => {
            let data = doc.text_data(next).unwrap_or_default();
            if doc.text_data(prev).as_deref() != Some(data.as_str()) {
                doc.set_text_data(prev, &data);
            }
            prev
        }
        (NodeType::Element, NodeType::Element) if same_element(doc, prev, next) => {
            diff_attributes(doc, prev, next);
            let prev_children = doc.children(prev);
            let next_children = doc.children(next);
            diff_nodes(doc, prev, &prev_children, &next_children, None);
            prev
        }
        _ => {
            doc.replace_with(prev, next);
            next
        }
    }
}

fn same_element(doc: &Document, a: DomId, b: DomId) -> bool {
    let tags_match = match (doc.tag(a), doc.tag(b)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
        _ => false,
    };
    tags_match && doc.namespace(a) == doc.namespace(b)
}

fn diff_attributes(doc: &Document, prev: DomId, next: DomId) {
    let wanted = doc.attributes(next);
    for attr in doc.attributes(prev) {
        if !wanted.iter().any(|w| w.name == attr.name) {
            doc.remove_attribute(prev, &attr.name);
        }
    }
    for attr in wanted {
        if doc.attribute(prev, &attr.name).as_deref() == Some(attr.value.as_str()) {
            continue;
        }
        match &attr.namespace {
            Some(ns) => doc.set_attribute_ns(prev, ns, &attr.name, &attr.value),
            None => doc.set_attribute(prev, &attr.name, &attr.value),
        }
    }
}

// =============================================================================
// Child-list diff
// =============================================================================

/// One node of the result list.
#[derive(Debug, Clone, Copy)]
struct Placed {
    dom: DomId,
    /// Part of a matched opaque region: never moved.
    pinned: bool,
}

/// Reconcile the live siblings `prev` (children of `parent`) against the
/// detached nodes `next`.
///
/// New nodes go before `tail`, or at the end of `parent` when there is none,
/// so a bounded region never grows past its end.
pub fn diff_nodes(doc: &Document, parent: DomId, prev: &[DomId], next: &[DomId], tail: Option<DomId>) {
    let mut used = vec![false; prev.len()];
    let mut keyed: FxHashMap<String, usize> = FxHashMap::default();
    let mut regions: FxHashMap<String, usize> = FxHashMap::default();
    for (index, &dom) in prev.iter().enumerate() {
        if let Some(key) = data_key(doc, dom) {
            keyed.entry(key).or_insert(index);
        } else if let Some(data) = region_start(doc, dom) {
            regions.entry(data).or_insert(index);
        }
    }

    let mut placed: Vec<Placed> = Vec::with_capacity(next.len());
    let mut cursor = 0;
    let mut j = 0;
    while j < next.len() {
        let node = next[j];

        if let Some(data) = region_start(doc, node) {
            let next_end = region_end_index(doc, next, j);
            let matched = regions
                .get(&data)
                .copied()
                .filter(|&i| !used[i])
                .or_else(|| positional(doc, prev, &used, &mut cursor, node, &keyed));
            let prev_end = matched.and_then(|i| {
                region_start(doc, prev[i])?;
                Some((i, region_end_index(doc, prev, i)?))
            });
            match prev_end {
                Some((start, end)) => {
                    if doc.text_data(prev[start]).as_deref() != Some(data.as_str()) {
                        doc.set_text_data(prev[start], &data);
                    }
                    for index in start..=end {
                        used[index] = true;
                        placed.push(Placed {
                            dom: prev[index],
                            pinned: true,
                        });
                    }
                    if cursor <= end {
                        cursor = end + 1;
                    }
                }
                None => {
                    let last = next_end.unwrap_or(next.len() - 1);
                    for &dom in &next[j..=last] {
                        placed.push(Placed { dom, pinned: false });
                    }
                }
            }
            j = next_end.map_or(next.len(), |end| end + 1);
            continue;
        }

        let matched = match data_key(doc, node) {
            Some(key) => keyed
                .get(&key)
                .copied()
                .filter(|&i| !used[i] && compatible(doc, prev[i], node)),
            None => positional(doc, prev, &used, &mut cursor, node, &keyed),
        };
        let dom = match matched {
            Some(i) => {
                used[i] = true;
                diff_node(doc, prev[i], node)
            }
            None => node,
        };
        placed.push(Placed { dom, pinned: false });
        j += 1;
    }

    for (index, &dom) in prev.iter().enumerate() {
        if !used[index] {
            doc.remove(dom);
        }
    }

    let mut anchor = tail;
    for entry in placed.iter().rev() {
        if !entry.pinned {
            let in_place = doc.parent(entry.dom) == Some(parent) && doc.next_sibling(entry.dom) == anchor;
            if !in_place {
                doc.insert_before(parent, entry.dom, anchor);
            }
        }
        anchor = Some(entry.dom);
    }
    log::trace!("region diff under {parent:?}: {} nodes placed", placed.len());
}

/// Claim the previous node at the cursor if it is unkeyed, unclaimed and of
/// the same kind as `node`.
fn positional(
    doc: &Document,
    prev: &[DomId],
    used: &[bool],
    cursor: &mut usize,
    node: DomId,
    keyed: &FxHashMap<String, usize>,
) -> Option<usize> {
    while *cursor < prev.len() && (used[*cursor] || is_keyed(doc, prev[*cursor], keyed)) {
        *cursor += 1;
    }
    let index = *cursor;
    let candidate = *prev.get(index)?;
    if !compatible(doc, candidate, node) {
        return None;
    }
    *cursor += 1;
    Some(index)
}

fn is_keyed(doc: &Document, dom: DomId, keyed: &FxHashMap<String, usize>) -> bool {
    !keyed.is_empty() && data_key(doc, dom).is_some()
}

/// Same node kind, same tag for elements, and both or neither region starts.
fn compatible(doc: &Document, a: DomId, b: DomId) -> bool {
    match (doc.node_type(a), doc.node_type(b)) {
        (NodeType::Element, NodeType::Element) => same_element(doc, a, b),
        (NodeType::Comment, NodeType::Comment) => region_start(doc, a).is_some() == region_start(doc, b).is_some(),
        (x, y) => x == y,
    }
}

fn data_key(doc: &Document, dom: DomId) -> Option<String> {
    if !doc.is_element(dom) {
        return None;
    }
    doc.attribute(dom, KEY_ATTRIBUTE)
}

fn region_start(doc: &Document, dom: DomId) -> Option<String> {
    if !doc.is_comment(dom) {
        return None;
    }
    doc.text_data(dom).filter(|data| is_region_start(data))
}

fn is_end(doc: &Document, dom: DomId) -> bool {
    doc.is_comment(dom) && doc.text_data(dom).is_some_and(|data| is_region_end(&data))
}

/// Index of the end marker paired with the start marker at `start`.
fn region_end_index(doc: &Document, nodes: &[DomId], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, &dom) in nodes.iter().enumerate().skip(start + 1) {
        if region_start(doc, dom).is_some() {
            depth += 1;
        } else if is_end(doc, dom) {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        }
    }
    None
}
