//! Keyed child reconciliation.
//!
//! Two passes over the next children:
//!
//! 1. **Match.** Each next child is paired with a previous child that has the
//!    same key and type, or (for unkeyed children) the unkeyed previous child
//!    of the same type at the skew-adjusted position. A running `skew`
//!    absorbs single insertions and deletions so that shifting a list by one
//!    keeps later unkeyed children paired with their old positions.
//! 2. **Place.** Unmatched previous children are removed first. Then, walking
//!    forward, each child is mounted or diffed and its DOM position is
//!    compared with the node right after the last placed one. Only a child
//!    that is not already there is moved, so a list shifted by one costs a
//!    single insertion. Exiting elements are stepped over; they keep their
//!    position until their animation ends.
//!
//! The flags and match indices live in a side table that is dropped when the
//! pass ends; nothing is written onto the committed nodes.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{NodeId, Place, Runtime};
use crate::dom::DomId;
use crate::error::RenderError;
use crate::types::Key;
use crate::vnode::VNode;

bitflags! {
    /// Per-child reconciliation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Flags: u8 {
        /// Previous child was claimed by a next child.
        const MATCHED = 1 << 0;
    }
}

struct Slot {
    node: VNode,
    /// Index into the previous children.
    matched: Option<usize>,
}

impl Runtime {
    /// Reconcile `prev` (committed children) against `next`.
    ///
    /// Returns the new committed children in order. On `Err`, every previous
    /// child and every new child built so far has been unmounted.
    pub(crate) fn diff_children(
        &self,
        prev: Vec<NodeId>,
        next: Vec<VNode>,
        place: Place,
    ) -> Result<Vec<NodeId>, RenderError> {
        let prev: Vec<NodeId> = prev.into_iter().filter(|&id| self.is_mounted(id)).collect();
        if next.iter().all(|child| child.key().is_none()) {
            return self.diff_positional(prev, next, place);
        }
        self.diff_keyed(prev, next, place)
    }

    /// No next child is keyed: pair by index.
    fn diff_positional(&self, prev: Vec<NodeId>, next: Vec<VNode>, place: Place) -> Result<Vec<NodeId>, RenderError> {
        let mut out = Vec::with_capacity(next.len());
        let next_len = next.len();

        for (i, child) in next.into_iter().enumerate() {
            let old = prev.get(i).copied();
            let anchor = match old {
                Some(_) => self.first_dom_of(&prev[i + 1..]).or(place.anchor),
                None => place.anchor,
            };
            match self.diff(old, child, place.before(anchor)) {
                Ok(id) => out.push(id),
                Err(err) => {
                    for id in out {
                        self.remove_now(id);
                    }
                    for &rest in prev.iter().skip(i + 1) {
                        self.remove_now(rest);
                    }
                    return Err(err);
                }
            }
        }
        for &surplus in prev.iter().skip(next_len) {
            self.remove(surplus);
        }
        Ok(out)
    }

    fn diff_keyed(&self, prev: Vec<NodeId>, next: Vec<VNode>, place: Place) -> Result<Vec<NodeId>, RenderError> {
        let doc = self.doc();

        // Where the region starts, fixed before anything moves.
        let region_before = match self.first_dom_of(&prev) {
            Some(first) => doc.prev_sibling(first),
            None => match place.anchor {
                Some(anchor) => doc.prev_sibling(anchor),
                None => doc.last_child(place.dom_parent),
            },
        };

        let prev_keys: Vec<Option<Key>> = prev
            .iter()
            .map(|&id| self.with_node(id, |n| n.key.clone()).flatten())
            .collect();
        let mut key_map: FxHashMap<Key, usize> = FxHashMap::default();
        for (index, key) in prev_keys.iter().enumerate() {
            if let Some(key) = key {
                key_map.entry(key.clone()).or_insert(index);
            }
        }

        // ---------------------------------------------------------------------
        // Match
        // ---------------------------------------------------------------------

        let mut old_flags = vec![Flags::empty(); prev.len()];
        let mut slots: Vec<Slot> = Vec::with_capacity(next.len());
        let mut seen: FxHashSet<Key> = FxHashSet::default();
        let mut skew: isize = 0;

        for (i, node) in next.into_iter().enumerate() {
            let skewed = i as isize + skew;
            let duplicate = match node.key() {
                Some(key) if !seen.insert(key.clone()) => {
                    log::warn!("duplicate key `{key}` among siblings; mounting it as a new node");
                    true
                }
                _ => false,
            };

            let matched = if duplicate {
                None
            } else {
                match node.key() {
                    Some(key) => key_map
                        .get(key)
                        .copied()
                        .filter(|&j| !old_flags[j].contains(Flags::MATCHED))
                        .filter(|&j| self.same_type(prev[j], &node)),
                    None => usize::try_from(skewed)
                        .ok()
                        .filter(|&j| j < prev.len())
                        .filter(|&j| !old_flags[j].contains(Flags::MATCHED) && prev_keys[j].is_none())
                        .filter(|&j| self.same_type(prev[j], &node)),
                }
            };

            match matched {
                None => skew -= 1,
                Some(j) => {
                    old_flags[j] |= Flags::MATCHED;
                    let j = j as isize;
                    if j != skewed {
                        skew += if j > skewed { 1 } else { -1 };
                    }
                }
            }
            slots.push(Slot { node, matched });
        }

        // ---------------------------------------------------------------------
        // Place
        // ---------------------------------------------------------------------

        for (j, flags) in old_flags.iter().enumerate() {
            if !flags.contains(Flags::MATCHED) {
                self.remove(prev[j]);
            }
        }

        let mut out: Vec<NodeId> = Vec::with_capacity(slots.len());
        let mut last_placed = region_before;
        let mut remaining = slots.into_iter();

        while let Some(slot) = remaining.next() {
            let insert_ref = self.next_placeable(last_placed, place.dom_parent);
            let result = match slot.matched {
                None => self.insert(slot.node, place.before(insert_ref)),
                Some(j) => self.diff(Some(prev[j]), slot.node, place.before(insert_ref)),
            };
            let id = match result {
                Ok(id) => id,
                Err(err) => {
                    for id in out {
                        self.remove_now(id);
                    }
                    for rest in remaining {
                        if let Some(j) = rest.matched {
                            self.remove_now(prev[j]);
                        }
                    }
                    return Err(err);
                }
            };

            if slot.matched.is_some() {
                let insert_ref = self.next_placeable(last_placed, place.dom_parent);
                let nodes = self.dom_nodes(id);
                let in_place = nodes.first().is_none_or(|&first| Some(first) == insert_ref);
                if !in_place {
                    log::trace!("moving child {id:?}");
                    for dom in nodes {
                        doc.insert_before(place.dom_parent, dom, insert_ref);
                    }
                }
            }
            if let Some(last) = self.last_dom(id) {
                last_placed = Some(last);
            }
            out.push(id);
        }
        Ok(out)
    }

    /// The sibling after `last_placed` (or the parent's first child), skipping
    /// elements that are animating out.
    fn next_placeable(&self, last_placed: Option<DomId>, dom_parent: DomId) -> Option<DomId> {
        let doc = self.doc();
        let mut current = match last_placed {
            Some(last) => doc.next_sibling(last),
            None => doc.first_child(dom_parent),
        };
        while let Some(dom) = current {
            if !self.is_exiting_dom(dom) {
                break;
            }
            current = doc.next_sibling(dom);
        }
        current
    }

    pub(crate) fn same_type(&self, id: NodeId, next: &VNode) -> bool {
        self.with_node(id, |n| n.same_type(next)).unwrap_or(false)
    }
}
