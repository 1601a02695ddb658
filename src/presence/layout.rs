//! FLIP layout tracking.
//!
//! Elements with `presence.layout` are measured before a scheduler flush
//! (first), measured again after it (last), and animated from the inverted
//! offset back to identity (play). Only elements below a DOM parent that a
//! pending re-render will touch are measured.

use rustc_hash::FxHashMap;

use crate::dom::{Animation, Document, DomId};
use crate::types::{Keyframe, KeyframeOptions, Rect};

#[derive(Debug, Default)]
struct Tracked {
    pending: bool,
    first: Option<Rect>,
    animation: Option<Animation>,
}

#[derive(Debug, Default)]
pub(crate) struct LayoutTracker {
    tracked: FxHashMap<DomId, Tracked>,
}

impl LayoutTracker {
    pub fn register(&mut self, dom: DomId) {
        self.tracked.entry(dom).or_default();
    }

    pub fn unregister(&mut self, dom: DomId) {
        if let Some(entry) = self.tracked.remove(&dom) {
            if let Some(animation) = entry.animation {
                animation.cancel();
            }
        }
    }

    /// Flag every tracked element inside one of `parents`.
    pub fn mark_pending(&mut self, doc: &Document, parents: &[DomId]) {
        for (&dom, entry) in self.tracked.iter_mut() {
            if parents.iter().any(|&p| doc.contains(p, dom)) {
                entry.pending = true;
            }
        }
    }

    /// First: record the pre-flush rect of every pending element.
    pub fn snapshot(&mut self, doc: &Document) {
        for (&dom, entry) in self.tracked.iter_mut() {
            if entry.pending && doc.is_connected(dom) {
                entry.first = Some(doc.bounding_rect(dom));
            }
        }
    }

    /// Last, invert, play. Returns how many elements were animated.
    pub fn apply(&mut self, doc: &Document, options: KeyframeOptions) -> usize {
        let mut played = 0;
        for (&dom, entry) in self.tracked.iter_mut() {
            let first = entry.first.take();
            if !std::mem::take(&mut entry.pending) {
                continue;
            }
            let Some(first) = first else {
                continue;
            };
            if !doc.is_connected(dom) {
                continue;
            }
            let last = doc.bounding_rect(dom);
            let Some(from) = inverted_transform(first, last) else {
                continue;
            };
            if let Some(previous) = entry.animation.take() {
                previous.cancel();
            }
            entry.animation = Some(doc.animate(
                dom,
                vec![
                    Keyframe::new().set("transform", from),
                    Keyframe::new().set("transform", "none"),
                ],
                options.clone(),
            ));
            played += 1;
        }
        played
    }
}

/// Transform that puts an element laid out at `last` back where `first` was.
fn inverted_transform(first: Rect, last: Rect) -> Option<String> {
    let dx = first.x - last.x;
    let dy = first.y - last.y;
    let sx = if last.width > 0.0 { first.width / last.width } else { 1.0 };
    let sy = if last.height > 0.0 { first.height / last.height } else { 1.0 };
    if dx == 0.0 && dy == 0.0 && sx == 1.0 && sy == 1.0 {
        return None;
    }
    let mut transform = format!("translate({dx}px, {dy}px)");
    if sx != 1.0 || sy != 1.0 {
        transform.push_str(&format!(" scale({sx}, {sy})"));
    }
    Some(transform)
}
