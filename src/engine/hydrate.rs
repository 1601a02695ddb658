//! Hydration cursor.
//!
//! During [`Root::hydrate`](super::Root::hydrate) the runtime keeps a stack of
//! cursors, one per DOM parent being hydrated. The top cursor points at the
//! next server-rendered node that the diff may claim instead of creating a
//! fresh one.
//!
//! ```text
//! <ul>                    cursors: [Server(li#1)]
//!   <li>1</li>   <- claim_element("li") consumes li#1, cursor -> li#2
//!   <li>2</li>
//! </ul>
//! ```
//!
//! Mismatches never fail the render. Text is overwritten, a wrong element is
//! dropped (its subtree is then created from scratch), stray text and
//! comments are skipped, and anything left over when a parent finishes is
//! removed. Every correction is logged as a warning.

use super::{Place, Runtime};
use crate::dom::{DomId, NodeType};
use crate::region;

#[derive(Debug, Clone, Copy)]
enum Cursor {
    /// Next unclaimed server node under this parent.
    Server(Option<DomId>),
    /// Parent created during the pass; nothing below it can be claimed.
    Fresh,
}

/// Cursor stack for one hydration pass.
#[derive(Debug)]
pub(crate) struct Hydration {
    cursors: Vec<Cursor>,
}

impl Hydration {
    pub fn new(first: Option<DomId>) -> Self {
        Self {
            cursors: vec![Cursor::Server(first)],
        }
    }

    fn top(&self) -> Option<DomId> {
        match self.cursors.last() {
            Some(Cursor::Server(next)) => *next,
            _ => None,
        }
    }

    fn expects_server_nodes(&self) -> bool {
        matches!(self.cursors.last(), Some(Cursor::Server(_)))
    }

    fn advance(&mut self, next: Option<DomId>) {
        if let Some(Cursor::Server(top)) = self.cursors.last_mut() {
            *top = next;
        }
    }

    fn pop(&mut self) -> Option<DomId> {
        match self.cursors.pop() {
            Some(Cursor::Server(leftover)) => leftover,
            _ => None,
        }
    }
}

impl Runtime {
    pub(crate) fn begin_hydration(&self, container: DomId) {
        let first = self.doc().first_child(container);
        *self.hydration.borrow_mut() = Some(Hydration::new(first));
    }

    /// Finish the pass, removing whatever the render did not claim.
    pub(crate) fn end_hydration(&self, container: DomId) {
        self.pop_cursor(container, true);
        *self.hydration.borrow_mut() = None;
    }

    pub(crate) fn is_hydrating(&self) -> bool {
        self.hydration.borrow().is_some()
    }

    /// Enter an adopted server element whose first child is `first`.
    pub(crate) fn push_cursor(&self, first: Option<DomId>) {
        if let Some(hydration) = self.hydration.borrow_mut().as_mut() {
            hydration.cursors.push(Cursor::Server(first));
        }
    }

    /// Enter an element created during the pass.
    pub(crate) fn push_fresh(&self) {
        if let Some(hydration) = self.hydration.borrow_mut().as_mut() {
            hydration.cursors.push(Cursor::Fresh);
        }
    }

    /// Leave a DOM parent. With `trim`, unclaimed nodes left in it are removed.
    pub(crate) fn pop_cursor(&self, parent: DomId, trim: bool) {
        let leftover = self
            .hydration
            .borrow_mut()
            .as_mut()
            .and_then(Hydration::pop);
        if !trim {
            return;
        }
        let doc = self.doc();
        let mut current = leftover;
        while let Some(dom) = current {
            current = doc.next_sibling(dom);
            if !is_blank(doc.node_type(dom), doc.text_data(dom).as_deref()) {
                log::warn!(
                    "hydration mismatch in <{}>: removing unexpected {}",
                    doc.tag(parent).unwrap_or_default(),
                    describe(doc.node_type(dom), doc.tag(dom))
                );
            }
            doc.remove(dom);
        }
    }

    /// Where a new node goes: before the next unclaimed server node while
    /// hydrating, else before the place's anchor.
    pub(crate) fn insertion_anchor(&self, place: Place) -> Option<DomId> {
        match self.hydration.borrow().as_ref() {
            Some(hydration) => hydration.top().or(place.anchor),
            None => place.anchor,
        }
    }

    fn candidate(&self) -> Option<DomId> {
        self.hydration.borrow().as_ref().and_then(Hydration::top)
    }

    fn consume(&self, dom: DomId) {
        let next = self.doc().next_sibling(dom);
        if let Some(hydration) = self.hydration.borrow_mut().as_mut() {
            hydration.advance(next);
        }
    }

    /// Adopt the server text node at the cursor.
    pub(crate) fn claim_text(&self, text: &str) -> Option<DomId> {
        let doc = self.doc();
        let Some(candidate) = self.candidate() else {
            let expected = self
                .hydration
                .borrow()
                .as_ref()
                .is_some_and(Hydration::expects_server_nodes);
            if expected && !text.is_empty() {
                log::warn!("hydration mismatch: expected text {text:?}, found nothing");
            }
            return None;
        };
        if !doc.is_text(candidate) {
            if !text.is_empty() {
                log::warn!(
                    "hydration mismatch: expected text {text:?}, found {}",
                    describe(doc.node_type(candidate), doc.tag(candidate))
                );
            }
            return None;
        }

        self.consume(candidate);
        let actual = doc.text_data(candidate).unwrap_or_default();
        if actual != text {
            log::warn!("hydration mismatch: text {actual:?} replaced with {text:?}");
            doc.set_text_data(candidate, text);
        }
        Some(candidate)
    }

    /// Adopt the server element at the cursor if it has the expected tag.
    ///
    /// Stray text and comments before it are removed. An element with a
    /// different tag is removed too and `None` is returned, so the caller
    /// builds this subtree from scratch.
    pub(crate) fn claim_element(&self, tag: &str) -> Option<DomId> {
        let doc = self.doc();
        loop {
            let candidate = self.candidate()?;
            match doc.node_type(candidate) {
                NodeType::Element => {
                    let actual = doc.tag(candidate).unwrap_or_default();
                    if actual.eq_ignore_ascii_case(tag) {
                        self.consume(candidate);
                        return Some(candidate);
                    }
                    log::warn!("hydration mismatch: expected <{tag}>, found <{actual}>; recreating it");
                    self.consume(candidate);
                    doc.remove(candidate);
                    return None;
                }
                node_type => {
                    if !is_blank(node_type, doc.text_data(candidate).as_deref()) {
                        log::warn!(
                            "hydration mismatch: expected <{tag}>, skipping {}",
                            describe(node_type, None)
                        );
                    }
                    self.consume(candidate);
                    doc.remove(candidate);
                }
            }
        }
    }

    /// Adopt a server-rendered frame region `<!--vroot:ID-->...<!--/vroot-->`.
    ///
    /// Returns the start and end markers; the cursor moves past the end.
    pub(crate) fn claim_frame(&self, id: &str) -> Option<(DomId, DomId)> {
        let doc = self.doc();
        let start = self.candidate()?;
        let data = doc.is_comment(start).then(|| doc.text_data(start)).flatten()?;
        if !region::is_region_start(&data) {
            log::warn!("hydration mismatch: expected frame `{id}`, found {}", describe(doc.node_type(start), doc.tag(start)));
            return None;
        }
        if data != region::start_marker(id) {
            log::warn!("hydration mismatch: frame {data:?} renamed to `{id}`");
            doc.set_text_data(start, &region::start_marker(id));
        }

        let mut depth = 0usize;
        let mut current = doc.next_sibling(start);
        while let Some(dom) = current {
            if let Some(data) = doc.is_comment(dom).then(|| doc.text_data(dom)).flatten() {
                if region::is_region_start(&data) {
                    depth += 1;
                } else if region::is_region_end(&data) {
                    if depth == 0 {
                        self.consume(dom);
                        return Some((start, dom));
                    }
                    depth -= 1;
                }
            }
            current = doc.next_sibling(dom);
        }
        log::warn!("hydration mismatch: frame `{id}` has no end marker");
        None
    }
}

fn is_blank(node_type: NodeType, data: Option<&str>) -> bool {
    node_type == NodeType::Text && data.is_none_or(|d| d.trim().is_empty())
}

fn describe(node_type: NodeType, tag: Option<String>) -> String {
    match (node_type, tag) {
        (NodeType::Element, Some(tag)) => format!("<{tag}>"),
        (NodeType::Text, _) => "text".to_string(),
        (NodeType::Comment, _) => "comment".to_string(),
        _ => "node".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_fresh_parent_has_no_candidates() {
        let doc = Document::new();
        let a = doc.create_text("a");
        let mut hydration = Hydration::new(Some(a));
        assert_eq!(hydration.top(), Some(a));

        hydration.cursors.push(Cursor::Fresh);
        assert_eq!(hydration.top(), None);
        assert!(!hydration.expects_server_nodes());
        hydration.advance(None);
        assert_eq!(hydration.pop(), None);

        assert_eq!(hydration.top(), Some(a));
        hydration.advance(None);
        assert!(hydration.expects_server_nodes());
        assert_eq!(hydration.pop(), None);
    }

    #[test]
    fn test_blank_text_is_quietly_removable() {
        assert!(is_blank(NodeType::Text, Some("\n  ")));
        assert!(!is_blank(NodeType::Text, Some("x")));
        assert!(!is_blank(NodeType::Comment, Some("")));
        assert_eq!(describe(NodeType::Element, Some("li".into())), "<li>");
    }
}
