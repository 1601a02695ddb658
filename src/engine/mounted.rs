//! Committed node shapes and type guards.
//!
//! A committed node is what a diff leaves behind: the render input it came
//! from, minus anything consumed (children become `NodeId`s), plus the live
//! resources it owns. Every kind of committed node lives in the same arena
//! slot type so the diff can walk parent pointers without caring about kinds.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::host::EventsContainer;
use super::registry::{NodeId, Registry};
use crate::dom::{Animation, Document, DomId};
use crate::presence::{Presence, PresenceState};
use crate::types::{Key, PropValue};
use crate::vnode::{
    AbortController, Component, ComponentHandle, ConnectFn, Fallback, OnErrorFn, Props, RenderFn, VNode,
};

pub(crate) struct Mounted {
    pub key: Option<Key>,
    pub parent: Option<NodeId>,
    pub kind: MountedKind,
}

pub(crate) enum MountedKind {
    Text(MountedText),
    Host(MountedHost),
    Component(MountedComponent),
    Fragment(MountedFragment),
    Boundary(MountedBoundary),
    Frame(MountedFrame),
}

/// Discriminant of [`MountedKind`], for dispatch without holding a borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Text,
    Host,
    Component,
    Fragment,
    Boundary,
    Frame,
}

pub(crate) struct MountedText {
    pub dom: DomId,
    pub text: String,
}

pub(crate) struct MountedHost {
    pub tag: String,
    pub dom: DomId,
    pub svg: bool,
    /// Attributes as last applied, `class` already merged with the CSS class.
    pub attrs: Vec<(String, PropValue)>,
    pub children: Vec<NodeId>,
    pub events: Option<EventsContainer>,
    pub connect: Option<ConnectFn>,
    pub abort: Option<AbortController>,
    pub class_name: Option<String>,
    pub presence: Option<Presence>,
    pub state: PresenceState,
    pub animation: Option<Animation>,
    pub layout: bool,
}

impl MountedHost {
    pub fn new(tag: &str, dom: DomId, svg: bool) -> Self {
        Self {
            tag: tag.to_string(),
            dom,
            svg,
            attrs: Vec::new(),
            children: Vec::new(),
            events: None,
            connect: None,
            abort: None,
            class_name: None,
            presence: None,
            state: PresenceState::Idle,
            animation: None,
            layout: false,
        }
    }

    /// Children are created in the SVG namespace unless this is the HTML
    /// island inside an SVG tree.
    pub fn child_svg(&self) -> bool {
        self.svg && self.tag != "foreignObject"
    }
}

pub(crate) struct MountedComponent {
    pub component: Component,
    pub props: Rc<Props>,
    pub handle: ComponentHandle,
    pub render: Option<Rc<RefCell<RenderFn>>>,
    pub content: Option<NodeId>,
    pub svg: bool,
}

#[derive(Default)]
pub(crate) struct MountedFragment {
    pub children: Vec<NodeId>,
}

pub(crate) struct MountedBoundary {
    /// The regular children, or the single fallback node once tripped.
    pub children: Vec<NodeId>,
    pub fallback: Fallback,
    pub on_error: Option<OnErrorFn>,
    pub tripped: bool,
    pub dom_parent: DomId,
    pub svg: bool,
}

pub(crate) struct MountedFrame {
    pub id: String,
    pub start: DomId,
    pub end: DomId,
}

// =============================================================================
// Type guards
// =============================================================================

impl Mounted {
    pub fn new(key: Option<Key>, parent: Option<NodeId>, kind: MountedKind) -> Self {
        Self { key, parent, kind }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.kind {
            MountedKind::Text(_) => NodeKind::Text,
            MountedKind::Host(_) => NodeKind::Host,
            MountedKind::Component(_) => NodeKind::Component,
            MountedKind::Fragment(_) => NodeKind::Fragment,
            MountedKind::Boundary(_) => NodeKind::Boundary,
            MountedKind::Frame(_) => NodeKind::Frame,
        }
    }

    pub fn as_text(&self) -> Option<&MountedText> {
        match &self.kind {
            MountedKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&MountedHost> {
        match &self.kind {
            MountedKind::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut MountedHost> {
        match &mut self.kind {
            MountedKind::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&MountedComponent> {
        match &self.kind {
            MountedKind::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_component_mut(&mut self) -> Option<&mut MountedComponent> {
        match &mut self.kind {
            MountedKind::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_boundary(&self) -> Option<&MountedBoundary> {
        match &self.kind {
            MountedKind::Boundary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_boundary_mut(&mut self) -> Option<&mut MountedBoundary> {
        match &mut self.kind {
            MountedKind::Boundary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&MountedFrame> {
        match &self.kind {
            MountedKind::Frame(f) => Some(f),
            _ => None,
        }
    }

    /// Child list of a node that has one (host, fragment, boundary).
    pub fn children(&self) -> Option<&Vec<NodeId>> {
        match &self.kind {
            MountedKind::Host(h) => Some(&h.children),
            MountedKind::Fragment(f) => Some(&f.children),
            MountedKind::Boundary(b) => Some(&b.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            MountedKind::Host(h) => Some(&mut h.children),
            MountedKind::Fragment(f) => Some(&mut f.children),
            MountedKind::Boundary(b) => Some(&mut b.children),
            _ => None,
        }
    }

    /// Whether `next` describes the same kind of node, so it can be diffed
    /// in place rather than replaced.
    pub fn same_type(&self, next: &VNode) -> bool {
        match (&self.kind, next) {
            (MountedKind::Text(_), VNode::Text(_)) => true,
            (MountedKind::Host(h), VNode::Element(el)) => h.tag == el.tag,
            (MountedKind::Component(c), VNode::Component(n)) => c.component == n.component,
            (MountedKind::Fragment(_), VNode::Fragment(_)) => true,
            (MountedKind::Boundary(_), VNode::ErrorBoundary(_)) => true,
            (MountedKind::Frame(_), VNode::Frame(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Mounted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Mounted");
        s.field("kind", &self.kind()).field("key", &self.key);
        match &self.kind {
            MountedKind::Text(t) => s.field("text", &t.text),
            MountedKind::Host(h) => s.field("tag", &h.tag).field("children", &h.children),
            MountedKind::Component(c) => s.field("component", &c.component).field("content", &c.content),
            MountedKind::Fragment(fr) => s.field("children", &fr.children),
            MountedKind::Boundary(b) => s.field("children", &b.children).field("tripped", &b.tripped),
            MountedKind::Frame(fr) => s.field("id", &fr.id),
        };
        s.finish()
    }
}

// =============================================================================
// DOM range queries
// =============================================================================

/// First live DOM node owned by `id`, skipping dead children.
pub(crate) fn first_dom(registry: &Registry, id: NodeId) -> Option<DomId> {
    let node = registry.get(id)?;
    match &node.kind {
        MountedKind::Text(t) => Some(t.dom),
        MountedKind::Host(h) => Some(h.dom),
        MountedKind::Frame(f) => Some(f.start),
        MountedKind::Component(c) => c.content.and_then(|content| first_dom(registry, content)),
        MountedKind::Fragment(MountedFragment { children })
        | MountedKind::Boundary(MountedBoundary { children, .. }) => {
            children.iter().find_map(|&child| first_dom(registry, child))
        }
    }
}

/// Last live DOM node owned by `id`.
pub(crate) fn last_dom(registry: &Registry, id: NodeId) -> Option<DomId> {
    let node = registry.get(id)?;
    match &node.kind {
        MountedKind::Text(t) => Some(t.dom),
        MountedKind::Host(h) => Some(h.dom),
        MountedKind::Frame(f) => Some(f.end),
        MountedKind::Component(c) => c.content.and_then(|content| last_dom(registry, content)),
        MountedKind::Fragment(MountedFragment { children })
        | MountedKind::Boundary(MountedBoundary { children, .. }) => {
            children.iter().rev().find_map(|&child| last_dom(registry, child))
        }
    }
}

/// Top-level live DOM nodes owned by `id`, in order.
pub(crate) fn dom_nodes(registry: &Registry, doc: &Document, id: NodeId, out: &mut Vec<DomId>) {
    let Some(node) = registry.get(id) else {
        return;
    };
    match &node.kind {
        MountedKind::Text(t) => out.push(t.dom),
        MountedKind::Host(h) => out.push(h.dom),
        MountedKind::Frame(f) => {
            let mut current = Some(f.start);
            while let Some(dom) = current {
                out.push(dom);
                if dom == f.end {
                    break;
                }
                current = doc.next_sibling(dom);
            }
        }
        MountedKind::Component(c) => {
            if let Some(content) = c.content {
                dom_nodes(registry, doc, content, out);
            }
        }
        MountedKind::Fragment(MountedFragment { children })
        | MountedKind::Boundary(MountedBoundary { children, .. }) => {
            for &child in children {
                dom_nodes(registry, doc, child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(doc: &Document, registry: &mut Registry, parent: Option<NodeId>, value: &str) -> NodeId {
        let dom = doc.create_text(value);
        registry.allocate(Mounted::new(
            None,
            parent,
            MountedKind::Text(MountedText {
                dom,
                text: value.to_string(),
            }),
        ))
    }

    #[test]
    fn test_type_guards() {
        let doc = Document::new();
        let mut registry = Registry::default();
        let id = text(&doc, &mut registry, None, "a");
        let node = registry.get(id).unwrap();
        assert_eq!(node.kind(), NodeKind::Text);
        assert!(node.as_host().is_none());
        assert!(node.same_type(&VNode::text("b")));
        assert!(!node.same_type(&VNode::element("p").into()));
    }

    #[test]
    fn test_dom_range_skips_dead_children() {
        let doc = Document::new();
        let mut registry = Registry::default();
        let frag = registry.allocate(Mounted::new(None, None, MountedKind::Fragment(MountedFragment::default())));
        let a = text(&doc, &mut registry, Some(frag), "a");
        let b = text(&doc, &mut registry, Some(frag), "b");
        let c = text(&doc, &mut registry, Some(frag), "c");
        if let MountedKind::Fragment(f) = &mut registry.get_mut(frag).unwrap().kind {
            f.children = vec![a, b, c];
        }
        let a_dom = registry.get(a).unwrap().as_text().unwrap().dom;
        let c_dom = registry.get(c).unwrap().as_text().unwrap().dom;

        registry.release(a);
        registry.release(c);
        let b_dom = registry.get(b).unwrap().as_text().unwrap().dom;
        assert_ne!(Some(a_dom), first_dom(&registry, frag));
        assert_eq!(first_dom(&registry, frag), Some(b_dom));
        assert_eq!(last_dom(&registry, frag), Some(b_dom));
        assert_ne!(Some(c_dom), last_dom(&registry, frag));

        let mut out = Vec::new();
        dom_nodes(&registry, &doc, frag, &mut out);
        assert_eq!(out, vec![b_dom]);
    }
}
