//! Tree diff: dispatch, insert, replace and remove.
//!
//! # Cleanup contract
//!
//! Every function here that returns `Err` has already unmounted everything
//! it was responsible for: the previous node it was diffing and whatever part
//! of the next tree it had built. Callers never clean up after a failed diff;
//! they only decide what to show instead (see `boundary.rs`).

use std::cell::RefCell;
use std::rc::Rc;

use super::mounted::{
    Mounted, MountedBoundary, MountedComponent, MountedFragment, MountedFrame, MountedKind, MountedText,
    NodeKind,
};
use super::{NodeId, Place, Runtime};
use crate::error::RenderError;
use crate::region;
use crate::scheduler::UpdateTarget;
use crate::vnode::{ComponentHandle, ComponentNode, Fragment, FramePlaceholder, Rendered, VNode};

impl Runtime {
    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Reconcile the committed node `prev` (if any) against `next`.
    ///
    /// Returns the committed node now standing for `next`: `prev` itself when
    /// it was diffed in place, a new node when it was mounted or replaced.
    pub(crate) fn diff(&self, prev: Option<NodeId>, next: VNode, place: Place) -> Result<NodeId, RenderError> {
        let Some(prev) = prev.filter(|&id| self.is_mounted(id)) else {
            return self.insert(next, place);
        };
        let (same_type, tripped) = self
            .with_node(prev, |node| {
                let tripped = node.as_boundary().is_some_and(|b| b.tripped);
                (node.same_type(&next), tripped)
            })
            .unwrap_or_default();
        if !same_type || tripped {
            return self.replace(prev, next, place);
        }

        self.with_node_mut(prev, |node| {
            node.parent = place.parent;
            node.key = next.key().cloned();
        });
        match next {
            VNode::Text(text) => {
                self.diff_text(prev, text);
                Ok(prev)
            }
            VNode::Element(element) => self.diff_host(prev, element),
            VNode::Component(component) => self.diff_component(prev, component, place),
            VNode::Fragment(fragment) => self.diff_fragment(prev, fragment, place),
            VNode::ErrorBoundary(boundary) => self.diff_boundary(prev, boundary, place),
            VNode::Frame(frame) => crate::invariant_failed!(
                "frame placeholder `{}` diffed against another frame placeholder",
                frame.id
            ),
        }
    }

    /// Mount `next` before the place's anchor.
    pub(crate) fn insert(&self, next: VNode, place: Place) -> Result<NodeId, RenderError> {
        match next {
            VNode::Text(text) => Ok(self.insert_text(text, place)),
            VNode::Element(element) => self.insert_host(element, place),
            VNode::Component(component) => self.mount_component(component, place),
            VNode::Fragment(fragment) => self.insert_fragment(fragment, place),
            VNode::ErrorBoundary(boundary) => self.mount_boundary(boundary, place),
            VNode::Frame(frame) => Ok(self.insert_frame(frame, place)),
        }
    }

    /// Mount `children` in order. On error the ones already mounted go away.
    pub(crate) fn insert_children(&self, children: Vec<VNode>, place: Place) -> Result<Vec<NodeId>, RenderError> {
        let mut mounted = Vec::with_capacity(children.len());
        for child in children {
            match self.insert(child, place) {
                Ok(id) => mounted.push(id),
                Err(err) => {
                    for id in mounted {
                        self.remove_now(id);
                    }
                    return Err(err);
                }
            }
        }
        Ok(mounted)
    }

    /// Insert `next` where `prev` is, then remove `prev`.
    fn replace(&self, prev: NodeId, next: VNode, place: Place) -> Result<NodeId, RenderError> {
        let anchor = self.first_dom(prev).or(place.anchor);
        let id = match self.insert(next, place.before(anchor)) {
            Ok(id) => id,
            Err(err) => {
                self.remove_now(prev);
                return Err(err);
            }
        };
        self.remove(prev);
        Ok(id)
    }

    // =========================================================================
    // Text
    // =========================================================================

    fn insert_text(&self, text: String, place: Place) -> NodeId {
        let dom = match self.claim_text(&text) {
            Some(dom) => dom,
            None => {
                let dom = self.doc().create_text(&text);
                self.doc()
                    .insert_before(place.dom_parent, dom, self.insertion_anchor(place));
                dom
            }
        };
        self.allocate(Mounted::new(
            None,
            place.parent,
            MountedKind::Text(MountedText { dom, text }),
        ))
    }

    fn diff_text(&self, id: NodeId, text: String) {
        let changed = self
            .with_node_mut(id, |node| match &mut node.kind {
                MountedKind::Text(t) if t.text != text => {
                    t.text.clone_from(&text);
                    Some(t.dom)
                }
                _ => None,
            })
            .flatten();
        if let Some(dom) = changed {
            self.doc().set_text_data(dom, &text);
        }
    }

    // =========================================================================
    // Fragments
    // =========================================================================

    fn insert_fragment(&self, fragment: Fragment, place: Place) -> Result<NodeId, RenderError> {
        let id = self.allocate(Mounted::new(
            fragment.key,
            place.parent,
            MountedKind::Fragment(MountedFragment::default()),
        ));
        match self.insert_children(fragment.children, place.under(id)) {
            Ok(children) => {
                self.set_children(id, children);
                Ok(id)
            }
            Err(err) => {
                self.registry.borrow_mut().release(id);
                Err(err)
            }
        }
    }

    fn diff_fragment(&self, id: NodeId, fragment: Fragment, place: Place) -> Result<NodeId, RenderError> {
        let prev = self.take_children(id);
        match self.diff_children(prev, fragment.children, place.under(id)) {
            Ok(children) => {
                self.set_children(id, children);
                Ok(id)
            }
            Err(err) => {
                self.registry.borrow_mut().release(id);
                Err(err)
            }
        }
    }

    pub(crate) fn take_children(&self, id: NodeId) -> Vec<NodeId> {
        self.with_node_mut(id, |node| node.children_mut().map(std::mem::take))
            .flatten()
            .unwrap_or_default()
    }

    pub(crate) fn set_children(&self, id: NodeId, children: Vec<NodeId>) {
        self.with_node_mut(id, |node| {
            if let Some(slot) = node.children_mut() {
                *slot = children;
            }
        });
    }

    // =========================================================================
    // Frame placeholders
    // =========================================================================

    fn insert_frame(&self, frame: FramePlaceholder, place: Place) -> NodeId {
        let (start, end) = match self.claim_frame(&frame.id) {
            Some(markers) => markers,
            None => {
                let doc = self.doc();
                let start = doc.create_comment(&region::start_marker(&frame.id));
                let end = doc.create_comment(region::END_MARKER);
                let anchor = self.insertion_anchor(place);
                doc.insert_before(place.dom_parent, start, anchor);
                doc.insert_before(place.dom_parent, end, anchor);
                (start, end)
            }
        };
        self.allocate(Mounted::new(
            frame.key,
            place.parent,
            MountedKind::Frame(MountedFrame {
                id: frame.id,
                start,
                end,
            }),
        ))
    }

    // =========================================================================
    // Components
    // =========================================================================

    fn mount_component(&self, node: ComponentNode, place: Place) -> Result<NodeId, RenderError> {
        let ComponentNode { component, props } = node;
        let handle = ComponentHandle::new(self.weak());
        let id = self.allocate(Mounted::new(
            props.key.clone(),
            place.parent,
            MountedKind::Component(MountedComponent {
                component: component.clone(),
                props: Rc::new(props),
                handle: handle.clone(),
                render: None,
                content: None,
                svg: place.svg,
            }),
        ));
        handle.bind(id);
        handle.wire(UpdateTarget::from(place));

        let render = component.setup(&handle);
        self.with_node_mut(id, |node| {
            if let Some(c) = node.as_component_mut() {
                c.render = Some(Rc::new(RefCell::new(render)));
            }
        });
        self.render_component(id, place)?;
        Ok(id)
    }

    fn diff_component(&self, id: NodeId, node: ComponentNode, place: Place) -> Result<NodeId, RenderError> {
        let handle = self
            .with_node_mut(id, |n| {
                let c = n.as_component_mut()?;
                c.props = Rc::new(node.props);
                c.svg = place.svg;
                Some(c.handle.clone())
            })
            .flatten();
        if let Some(handle) = handle {
            handle.wire(UpdateTarget::from(place));
        }
        self.render_component(id, place)?;
        Ok(id)
    }

    /// Invoke the render function with the current props and diff its output
    /// against the current content.
    pub(crate) fn render_component(&self, id: NodeId, place: Place) -> Result<(), RenderError> {
        let Some((render, props, name)) = self
            .with_node(id, |n| {
                let c = n.as_component()?;
                Some((c.render.clone()?, c.props.clone(), c.component.name().to_string()))
            })
            .flatten()
        else {
            return Ok(());
        };

        let rendered = {
            let mut render = render.borrow_mut();
            (&mut *render)(&*props)
        };
        let Rendered { node, tasks } = match rendered {
            Ok(rendered) => rendered,
            Err(err) => {
                self.remove_now(id);
                return Err(err.in_component(&name));
            }
        };

        let content = self
            .with_node_mut(id, |n| n.as_component_mut().and_then(|c| c.content.take()))
            .flatten();
        match self.diff(content, node, place.under(id)) {
            Ok(content) => {
                self.with_node_mut(id, |n| {
                    if let Some(c) = n.as_component_mut() {
                        c.content = Some(content);
                    }
                });
                self.enqueue_tasks(tasks);
                Ok(())
            }
            Err(err) => {
                self.remove_now(id);
                Err(err)
            }
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove a committed subtree, letting exit animations play.
    pub(crate) fn remove(&self, id: NodeId) {
        self.unmount(id, true);
    }

    /// Remove a committed subtree immediately.
    pub(crate) fn remove_now(&self, id: NodeId) {
        self.unmount(id, false);
    }

    fn unmount(&self, id: NodeId, animate: bool) {
        let Some(kind) = self.kind_of(id) else {
            return;
        };
        match kind {
            NodeKind::Host => self.remove_host(id, animate),
            NodeKind::Text => {
                let node = self.registry.borrow_mut().release(id);
                if let Some(text) = node.as_ref().and_then(Mounted::as_text) {
                    self.doc().remove(text.dom);
                }
            }
            NodeKind::Frame => {
                let node = self.registry.borrow_mut().release(id);
                if let Some(frame) = node.as_ref().and_then(Mounted::as_frame) {
                    self.remove_frame_markers(frame);
                }
            }
            NodeKind::Component => {
                let content = self
                    .with_node_mut(id, |n| n.as_component_mut().and_then(|c| c.content.take()))
                    .flatten();
                if let Some(content) = content {
                    self.unmount(content, animate);
                }
                self.cleanup(id);
            }
            NodeKind::Fragment | NodeKind::Boundary => {
                for child in self.take_children(id) {
                    self.unmount(child, animate);
                }
                self.cleanup(id);
            }
        }
    }

    fn remove_frame_markers(&self, frame: &MountedFrame) {
        let doc = self.doc();
        let mut current = Some(frame.start);
        while let Some(dom) = current {
            current = doc.next_sibling(dom);
            doc.remove(dom);
            if dom == frame.end {
                break;
            }
        }
    }

    /// Release `id` and everything below it without touching the DOM tree.
    ///
    /// Used once the subtree's top-level DOM nodes are already detached.
    pub(crate) fn cleanup(&self, id: NodeId) {
        let Some(node) = self.registry.borrow_mut().release(id) else {
            return;
        };
        match node.kind {
            MountedKind::Text(_) | MountedKind::Frame(_) => {}
            MountedKind::Host(mut host) => {
                for child in std::mem::take(&mut host.children) {
                    self.cleanup(child);
                }
                self.release_host(id, host);
            }
            MountedKind::Component(component) => {
                if let Some(content) = component.content {
                    self.cleanup(content);
                }
                self.enqueue_tasks(component.handle.teardown());
            }
            MountedKind::Fragment(MountedFragment { children })
            | MountedKind::Boundary(MountedBoundary { children, .. }) => {
                for child in children {
                    self.cleanup(child);
                }
            }
        }
    }
}
