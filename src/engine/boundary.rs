//! Error boundaries.
//!
//! A boundary contains render errors from its subtree in two ways:
//!
//! - **In the diff.** When mounting or diffing its children fails, the failed
//!   subtree has already been unmounted (see the cleanup contract in
//!   `diff.rs`), so the boundary only inserts its fallback where its children
//!   were and marks itself tripped.
//! - **Out of band.** [`ComponentHandle::raise`](crate::ComponentHandle::raise)
//!   and failed scheduled re-renders walk the committed parent pointers to the
//!   nearest boundary that has not tripped yet and swap its committed children
//!   for the fallback.
//!
//! A tripped boundary is never diffed again. The next render replaces it with
//! a fresh boundary.

use super::mounted::{Mounted, MountedBoundary, MountedKind};
use super::{NodeId, Place, Runtime};
use crate::error::RenderError;
use crate::vnode::{Boundary, Task};

impl Runtime {
    pub(crate) fn mount_boundary(&self, boundary: Boundary, place: Place) -> Result<NodeId, RenderError> {
        let Boundary {
            key,
            children,
            fallback,
            on_error,
        } = boundary;
        let id = self.allocate(Mounted::new(
            key,
            place.parent,
            MountedKind::Boundary(MountedBoundary {
                children: Vec::new(),
                fallback,
                on_error,
                tripped: false,
                dom_parent: place.dom_parent,
                svg: place.svg,
            }),
        ));
        match self.insert_children(children, place.under(id)) {
            Ok(children) => {
                self.set_children(id, children);
                Ok(id)
            }
            Err(err) => self.trip(id, err, place),
        }
    }

    pub(crate) fn diff_boundary(&self, id: NodeId, boundary: Boundary, place: Place) -> Result<NodeId, RenderError> {
        let Boundary {
            children,
            fallback,
            on_error,
            ..
        } = boundary;
        self.with_node_mut(id, |n| {
            if let Some(b) = n.as_boundary_mut() {
                b.fallback = fallback;
                b.on_error = on_error;
                b.dom_parent = place.dom_parent;
                b.svg = place.svg;
            }
        });
        let fallback_place = self.fallback_place(id, place);
        let prev = self.take_children(id);
        match self.diff_children(prev, children, place.under(id)) {
            Ok(children) => {
                self.set_children(id, children);
                Ok(id)
            }
            Err(err) => self.trip(id, err, fallback_place),
        }
    }

    /// Where the fallback goes if the diff fails.
    ///
    /// A keyed parent anchors a matched child at its own first node, which the
    /// failed diff detaches. In that case the fallback is anchored at the node
    /// following the boundary's range instead.
    fn fallback_place(&self, id: NodeId, place: Place) -> Place {
        let Some(anchor) = place.anchor else {
            return place;
        };
        let own = self.dom_nodes(id);
        if !own.contains(&anchor) {
            return place;
        }
        let after = own.last().and_then(|&last| self.doc().next_sibling(last));
        place.before(after)
    }

    /// Show the fallback for a boundary whose children are already gone.
    fn trip(&self, id: NodeId, err: RenderError, place: Place) -> Result<NodeId, RenderError> {
        log::error!("error boundary caught: {err}");
        let Some((fallback, on_error)) = self
            .with_node(id, |n| n.as_boundary().map(|b| (b.fallback.clone(), b.on_error.clone())))
            .flatten()
        else {
            return Err(err);
        };
        if let Some(hook) = on_error {
            hook(&err);
        }
        match self.insert(fallback.resolve(&err), place.under(id)) {
            Ok(child) => {
                self.with_node_mut(id, |n| {
                    if let Some(b) = n.as_boundary_mut() {
                        b.children = vec![child];
                        b.tripped = true;
                    }
                });
                Ok(id)
            }
            Err(fallback_err) => {
                self.registry.borrow_mut().release(id);
                Err(fallback_err)
            }
        }
    }

    // =========================================================================
    // Out-of-band errors
    // =========================================================================

    /// Route an error raised by the committed component `node`.
    ///
    /// Inside a diff the routing waits for the next post-commit task run, so
    /// the tree being diffed is never mutated underneath the diff.
    pub(crate) fn raise_from(&self, node: NodeId, err: RenderError) {
        let start = self.parent_of(node);
        if self.is_diffing() {
            let weak = self.weak();
            self.enqueue_tasks([Box::new(move || {
                if let Some(runtime) = weak.upgrade() {
                    runtime.route_error(start, err);
                }
            }) as Task]);
            return;
        }
        self.route_error(start, err);
    }

    /// Trip the nearest untripped boundary at or above `start`. Without one the
    /// error is logged and dropped.
    pub(crate) fn route_error(&self, start: Option<NodeId>, err: RenderError) {
        let mut current = start;
        while let Some(id) = current {
            let untripped = self
                .with_node(id, |n| n.as_boundary().map(|b| !b.tripped))
                .flatten()
                .unwrap_or(false);
            if untripped {
                self.trip_committed(id, err);
                return;
            }
            current = self.parent_of(id);
        }
        log::error!("unhandled render error: {err}");
    }

    /// Replace a committed boundary's children with its fallback.
    fn trip_committed(&self, id: NodeId, err: RenderError) {
        let Some((dom_parent, svg, fallback, on_error)) = self
            .with_node(id, |n| {
                n.as_boundary()
                    .map(|b| (b.dom_parent, b.svg, b.fallback.clone(), b.on_error.clone()))
            })
            .flatten()
        else {
            return;
        };
        log::error!("error boundary caught: {err}");
        if let Some(hook) = on_error {
            hook(&err);
        }

        let anchor = self.first_dom(id).or_else(|| self.anchor_after(id));
        let place = Place {
            dom_parent,
            anchor,
            parent: Some(id),
            svg,
        };
        self.enter_diff();
        let previous = self.take_children(id);
        let inserted = self.insert(fallback.resolve(&err), place);
        for child in previous {
            self.remove(child);
        }
        match inserted {
            Ok(child) => self.with_node_mut(id, |n| {
                if let Some(b) = n.as_boundary_mut() {
                    b.children = vec![child];
                    b.tripped = true;
                }
            }),
            Err(fallback_err) => {
                log::error!("error boundary fallback failed: {fallback_err}");
                self.with_node_mut(id, |n| {
                    if let Some(b) = n.as_boundary_mut() {
                        b.tripped = true;
                    }
                })
            }
        };
        self.exit_diff();
    }
}
