//! Reconciler engine - committed tree, diff, mount and unmount.
//!
//! The engine manages the core data structures:
//! - Registry: arena of committed nodes with generational ids and a free pool
//! - Mounted: the committed node shapes and their type guards
//! - Diff: insert / replace / remove and the per-kind diff dispatch
//! - Children: keyed child reconciliation
//! - Host: attribute, property, event, CSS and connect handling for elements
//! - Boundary: error containment
//! - Hydrate: adopting server-rendered DOM on first mount
//!
//! # Architecture
//!
//! All process-scoped state lives in one [`Runtime`], shared as
//! `Rc<Runtime>` by every [`Root`] and every component handle:
//!
//! ```text
//! Runtime
//!   ├─ document     Rc<Document>           live DOM
//!   ├─ registry     RefCell<Registry>      committed nodes (NodeId → Mounted)
//!   ├─ scheduler    RefCell<Scheduler>     pending re-renders + post-commit tasks
//!   ├─ microtasks   RefCell<VecDeque<..>>  event-loop tick
//!   ├─ exiting      RefCell<ExitingRegistry>
//!   ├─ styles       RefCell<StyleCache>
//!   └─ layout       RefCell<LayoutTracker>
//! ```
//!
//! Borrows of these cells are always short. None is held while user code runs
//! (setup, render, connect, listeners, fallbacks, tasks), so user code may
//! call back into the runtime freely.

mod boundary;
mod children;
mod diff;
pub(crate) mod host;
mod hydrate;
pub(crate) mod mounted;
mod options;
mod registry;
mod root;

pub use options::Options;
pub use registry::NodeId;
pub use root::Root;

pub(crate) use hydrate::Hydration;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use mounted::{Mounted, NodeKind};
use registry::Registry;

use crate::dom::{Document, DomId};
use crate::presence::{ExitingRegistry, LayoutTracker};
use crate::scheduler::Scheduler;
use crate::style::{StyleCache, StyleManager, StyleSheet};
use crate::vnode::{Component, Task};

// =============================================================================
// Place
// =============================================================================

/// Where a diff puts new DOM nodes and which committed node owns them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Place {
    pub dom_parent: DomId,
    /// Insert before this node; `None` appends.
    pub anchor: Option<DomId>,
    pub parent: Option<NodeId>,
    /// Elements created here go in the SVG namespace.
    pub svg: bool,
}

impl Place {
    pub fn under(self, parent: NodeId) -> Self {
        Place {
            parent: Some(parent),
            ..self
        }
    }

    pub fn before(self, anchor: Option<DomId>) -> Self {
        Place { anchor, ..self }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Process-scoped reconciler state.
pub struct Runtime {
    document: Rc<Document>,
    options: Options,
    pub(crate) registry: RefCell<Registry>,
    pub(crate) scheduler: RefCell<Scheduler>,
    microtasks: RefCell<VecDeque<Task>>,
    pub(crate) exiting: RefCell<ExitingRegistry>,
    pub(crate) styles: RefCell<StyleCache>,
    pub(crate) layout: RefCell<LayoutTracker>,
    pub(crate) hydration: RefCell<Option<Hydration>>,
    diff_depth: Cell<usize>,
    this: Weak<Runtime>,
}

impl Runtime {
    pub fn new(document: Rc<Document>) -> Rc<Self> {
        Self::with_options(document, Options::default())
    }

    pub fn with_options(document: Rc<Document>, options: Options) -> Rc<Self> {
        document.set_line_height(options.line_height);
        let manager: Rc<dyn StyleManager> = match &options.style_manager {
            Some(manager) => manager.clone(),
            None => Rc::new(StyleSheet::new()),
        };
        Rc::new_cyclic(|this| Runtime {
            document,
            options,
            registry: RefCell::new(Registry::default()),
            scheduler: RefCell::new(Scheduler::default()),
            microtasks: RefCell::new(VecDeque::new()),
            exiting: RefCell::new(ExitingRegistry::default()),
            styles: RefCell::new(StyleCache::new(manager)),
            layout: RefCell::new(LayoutTracker::default()),
            hydration: RefCell::new(None),
            diff_depth: Cell::new(0),
            this: this.clone(),
        })
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub(crate) fn doc(&self) -> &Document {
        &self.document
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn weak(&self) -> Weak<Runtime> {
        self.this.clone()
    }

    /// Create a root that renders into `container`.
    pub fn create_root(self: &Rc<Self>, container: DomId) -> Root {
        crate::invariant!(
            self.doc().is_element(container),
            "root container {container:?} is not an element"
        );
        Root::new(self.clone(), container)
    }

    pub fn style_manager(&self) -> Rc<dyn StyleManager> {
        self.styles.borrow().manager()
    }

    /// Number of live committed nodes.
    pub fn mounted_count(&self) -> usize {
        self.registry.borrow().allocated_count()
    }

    /// Number of elements currently animating out.
    pub fn exiting_count(&self) -> usize {
        self.exiting.borrow().len()
    }

    pub fn is_mounted(&self, id: NodeId) -> bool {
        self.registry.borrow().contains(id)
    }

    // =========================================================================
    // Microtasks
    // =========================================================================

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.microtasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run queued microtasks until none are left.
    pub fn run_microtasks(&self) {
        loop {
            let next = self.microtasks.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
        }
    }

    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.borrow().len()
    }

    // =========================================================================
    // Diff depth
    // =========================================================================

    pub(crate) fn enter_diff(&self) {
        self.diff_depth.set(self.diff_depth.get() + 1);
    }

    pub(crate) fn exit_diff(&self) {
        self.diff_depth.set(self.diff_depth.get().saturating_sub(1));
    }

    pub(crate) fn is_diffing(&self) -> bool {
        self.diff_depth.get() > 0
    }

    // =========================================================================
    // Node access
    // =========================================================================

    pub(crate) fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Mounted) -> R) -> Option<R> {
        self.registry.borrow().get(id).map(f)
    }

    pub(crate) fn with_node_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut Mounted) -> R) -> Option<R> {
        self.registry.borrow_mut().get_mut(id).map(f)
    }

    pub(crate) fn allocate(&self, node: Mounted) -> NodeId {
        self.registry.borrow_mut().allocate(node)
    }

    pub(crate) fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.with_node(id, Mounted::kind)
    }

    pub(crate) fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.with_node(id, |node| node.parent).flatten()
    }

    /// First live DOM node of a committed subtree.
    pub fn first_dom(&self, id: NodeId) -> Option<DomId> {
        mounted::first_dom(&self.registry.borrow(), id)
    }

    pub(crate) fn last_dom(&self, id: NodeId) -> Option<DomId> {
        mounted::last_dom(&self.registry.borrow(), id)
    }

    /// Top-level live DOM nodes of a committed subtree, in order.
    pub fn dom_nodes(&self, id: NodeId) -> Vec<DomId> {
        let mut out = Vec::new();
        mounted::dom_nodes(&self.registry.borrow(), self.doc(), id, &mut out);
        out
    }

    /// First live DOM node of the first sibling in `siblings` that has one.
    pub(crate) fn first_dom_of(&self, siblings: &[NodeId]) -> Option<DomId> {
        let registry = self.registry.borrow();
        siblings.iter().find_map(|&s| mounted::first_dom(&registry, s))
    }

    /// The DOM node that follows `id`'s range, found through the committed
    /// tree when `id` owns no live nodes itself.
    pub(crate) fn anchor_after(&self, id: NodeId) -> Option<DomId> {
        if let Some(last) = self.last_dom(id) {
            return self.doc().next_sibling(last);
        }
        let parent = self.parent_of(id)?;
        let (parent_kind, following) = self.with_node(parent, |p| {
            let following = p
                .children()
                .and_then(|children| {
                    let position = children.iter().position(|&c| c == id)?;
                    Some(children[position + 1..].to_vec())
                })
                .unwrap_or_default();
            (p.kind(), following)
        })?;
        if let Some(anchor) = self.first_dom_of(&following) {
            return Some(anchor);
        }
        match parent_kind {
            NodeKind::Host => None,
            _ => self.anchor_after(parent),
        }
    }

    /// Whether `dom` is an element that is currently animating out.
    pub(crate) fn is_exiting_dom(&self, dom: DomId) -> bool {
        self.exiting.borrow().contains_dom(dom)
    }

    /// Value provided by the nearest ancestor instance of `provider`.
    pub(crate) fn find_context(&self, node: NodeId, provider: &Component) -> Option<Rc<dyn Any>> {
        let mut current = self.parent_of(node);
        while let Some(id) = current {
            let found = self.with_node(id, |n| {
                n.as_component()
                    .filter(|c| c.component == *provider)
                    .and_then(|c| c.handle.provided())
            })?;
            if found.is_some() {
                return found;
            }
            current = self.parent_of(id);
        }
        None
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("mounted", &self.mounted_count())
            .field("exiting", &self.exiting_count())
            .field("microtasks", &self.pending_microtasks())
            .finish()
    }
}

