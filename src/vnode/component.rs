//! Components and their handles.
//!
//! A component is a named setup function. Setup runs once per mounted
//! instance, receives that instance's [`ComponentHandle`], and returns the
//! render function that is re-invoked with the current props on every diff
//! and every self-update.
//!
//! ```ignore
//! let counter = Component::new("Counter", |handle| {
//!     let count = Rc::new(Cell::new(0));
//!     let handle = handle.clone();
//!     move |props: &Props| {
//!         let label = format!("{}: {}", props.str("label").unwrap_or(""), count.get());
//!         Ok(VNode::element("span").child(label).into())
//!     }
//! });
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::abort::{AbortController, AbortSignal};
use super::props::Props;
use super::VNode;
use crate::engine::{NodeId, Runtime};
use crate::error::RenderError;
use crate::scheduler::UpdateTarget;

/// Post-commit work.
pub type Task = Box<dyn FnOnce()>;

/// Render function returned by a component's setup.
pub type RenderFn = Box<dyn FnMut(&Props) -> Result<Rendered, RenderError>>;

type SetupFn = dyn Fn(&ComponentHandle) -> RenderFn;

// =============================================================================
// Rendered
// =============================================================================

/// Output of one render: a single child plus post-commit tasks.
pub struct Rendered {
    pub node: VNode,
    pub tasks: Vec<Task>,
}

impl Rendered {
    pub fn new(node: impl Into<VNode>) -> Self {
        Self {
            node: node.into(),
            tasks: Vec::new(),
        }
    }

    /// Queue `task` to run after this render is committed.
    pub fn with_task(mut self, task: impl FnOnce() + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }
}

impl From<VNode> for Rendered {
    fn from(node: VNode) -> Self {
        Rendered::new(node)
    }
}

impl From<super::Element> for Rendered {
    fn from(element: super::Element) -> Self {
        Rendered::new(element)
    }
}

// =============================================================================
// Component
// =============================================================================

struct ComponentDef {
    name: String,
    setup: Box<SetupFn>,
}

/// A component definition. Cheap to clone; identity is by definition, so two
/// clones of the same `Component` are the same type for reconciliation.
#[derive(Clone)]
pub struct Component(Rc<ComponentDef>);

impl Component {
    pub fn new<S, R>(name: &str, setup: S) -> Self
    where
        S: Fn(&ComponentHandle) -> R + 'static,
        R: FnMut(&Props) -> Result<Rendered, RenderError> + 'static,
    {
        Self(Rc::new(ComponentDef {
            name: name.to_string(),
            setup: Box::new(move |handle: &ComponentHandle| -> RenderFn { Box::new(setup(handle)) }),
        }))
    }

    /// A stateless component: the render function is `render` itself.
    pub fn stateless<R>(name: &str, render: R) -> Self
    where
        R: Fn(&Props) -> Result<Rendered, RenderError> + 'static,
    {
        let render = Rc::new(render);
        Self::new(name, move |_: &ComponentHandle| {
            let render = render.clone();
            move |props: &Props| render(props)
        })
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub(crate) fn setup(&self, handle: &ComponentHandle) -> RenderFn {
        (self.0.setup)(handle)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.0.name)
    }
}

// =============================================================================
// ComponentHandle
// =============================================================================

struct HandleState {
    runtime: Weak<Runtime>,
    node: Cell<Option<NodeId>>,
    target: Cell<Option<UpdateTarget>>,
    abort: AbortController,
    provided: RefCell<Option<Rc<dyn Any>>>,
    unmount: RefCell<Vec<Task>>,
}

/// Per-instance capabilities handed to a component's setup.
///
/// A handle may be kept past its instance. Once the instance is removed,
/// `update` and `queue_task` are no-ops and the abort signal has fired.
#[derive(Clone)]
pub struct ComponentHandle(Rc<HandleState>);

impl ComponentHandle {
    pub(crate) fn new(runtime: Weak<Runtime>) -> Self {
        Self(Rc::new(HandleState {
            runtime,
            node: Cell::new(None),
            target: Cell::new(None),
            abort: AbortController::new(),
            provided: RefCell::new(None),
            unmount: RefCell::new(Vec::new()),
        }))
    }

    /// Request a re-render of this instance in the next flush.
    pub fn update(&self) {
        let (Some(runtime), Some(node), Some(target)) = (
            self.0.runtime.upgrade(),
            self.0.node.get(),
            self.0.target.get(),
        ) else {
            return;
        };
        runtime.enqueue(node, target);
    }

    /// Run `task` after the next commit.
    pub fn queue_task(&self, task: impl FnOnce() + 'static) {
        if self.0.node.get().is_none() {
            return;
        }
        if let Some(runtime) = self.0.runtime.upgrade() {
            runtime.enqueue_tasks([Box::new(task) as Task]);
        }
    }

    /// Aborted when this instance is removed.
    pub fn signal(&self) -> AbortSignal {
        self.0.abort.signal()
    }

    /// Make `value` visible to descendants through [`ComponentHandle::context`].
    pub fn provide<T: 'static>(&self, value: T) {
        *self.0.provided.borrow_mut() = Some(Rc::new(value));
    }

    /// Nearest ancestor instance of `provider` that provided a `T`.
    pub fn context<T: 'static>(&self, provider: &Component) -> Option<Rc<T>> {
        let runtime = self.0.runtime.upgrade()?;
        let node = self.0.node.get()?;
        let value = runtime.find_context(node, provider)?;
        Rc::downcast::<T>(value).ok()
    }

    /// Report an error outside of rendering (event handler, timer, task).
    ///
    /// Routed to the nearest committed error boundary above this instance.
    pub fn raise(&self, error: RenderError) {
        let (Some(runtime), Some(node)) = (self.0.runtime.upgrade(), self.0.node.get()) else {
            log::error!("error raised by an unmounted component: {error}");
            return;
        };
        runtime.raise_from(node, error);
    }

    /// Run `callback` (as a post-commit task) when this instance is removed.
    pub fn on_unmount(&self, callback: impl FnOnce() + 'static) {
        self.0.unmount.borrow_mut().push(Box::new(callback));
    }

    pub fn is_mounted(&self) -> bool {
        self.0.node.get().is_some()
    }

    pub(crate) fn bind(&self, node: NodeId) {
        self.0.node.set(Some(node));
    }

    /// Point self-updates at the instance's current DOM position.
    pub(crate) fn wire(&self, target: UpdateTarget) {
        self.0.target.set(Some(target));
    }

    pub(crate) fn provided(&self) -> Option<Rc<dyn Any>> {
        self.0.provided.borrow().clone()
    }

    /// Detach from the tree and hand back the unmount callbacks.
    pub(crate) fn teardown(&self) -> Vec<Task> {
        self.0.node.set(None);
        self.0.target.set(None);
        self.0.abort.abort();
        std::mem::take(&mut *self.0.unmount.borrow_mut())
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("node", &self.0.node.get())
            .field("aborted", &self.0.abort.is_aborted())
            .finish()
    }
}
