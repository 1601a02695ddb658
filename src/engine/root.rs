//! Root - entry point for rendering a tree into a container.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_vdom::{Document, Runtime, VNode};
//!
//! let doc = Rc::new(Document::new());
//! let runtime = Runtime::new(doc.clone());
//! let root = runtime.create_root(doc.body());
//!
//! root.render(VNode::element("p").child("hello"))?;
//! runtime.run_microtasks(); // listeners, connect callbacks, enter animations
//!
//! root.render(VNode::element("p").child("world"))?; // text node reused
//! root.unmount();
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::{NodeId, Place, Runtime};
use crate::dom::DomId;
use crate::error::RenderError;
use crate::types::SVG_NS;
use crate::vnode::VNode;

/// A committed tree rendered into one container element.
///
/// Every root created from the same [`Runtime`] shares its scheduler, exiting
/// registry and style cache.
pub struct Root {
    runtime: Rc<Runtime>,
    container: DomId,
    node: Cell<Option<NodeId>>,
}

impl Root {
    pub(crate) fn new(runtime: Rc<Runtime>, container: DomId) -> Self {
        Self {
            runtime,
            container,
            node: Cell::new(None),
        }
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    pub fn container(&self) -> DomId {
        self.container
    }

    /// The committed top node, if anything is rendered.
    pub fn committed(&self) -> Option<NodeId> {
        self.node.get().filter(|&id| self.runtime.is_mounted(id))
    }

    /// Diff `node` against the previous render.
    ///
    /// A render error that no boundary contains unmounts the whole tree and
    /// is returned.
    pub fn render(&self, node: impl Into<VNode>) -> Result<(), RenderError> {
        let runtime = &self.runtime;
        runtime.enter_diff();
        let result = runtime.diff(self.committed(), node.into(), self.place());
        runtime.exit_diff();
        self.commit(result)
    }

    /// First render over server-rendered children of the container.
    ///
    /// Matching nodes are adopted; mismatches are corrected and logged, and
    /// children the render does not produce are removed.
    pub fn hydrate(&self, node: impl Into<VNode>) -> Result<(), RenderError> {
        crate::invariant!(
            self.committed().is_none(),
            "hydrate called on a root that already rendered"
        );
        let runtime = &self.runtime;
        runtime.begin_hydration(self.container);
        runtime.enter_diff();
        let result = runtime.diff(None, node.into(), self.place());
        runtime.exit_diff();
        runtime.end_hydration(self.container);
        self.commit(result)
    }

    /// Remove the committed tree. Exit animations still play.
    pub fn unmount(&self) {
        if let Some(id) = self.node.take() {
            self.runtime.enter_diff();
            self.runtime.remove(id);
            self.runtime.exit_diff();
        }
    }

    fn commit(&self, result: Result<NodeId, RenderError>) -> Result<(), RenderError> {
        match result {
            Ok(id) => {
                self.node.set(Some(id));
                Ok(())
            }
            Err(err) => {
                self.node.set(None);
                log::error!("render failed with no error boundary: {err}");
                Err(err)
            }
        }
    }

    fn place(&self) -> Place {
        let doc = self.runtime.doc();
        crate::invariant!(
            doc.is_element(self.container),
            "root container {:?} is no longer an element",
            self.container
        );
        Place {
            dom_parent: self.container,
            anchor: None,
            parent: None,
            svg: doc.namespace(self.container).as_deref() == Some(SVG_NS),
        }
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("container", &self.container)
            .field("committed", &self.committed())
            .finish()
    }
}
