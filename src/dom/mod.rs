//! Host document target.
//!
//! The reconciler only needs a structured, mutable node tree: element, text
//! and comment creation, attribute access, child insertion/removal, keyframe
//! animations and a bounding box per element. [`Document`] provides all of
//! that in memory, so reconciliation runs (and is tested) without a browser.
//!
//! # Example
//!
//! ```ignore
//! use spark_vdom::dom::Document;
//!
//! let doc = Document::new();
//! let list = doc.create_element("ul");
//! doc.append_child(doc.body(), list);
//! doc.set_inner_html(list, "<li>a</li><li>b</li>");
//! assert_eq!(doc.children(list).len(), 2);
//! ```

mod animation;
mod document;
mod events;
mod html;

pub use animation::{Animation, PlayState};
pub use document::{Attribute, Document, NodeType, DEFAULT_LINE_HEIGHT, DEFAULT_WIDTH};
pub use events::{Event, ListenerFn, ListenerId};

/// Handle to a live node. Ids are never reused within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomId(pub(crate) u32);

impl DomId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
