//! # spark-vdom
//!
//! Virtual-tree reconciler for structured documents.
//!
//! A render produces a [`VNode`] tree; the engine diffs it against the
//! committed tree and applies the minimal set of mutations to a live
//! [`Document`]. Component re-renders are batched per microtask, keyed
//! children keep their DOM identity across reorders, and host elements can
//! animate in, out and across layout changes.
//!
//! ## Architecture
//!
//! ```text
//! Root::render(vnode)
//!     │
//!     ▼
//! engine::diff ──► children (keyed) ──► host / component / fragment / boundary
//!     │                                        │
//!     │                         tasks, re-render requests
//!     ▼                                        ▼
//! Document mutations               scheduler ──(microtask)──► flush
//!                                      │
//!                   layout snapshot → re-render → FLIP → tasks
//! ```
//!
//! [`region`] is a separate entry point that patches live DOM against parsed
//! HTML without a virtual tree.
//!
//! ## Modules
//!
//! - [`types`] - Shared value types (Key, PropValue, Rect, Keyframe)
//! - [`dom`] - In-memory host document, animations, events, HTML
//! - [`vnode`] - Render input: VNode, Props, Component, handles
//! - [`engine`] - Runtime, committed arena, diff, hydration, roots
//! - [`scheduler`] - Batched re-renders and post-commit tasks
//! - [`presence`] - Enter/exit/reclaim and FLIP layout animations
//! - [`style`] - CSS descriptors and the style manager boundary
//! - [`region`] - Region DOM diff over live nodes

pub mod dom;
pub mod engine;
pub mod error;
pub mod presence;
pub mod region;
pub mod scheduler;
pub mod style;
pub mod types;
pub mod vnode;

// Re-export commonly used items
pub use types::*;

pub use dom::{Animation, Attribute, Document, DomId, Event, ListenerFn, ListenerId, NodeType, PlayState};

pub use engine::{NodeId, Options, Root, Runtime};

pub use error::RenderError;

pub use presence::{Presence, Transition, TransitionSetting};

pub use region::{diff_node, diff_nodes, patch_children, patch_node, patch_range};

pub use style::{Css, StyleManager, StyleSheet};

pub use vnode::{
    handler, AbortController, AbortSignal, Boundary, Component, ComponentHandle, ComponentNode,
    ConnectCx, ConnectFn, Element, Events, Fallback, Fragment, FramePlaceholder, OnErrorFn, Props,
    RenderFn, Rendered, Task, VNode,
};
