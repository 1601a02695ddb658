//! Render input: the virtual node description tree.
//!
//! A [`VNode`] is consumed by a diff. The committed counterpart lives in the
//! engine's arena and is addressed by [`NodeId`](crate::engine::NodeId).
//!
//! ```ignore
//! let list = VNode::element("ul").children(items.iter().map(|item| {
//!     VNode::element("li").key(item.id).child(item.label.as_str()).into()
//! }));
//! root.render(list)?;
//! ```

mod abort;
mod component;
mod props;

pub use abort::{AbortController, AbortSignal};
pub use component::{Component, ComponentHandle, RenderFn, Rendered, Task};
pub use props::{handler, ConnectCx, ConnectFn, Events, Props};

use std::fmt;
use std::rc::Rc;

use crate::dom::Event;
use crate::error::RenderError;
use crate::presence::Presence;
use crate::style::Css;
use crate::types::{Key, PropValue};

// =============================================================================
// VNode
// =============================================================================

/// One node of render input.
#[derive(Clone)]
pub enum VNode {
    Text(String),
    Element(Element),
    Component(ComponentNode),
    Fragment(Fragment),
    ErrorBoundary(Boundary),
    /// Opaque externally-managed sub-region.
    Frame(FramePlaceholder),
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    pub fn element(tag: &str) -> Element {
        Element::new(tag)
    }

    pub fn fragment(children: impl IntoIterator<Item = VNode>) -> Self {
        VNode::Fragment(Fragment {
            key: None,
            children: children.into_iter().collect(),
        })
    }

    pub fn component(component: &Component, props: Props) -> Self {
        VNode::Component(ComponentNode {
            component: component.clone(),
            props,
        })
    }

    pub fn boundary(children: impl IntoIterator<Item = VNode>, fallback: impl Into<Fallback>) -> Self {
        VNode::ErrorBoundary(Boundary {
            key: None,
            children: children.into_iter().collect(),
            fallback: fallback.into(),
            on_error: None,
        })
    }

    pub fn frame(id: impl Into<String>) -> Self {
        VNode::Frame(FramePlaceholder {
            key: None,
            id: id.into(),
        })
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Text(_) => None,
            VNode::Element(el) => el.props.key.as_ref(),
            VNode::Component(c) => c.props.key.as_ref(),
            VNode::Fragment(f) => f.key.as_ref(),
            VNode::ErrorBoundary(b) => b.key.as_ref(),
            VNode::Frame(f) => f.key.as_ref(),
        }
    }

    /// Attach a key to any keyable node. Text nodes cannot carry keys.
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        let key = Some(key.into());
        match &mut self {
            VNode::Text(_) => {}
            VNode::Element(el) => el.props.key = key,
            VNode::Component(c) => c.props.key = key,
            VNode::Fragment(f) => f.key = key,
            VNode::ErrorBoundary(b) => b.key = key,
            VNode::Frame(f) => f.key = key,
        }
        self
    }

    /// Short description for logs and invariant messages.
    pub fn describe(&self) -> String {
        match self {
            VNode::Text(_) => "text".to_string(),
            VNode::Element(el) => format!("<{}>", el.tag),
            VNode::Component(c) => format!("component {}", c.component.name()),
            VNode::Fragment(_) => "fragment".to_string(),
            VNode::ErrorBoundary(_) => "error boundary".to_string(),
            VNode::Frame(f) => format!("frame {}", f.id),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Text(text) => write!(f, "Text({text:?})"),
            VNode::Element(el) => el.fmt(f),
            VNode::Component(c) => f
                .debug_struct("Component")
                .field("name", &c.component.name())
                .field("props", &c.props)
                .finish(),
            VNode::Fragment(frag) => f
                .debug_struct("Fragment")
                .field("key", &frag.key)
                .field("children", &frag.children)
                .finish(),
            VNode::ErrorBoundary(b) => f
                .debug_struct("ErrorBoundary")
                .field("key", &b.key)
                .field("children", &b.children)
                .finish(),
            VNode::Frame(frame) => f
                .debug_struct("Frame")
                .field("key", &frame.key)
                .field("id", &frame.id)
                .finish(),
        }
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::Text(text.to_string())
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::Text(text)
    }
}

impl From<Element> for VNode {
    fn from(element: Element) -> Self {
        VNode::Element(element)
    }
}

// =============================================================================
// Element
// =============================================================================

/// Host element description, built fluently.
#[derive(Clone)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) props: Props,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            props: Props::default(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.props.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.props.set(name, value);
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.props.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.props.children.extend(children);
        self
    }

    pub fn on(mut self, name: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.props
            .on
            .get_or_insert_with(Events::default)
            .set(name, Rc::new(handler));
        self
    }

    /// Replace the whole event map.
    pub fn events(mut self, events: Events) -> Self {
        self.props.on = Some(events);
        self
    }

    pub fn css(mut self, css: impl Into<Css>) -> Self {
        self.props.css = Some(css.into());
        self
    }

    pub fn presence(mut self, presence: Presence) -> Self {
        self.props.presence = Some(presence);
        self
    }

    pub fn connect(mut self, connect: impl Fn(&ConnectCx<'_>) + 'static) -> Self {
        self.props.connect = Some(Rc::new(connect));
        self
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("props", &self.props)
            .field("children", &self.props.children)
            .finish()
    }
}

// =============================================================================
// Other node kinds
// =============================================================================

#[derive(Clone)]
pub struct ComponentNode {
    pub(crate) component: Component,
    pub(crate) props: Props,
}

#[derive(Clone)]
pub struct Fragment {
    pub(crate) key: Option<Key>,
    pub(crate) children: Vec<VNode>,
}

/// What an error boundary shows once tripped.
#[derive(Clone)]
pub enum Fallback {
    Node(Box<VNode>),
    Render(Rc<dyn Fn(&RenderError) -> VNode>),
}

impl Fallback {
    pub fn render(f: impl Fn(&RenderError) -> VNode + 'static) -> Self {
        Fallback::Render(Rc::new(f))
    }

    pub(crate) fn resolve(&self, error: &RenderError) -> VNode {
        match self {
            Fallback::Node(node) => (**node).clone(),
            Fallback::Render(f) => f(error),
        }
    }
}

impl From<VNode> for Fallback {
    fn from(node: VNode) -> Self {
        Fallback::Node(Box::new(node))
    }
}

impl From<Element> for Fallback {
    fn from(element: Element) -> Self {
        Fallback::Node(Box::new(element.into()))
    }
}

impl From<&str> for Fallback {
    fn from(text: &str) -> Self {
        Fallback::Node(Box::new(text.into()))
    }
}

/// Error-reporting hook of a boundary.
pub type OnErrorFn = Rc<dyn Fn(&RenderError)>;

#[derive(Clone)]
pub struct Boundary {
    pub(crate) key: Option<Key>,
    pub(crate) children: Vec<VNode>,
    pub(crate) fallback: Fallback,
    pub(crate) on_error: Option<OnErrorFn>,
}

impl VNode {
    /// Attach an error hook to a boundary node. Other nodes are unchanged.
    pub fn on_error(mut self, hook: impl Fn(&RenderError) + 'static) -> Self {
        if let VNode::ErrorBoundary(b) = &mut self {
            b.on_error = Some(Rc::new(hook));
        }
        self
    }
}

#[derive(Clone)]
pub struct FramePlaceholder {
    pub(crate) key: Option<Key>,
    pub(crate) id: String,
}
