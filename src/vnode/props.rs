//! Element and component props.
//!
//! A [`Props`] is an ordered attribute bag plus the reserved keys the
//! reconciler interprets itself: `children`, `key`, `on`, `css`, `presence`
//! and `connect`. Attribute order is preserved so patches are deterministic.

use std::fmt;
use std::rc::Rc;

use super::abort::AbortSignal;
use super::VNode;
use crate::dom::{Document, DomId, Event, ListenerFn};
use crate::presence::Presence;
use crate::style::Css;
use crate::types::{Key, PropValue};

// =============================================================================
// Events
// =============================================================================

/// Event map: event name to handler.
#[derive(Clone, Default)]
pub struct Events(Vec<(String, ListenerFn)>);

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for `name`, replacing any previous one.
    pub fn set(&mut self, name: &str, handler: ListenerFn) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = handler,
            None => self.0.push((name.to_string(), handler)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ListenerFn> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ListenerFn)> {
        self.0.iter().map(|(n, h)| (n.as_str(), h))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Events {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// =============================================================================
// Connect
// =============================================================================

/// What a connect callback receives once its element is live.
pub struct ConnectCx<'a> {
    pub document: &'a Document,
    pub element: DomId,
    /// Aborted when the element is removed or stops requesting `connect`.
    pub signal: AbortSignal,
}

/// Post-commit callback invoked with the live element.
pub type ConnectFn = Rc<dyn Fn(&ConnectCx<'_>)>;

// =============================================================================
// Props
// =============================================================================

#[derive(Clone, Default)]
pub struct Props {
    attrs: Vec<(String, PropValue)>,
    pub(crate) children: Vec<VNode>,
    pub(crate) key: Option<Key>,
    pub(crate) on: Option<Events>,
    pub(crate) css: Option<Css>,
    pub(crate) presence: Option<Presence>,
    pub(crate) connect: Option<ConnectFn>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Props::set`].
    pub fn with(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set an attribute or property, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<PropValue>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropValue> {
        let index = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(index).1)
    }

    /// Attributes in insertion order. Reserved keys are not included.
    pub fn attrs(&self) -> &[(String, PropValue)] {
        &self.attrs
    }

    pub fn children(&self) -> &[VNode] {
        &self.children
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn events(&self) -> Option<&Events> {
        self.on.as_ref()
    }

    pub fn css(&self) -> Option<&Css> {
        self.css.as_ref()
    }

    pub fn presence(&self) -> Option<&Presence> {
        self.presence.as_ref()
    }

    pub fn has_connect(&self) -> bool {
        self.connect.is_some()
    }

    /// Convenience for string-valued props.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropValue::as_str)
    }

    pub(crate) fn take_children(&mut self) -> Vec<VNode> {
        std::mem::take(&mut self.children)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("key", &self.key)
            .field("attrs", &self.attrs)
            .field("children", &self.children.len())
            .field("on", &self.on)
            .field("css", &self.css)
            .field("presence", &self.presence)
            .field("connect", &self.connect.is_some())
            .finish()
    }
}

/// Wrap a plain closure as an event handler.
pub fn handler(f: impl Fn(&Event) + 'static) -> ListenerFn {
    Rc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut props = Props::new().with("a", 1.0).with("b", "x");
        props.set("a", 2.0);
        let names: Vec<&str> = props.attrs().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(props.get("a"), Some(&PropValue::Num(2.0)));
        assert_eq!(props.str("b"), Some("x"));
    }

    #[test]
    fn test_events_set_and_get() {
        let mut events = Events::new();
        events.set("click", handler(|_| {}));
        events.set("input", handler(|_| {}));
        events.set("click", handler(|_| {}));
        assert_eq!(events.len(), 2);
        assert!(events.get("input").is_some());
        assert!(events.get("focus").is_none());
    }
}
