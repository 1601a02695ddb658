//! Headless document - the live tree the reconciler mutates.
//!
//! Nodes live in an append-only arena and are addressed by [`DomId`]. Ids are
//! never reused, so a stale id always refers to the same (possibly detached)
//! node, just like a retained DOM reference.
//!
//! Every method takes `&self`. Borrows of the node store are released before
//! any user callback (event listener, animation finish callback) runs, so
//! callbacks are free to mutate the document again.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use super::animation::Animation;
use super::events::{Event, Listener, ListenerFn, ListenerId};
use super::DomId;
use crate::invariant;
use crate::types::{Keyframe, KeyframeOptions, PropValue, Rect, SVG_NS};

/// Default flow-layout line height, in pixels.
pub const DEFAULT_LINE_HEIGHT: f64 = 20.0;

/// Default flow-layout element width, in pixels.
pub const DEFAULT_WIDTH: f64 = 100.0;

// =============================================================================
// Node Storage
// =============================================================================

/// Kind of a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
}

/// One attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug)]
struct ElementData {
    tag: String,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    properties: FxHashMap<String, PropValue>,
    rect: Option<Rect>,
}

#[derive(Debug)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct NodeData {
    parent: Option<DomId>,
    children: Vec<DomId>,
    kind: NodeKind,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct FocusState {
    active: Option<DomId>,
    selection: Option<(u32, u32)>,
}

// =============================================================================
// Live Properties
// =============================================================================

/// How a live property is stored on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropertyKind {
    /// Writes through to the named attribute.
    Reflected(&'static str),
    /// Boolean property reflected as attribute presence.
    ReflectedBool(&'static str),
    /// Lives only on the node (`value`, `checked`, ...).
    Live,
}

fn property_kind(tag: &str, name: &str) -> Option<PropertyKind> {
    use PropertyKind::*;

    let global = match name {
        "id" => Some(Reflected("id")),
        "title" => Some(Reflected("title")),
        "lang" => Some(Reflected("lang")),
        "dir" => Some(Reflected("dir")),
        "hidden" => Some(ReflectedBool("hidden")),
        "tabIndex" => Some(Reflected("tabindex")),
        "role" => Some(Reflected("role")),
        "popover" => Some(Reflected("popover")),
        _ => None,
    };
    if global.is_some() {
        return global;
    }

    match (tag, name) {
        ("input" | "textarea" | "select" | "option" | "button" | "output", "value") => Some(Live),
        ("input", "checked" | "indeterminate") => Some(Live),
        ("option", "selected") => Some(Live),
        ("input" | "textarea" | "select" | "button" | "fieldset" | "option", "disabled") => {
            Some(ReflectedBool("disabled"))
        }
        ("input" | "textarea" | "select" | "button", "name") => Some(Reflected("name")),
        ("input" | "button", "type") => Some(Reflected("type")),
        ("input" | "textarea", "placeholder") => Some(Reflected("placeholder")),
        ("input", "list") => Some(Reflected("list")),
        ("input" | "textarea" | "select" | "button", "form") => Some(Reflected("form")),
        ("img" | "canvas" | "video" | "iframe" | "input", "width") => Some(Reflected("width")),
        ("img" | "canvas" | "video" | "iframe" | "input", "height") => Some(Reflected("height")),
        ("a" | "link" | "area" | "base", "href") => Some(Reflected("href")),
        ("a" | "area", "download") => Some(Reflected("download")),
        ("td" | "th", "rowSpan") => Some(Reflected("rowspan")),
        ("td" | "th", "colSpan") => Some(Reflected("colspan")),
        _ => None,
    }
}

// =============================================================================
// Document
// =============================================================================

/// An in-memory structured document.
pub struct Document {
    nodes: RefCell<Vec<NodeData>>,
    root: DomId,
    body: DomId,
    listeners: RefCell<FxHashMap<DomId, Vec<Listener>>>,
    next_listener: Cell<u64>,
    animations: RefCell<Vec<Animation>>,
    next_animation: Cell<u64>,
    focus: Cell<FocusState>,
    line_height: Cell<f64>,
    mutations: Cell<usize>,
    created: Cell<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with `<html><body></body></html>`.
    pub fn new() -> Self {
        let doc = Self {
            nodes: RefCell::new(vec![NodeData {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }]),
            root: DomId(0),
            body: DomId(0),
            listeners: RefCell::new(FxHashMap::default()),
            next_listener: Cell::new(0),
            animations: RefCell::new(Vec::new()),
            next_animation: Cell::new(0),
            focus: Cell::new(FocusState::default()),
            line_height: Cell::new(DEFAULT_LINE_HEIGHT),
            mutations: Cell::new(0),
            created: Cell::new(0),
        };
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.append_child(doc.root, html);
        doc.append_child(html, body);
        Self { body, ..doc }.reset_counters()
    }

    fn reset_counters(self) -> Self {
        self.mutations.set(0);
        self.created.set(0);
        self
    }

    /// The document node itself.
    pub fn root(&self) -> DomId {
        self.root
    }

    pub fn body(&self) -> DomId {
        self.body
    }

    pub fn set_line_height(&self, height: f64) {
        self.line_height.set(height);
    }

    // -------------------------------------------------------------------------
    // Instrumentation
    // -------------------------------------------------------------------------

    /// Number of mutations (structure, attributes, properties, text) so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.get()
    }

    /// Number of nodes created so far.
    pub fn created_count(&self) -> usize {
        self.created.get()
    }

    fn mutated(&self) {
        self.mutations.set(self.mutations.get() + 1);
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    fn push(&self, kind: NodeKind) -> DomId {
        let mut nodes = self.nodes.borrow_mut();
        let id = DomId(nodes.len() as u32);
        nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        self.created.set(self.created.get() + 1);
        id
    }

    pub fn create_element(&self, tag: &str) -> DomId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            namespace: None,
            attributes: Vec::new(),
            properties: FxHashMap::default(),
            rect: None,
        }))
    }

    pub fn create_element_ns(&self, namespace: &str, tag: &str) -> DomId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            namespace: Some(namespace.to_string()),
            attributes: Vec::new(),
            properties: FxHashMap::default(),
            rect: None,
        }))
    }

    pub fn create_text(&self, text: &str) -> DomId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&self, data: &str) -> DomId {
        self.push(NodeKind::Comment(data.to_string()))
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn node_type(&self, id: DomId) -> NodeType {
        match self.nodes.borrow()[id.index()].kind {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
        }
    }

    pub fn is_element(&self, id: DomId) -> bool {
        self.node_type(id) == NodeType::Element
    }

    pub fn is_text(&self, id: DomId) -> bool {
        self.node_type(id) == NodeType::Text
    }

    pub fn is_comment(&self, id: DomId) -> bool {
        self.node_type(id) == NodeType::Comment
    }

    /// Tag name of an element.
    pub fn tag(&self, id: DomId) -> Option<String> {
        match &self.nodes.borrow()[id.index()].kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            _ => None,
        }
    }

    pub fn namespace(&self, id: DomId) -> Option<String> {
        match &self.nodes.borrow()[id.index()].kind {
            NodeKind::Element(el) => el.namespace.clone(),
            _ => None,
        }
    }

    pub fn parent(&self, id: DomId) -> Option<DomId> {
        self.nodes.borrow()[id.index()].parent
    }

    pub fn children(&self, id: DomId) -> Vec<DomId> {
        self.nodes.borrow()[id.index()].children.clone()
    }

    pub fn first_child(&self, id: DomId) -> Option<DomId> {
        self.nodes.borrow()[id.index()].children.first().copied()
    }

    pub fn last_child(&self, id: DomId) -> Option<DomId> {
        self.nodes.borrow()[id.index()].children.last().copied()
    }

    fn sibling(&self, id: DomId, offset: isize) -> Option<DomId> {
        let nodes = self.nodes.borrow();
        let parent = nodes[id.index()].parent?;
        let siblings = &nodes[parent.index()].children;
        let pos = siblings.iter().position(|&c| c == id)? as isize + offset;
        if pos < 0 {
            return None;
        }
        siblings.get(pos as usize).copied()
    }

    pub fn next_sibling(&self, id: DomId) -> Option<DomId> {
        self.sibling(id, 1)
    }

    pub fn prev_sibling(&self, id: DomId) -> Option<DomId> {
        self.sibling(id, -1)
    }

    /// True if `ancestor` is `node` or contains it.
    pub fn contains(&self, ancestor: DomId, node: DomId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes[id.index()].parent;
        }
        false
    }

    /// True if the node is attached to the document root.
    pub fn is_connected(&self, id: DomId) -> bool {
        self.contains(self.root, id)
    }

    /// Text of a text node or data of a comment.
    pub fn text_data(&self, id: DomId) -> Option<String> {
        match &self.nodes.borrow()[id.index()].kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => Some(t.clone()),
            _ => None,
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: DomId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: DomId, out: &mut String) {
        match self.node_type(id) {
            NodeType::Text => out.push_str(&self.text_data(id).unwrap_or_default()),
            NodeType::Comment => {}
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Tree Mutation
    // -------------------------------------------------------------------------

    /// Insert `node` into `parent` before `anchor` (append when `None`).
    ///
    /// Moves the node if it is already attached somewhere.
    pub fn insert_before(&self, parent: DomId, node: DomId, anchor: Option<DomId>) {
        if anchor == Some(node) {
            return;
        }
        if let Some(anchor) = anchor {
            invariant!(
                self.parent(anchor) == Some(parent),
                "insert_before anchor {anchor:?} is not a child of {parent:?}"
            );
        }
        invariant!(
            !self.contains(node, parent),
            "cannot insert {node:?} into its own subtree"
        );

        self.blur_if_within(node);
        self.detach(node);

        let mut nodes = self.nodes.borrow_mut();
        let pos = match anchor {
            Some(anchor) => nodes[parent.index()]
                .children
                .iter()
                .position(|&c| c == anchor)
                .unwrap_or(nodes[parent.index()].children.len()),
            None => nodes[parent.index()].children.len(),
        };
        nodes[parent.index()].children.insert(pos, node);
        nodes[node.index()].parent = Some(parent);
        drop(nodes);
        self.mutated();
    }

    pub fn append_child(&self, parent: DomId, node: DomId) {
        self.insert_before(parent, node, None);
    }

    /// Replace `old` with `new` in `old`'s parent.
    pub fn replace_with(&self, old: DomId, new: DomId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        self.insert_before(parent, new, Some(old));
        self.remove(old);
    }

    /// Detach a node from its parent. No-op when already detached.
    pub fn remove(&self, node: DomId) {
        if self.parent(node).is_none() {
            return;
        }
        self.blur_if_within(node);
        self.detach(node);
        self.mutated();
    }

    fn detach(&self, node: DomId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.index()].parent.take() {
            nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    /// Remove all children of `parent`.
    pub fn clear_children(&self, parent: DomId) {
        for child in self.children(parent) {
            self.remove(child);
        }
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    /// Set the text of a text node or the data of a comment.
    pub fn set_text_data(&self, id: DomId, data: &str) {
        let mut nodes = self.nodes.borrow_mut();
        match &mut nodes[id.index()].kind {
            NodeKind::Text(t) | NodeKind::Comment(t) => {
                t.clear();
                t.push_str(data);
            }
            _ => invariant!(false, "set_text_data on non-character node {id:?}"),
        }
        drop(nodes);
        self.mutated();
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    fn with_element<R>(&self, id: DomId, f: impl FnOnce(&ElementData) -> R) -> R {
        match &self.nodes.borrow()[id.index()].kind {
            NodeKind::Element(el) => f(el),
            _ => crate::invariant_failed!("{id:?} is not an element"),
        }
    }

    fn with_element_mut<R>(&self, id: DomId, f: impl FnOnce(&mut ElementData) -> R) -> R {
        match &mut self.nodes.borrow_mut()[id.index()].kind {
            NodeKind::Element(el) => f(el),
            _ => crate::invariant_failed!("{id:?} is not an element"),
        }
    }

    fn attribute_name(&self, id: DomId, name: &str) -> String {
        if self.namespace(id).is_none() {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }

    pub fn attribute(&self, id: DomId, name: &str) -> Option<String> {
        let name = self.attribute_name(id, name);
        self.with_element(id, |el| {
            el.attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone())
        })
    }

    pub fn has_attribute(&self, id: DomId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// All attributes, in insertion order.
    pub fn attributes(&self, id: DomId) -> Vec<Attribute> {
        self.with_element(id, |el| el.attributes.clone())
    }

    pub fn set_attribute(&self, id: DomId, name: &str, value: &str) {
        self.set_attribute_inner(id, None, name, value);
    }

    pub fn set_attribute_ns(&self, id: DomId, namespace: &str, name: &str, value: &str) {
        self.set_attribute_inner(id, Some(namespace), name, value);
    }

    fn set_attribute_inner(&self, id: DomId, namespace: Option<&str>, name: &str, value: &str) {
        let name = self.attribute_name(id, name);
        self.with_element_mut(id, |el| {
            match el.attributes.iter_mut().find(|a| a.name == name) {
                Some(attr) => {
                    attr.value = value.to_string();
                    attr.namespace = namespace.map(str::to_string);
                }
                None => el.attributes.push(Attribute {
                    namespace: namespace.map(str::to_string),
                    name,
                    value: value.to_string(),
                }),
            }
        });
        self.mutated();
    }

    pub fn remove_attribute(&self, id: DomId, name: &str) {
        let name = self.attribute_name(id, name);
        let removed = self.with_element_mut(id, |el| {
            let before = el.attributes.len();
            el.attributes.retain(|a| a.name != name);
            before != el.attributes.len()
        });
        if removed {
            self.mutated();
        }
    }

    // -------------------------------------------------------------------------
    // Live Properties
    // -------------------------------------------------------------------------

    fn property_kind_of(&self, id: DomId, name: &str) -> Option<PropertyKind> {
        self.with_element(id, |el| match el.namespace.as_deref() {
            Some(SVG_NS) => None,
            _ => property_kind(&el.tag, name),
        })
    }

    /// True if `name` exists as a live property on this element.
    pub fn has_property(&self, id: DomId, name: &str) -> bool {
        self.is_element(id) && self.property_kind_of(id, name).is_some()
    }

    /// Read a live property. `None` when the property does not exist.
    pub fn property(&self, id: DomId, name: &str) -> Option<PropValue> {
        match self.property_kind_of(id, name)? {
            PropertyKind::Reflected(attr) => {
                Some(PropValue::Str(self.attribute(id, attr).unwrap_or_default()))
            }
            PropertyKind::ReflectedBool(attr) => Some(PropValue::Bool(self.has_attribute(id, attr))),
            PropertyKind::Live => Some(
                self.with_element(id, |el| el.properties.get(name).cloned())
                    .unwrap_or_else(|| match name {
                        "checked" | "selected" | "indeterminate" => PropValue::Bool(false),
                        _ => PropValue::Str(String::new()),
                    }),
            ),
        }
    }

    /// Assign a live property. Reflected properties write their attribute.
    pub fn set_property(&self, id: DomId, name: &str, value: PropValue) {
        let Some(kind) = self.property_kind_of(id, name) else {
            crate::invariant_failed!("{id:?} has no live property `{name}`");
        };
        match kind {
            PropertyKind::Reflected(attr) => match value.to_attribute() {
                Some(v) => self.set_attribute(id, attr, &v),
                None => self.remove_attribute(id, attr),
            },
            PropertyKind::ReflectedBool(attr) => {
                if value.as_bool().unwrap_or(value.to_attribute().is_some()) {
                    self.set_attribute(id, attr, "");
                } else {
                    self.remove_attribute(id, attr);
                }
            }
            PropertyKind::Live => {
                self.with_element_mut(id, |el| {
                    el.properties.insert(name.to_string(), value);
                });
                self.mutated();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    /// Pin an element's bounding box, overriding flow layout.
    pub fn set_rect(&self, id: DomId, rect: Option<Rect>) {
        self.with_element_mut(id, |el| el.rect = rect);
    }

    /// Bounding box of an element.
    ///
    /// Without a pinned rect every connected element occupies one line, in
    /// document order. Detached elements report an empty rect.
    pub fn bounding_rect(&self, id: DomId) -> Rect {
        if let Some(rect) = self.with_element(id, |el| el.rect) {
            return rect;
        }
        if !self.is_connected(id) {
            return Rect::default();
        }
        let line = self.line_height.get();
        let mut index = 0usize;
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if current == id {
                break;
            }
            if self.is_element(current) {
                index += 1;
            }
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        Rect::new(0.0, index as f64 * line, DEFAULT_WIDTH, line)
    }

    // -------------------------------------------------------------------------
    // Focus / Selection
    // -------------------------------------------------------------------------

    pub fn focus(&self, id: DomId) {
        self.focus.set(FocusState {
            active: Some(id),
            selection: None,
        });
    }

    pub fn blur(&self) {
        self.focus.set(FocusState::default());
    }

    pub fn active_element(&self) -> Option<DomId> {
        self.focus.get().active
    }

    /// Set the text selection of the focused element.
    pub fn set_selection(&self, id: DomId, start: u32, end: u32) {
        self.focus.set(FocusState {
            active: Some(id),
            selection: Some((start, end)),
        });
    }

    pub fn selection(&self) -> Option<(u32, u32)> {
        self.focus.get().selection
    }

    /// Moving or detaching a subtree that holds focus blurs it.
    fn blur_if_within(&self, node: DomId) {
        if let Some(active) = self.active_element() {
            if self.parent(node).is_some() && self.contains(node, active) {
                self.blur();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn add_listener(&self, id: DomId, name: &str, callback: ListenerFn) -> ListenerId {
        let listener_id = ListenerId(self.next_listener.get());
        self.next_listener.set(listener_id.0 + 1);
        self.listeners.borrow_mut().entry(id).or_default().push(Listener {
            id: listener_id,
            name: name.to_string(),
            callback,
        });
        listener_id
    }

    pub fn remove_listener(&self, id: DomId, listener: ListenerId) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(list) = listeners.get_mut(&id) {
            list.retain(|l| l.id != listener);
            if list.is_empty() {
                listeners.remove(&id);
            }
        }
    }

    /// Number of listeners attached to a node.
    pub fn listener_count(&self, id: DomId) -> usize {
        self.listeners.borrow().get(&id).map_or(0, Vec::len)
    }

    /// Dispatch an event at `target`, bubbling through its ancestors.
    pub fn dispatch(&self, target: DomId, name: &str) {
        let mut current = Some(target);
        while let Some(node) = current {
            let callbacks: Vec<ListenerFn> = self
                .listeners
                .borrow()
                .get(&node)
                .map(|list| {
                    list.iter()
                        .filter(|l| l.name == name)
                        .map(|l| l.callback.clone())
                        .collect()
                })
                .unwrap_or_default();
            let event = Event {
                name: name.to_string(),
                target,
                current_target: node,
            };
            for callback in callbacks {
                callback(&event);
            }
            current = self.parent(node);
        }
    }

    // -------------------------------------------------------------------------
    // Animations
    // -------------------------------------------------------------------------

    /// Start a keyframe animation on an element.
    pub fn animate(&self, id: DomId, keyframes: Vec<Keyframe>, options: KeyframeOptions) -> Animation {
        let anim_id = self.next_animation.get();
        self.next_animation.set(anim_id + 1);
        let animation = Animation::new(anim_id, id, keyframes, options);
        self.animations.borrow_mut().push(animation.clone());
        animation
    }

    /// Every animation ever started on `id`, oldest first.
    pub fn animations_of(&self, id: DomId) -> Vec<Animation> {
        self.animations
            .borrow()
            .iter()
            .filter(|a| a.target() == id)
            .cloned()
            .collect()
    }

    pub fn running_animations(&self) -> Vec<Animation> {
        self.animations
            .borrow()
            .iter()
            .filter(|a| a.is_running())
            .cloned()
            .collect()
    }

    /// Advance the animation timeline by `ms`, resolving finished animations.
    pub fn advance(&self, ms: f64) {
        let reached_end: Vec<Animation> = self
            .running_animations()
            .into_iter()
            .filter(|a| a.tick(ms))
            .collect();
        for animation in reached_end {
            animation.finish();
        }
    }

    /// Finish every running animation.
    pub fn finish_animations(&self) {
        for animation in self.running_animations() {
            animation.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_has_body() {
        let doc = Document::new();
        assert_eq!(doc.tag(doc.body()).as_deref(), Some("body"));
        assert!(doc.is_connected(doc.body()));
        assert_eq!(doc.mutation_count(), 0);
    }

    #[test]
    fn test_insert_before_and_move() {
        let doc = Document::new();
        let parent = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(parent, a);
        doc.insert_before(parent, b, Some(a));
        assert_eq!(doc.children(parent), vec![b, a]);

        doc.insert_before(parent, b, None);
        assert_eq!(doc.children(parent), vec![a, b]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.prev_sibling(a), None);
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    fn test_insert_before_foreign_anchor_panics() {
        let doc = Document::new();
        let parent = doc.create_element("div");
        let other = doc.create_element("div");
        let child = doc.create_element("span");
        let stranger = doc.create_element("span");
        doc.append_child(other, stranger);
        doc.insert_before(parent, child, Some(stranger));
    }

    #[test]
    fn test_reflected_and_live_properties() {
        let doc = Document::new();
        let input = doc.create_element("input");
        doc.set_property(input, "value", "hi".into());
        assert_eq!(doc.attribute(input, "value"), None);
        assert_eq!(doc.property(input, "value"), Some(PropValue::from("hi")));

        doc.set_property(input, "id", "field".into());
        assert_eq!(doc.attribute(input, "id").as_deref(), Some("field"));

        doc.set_property(input, "disabled", true.into());
        assert!(doc.has_attribute(input, "disabled"));
        doc.set_property(input, "disabled", false.into());
        assert!(!doc.has_attribute(input, "disabled"));

        assert!(!doc.has_property(input, "data-x"));
    }

    #[test]
    fn test_svg_elements_have_no_properties() {
        let doc = Document::new();
        let svg = doc.create_element_ns(SVG_NS, "svg");
        assert!(!doc.has_property(svg, "id"));
        doc.set_attribute(svg, "viewBox", "0 0 1 1");
        assert_eq!(doc.attribute(svg, "viewBox").as_deref(), Some("0 0 1 1"));
    }

    #[test]
    fn test_moving_focused_subtree_blurs() {
        let doc = Document::new();
        let list = doc.create_element("div");
        let item = doc.create_element("div");
        let input = doc.create_element("input");
        doc.append_child(doc.body(), list);
        doc.append_child(list, item);
        doc.append_child(item, input);
        doc.set_selection(input, 1, 2);

        doc.insert_before(list, item, None);
        assert_eq!(doc.active_element(), None);
        assert_eq!(doc.selection(), None);
    }

    #[test]
    fn test_dispatch_bubbles() {
        use std::rc::Rc;

        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.append_child(outer, inner);

        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        doc.add_listener(inner, "click", Rc::new(move |_| l1.borrow_mut().push("inner")));
        doc.add_listener(outer, "click", Rc::new(move |_| l2.borrow_mut().push("outer")));

        doc.dispatch(inner, "click");
        assert_eq!(*log.borrow(), vec!["inner", "outer"]);
    }

    #[test]
    fn test_flow_layout_follows_document_order() {
        let doc = Document::new();
        let list = doc.create_element("div");
        let a = doc.create_element("p");
        let b = doc.create_element("p");
        doc.append_child(doc.body(), list);
        doc.append_child(list, a);
        doc.append_child(list, b);

        let ya = doc.bounding_rect(a).y;
        let yb = doc.bounding_rect(b).y;
        assert!(ya < yb);

        doc.insert_before(list, b, Some(a));
        assert_eq!(doc.bounding_rect(b).y, ya);
    }

    #[test]
    fn test_advance_finishes_animations() {
        let doc = Document::new();
        let el = doc.create_element("div");
        let anim = doc.animate(el, Vec::new(), KeyframeOptions::default());
        doc.advance(100.0);
        assert!(anim.is_running());
        doc.advance(100.0);
        assert!(!anim.is_running());
        assert_eq!(doc.animations_of(el).len(), 1);
    }
}
