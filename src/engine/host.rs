//! Host elements: mount, diff and release.
//!
//! Props are written through the live property when the element exposes one
//! and the name is not known to misbehave as a property, otherwise through
//! the attribute (namespaced for `xlink:` / `xml:`). SVG elements always take
//! the attribute path.
//!
//! Events go through one listener container per element. The container's
//! handler map is swapped in place on every diff; the DOM only ever sees one
//! trampoline listener per event name.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::mounted::{Mounted, MountedHost, MountedKind};
use super::{NodeId, Place, Runtime};
use crate::dom::{Document, DomId, Event, ListenerFn, ListenerId};
use crate::error::RenderError;
use crate::presence::PresenceState;
use crate::types::{attribute_namespace, PropValue, SVG_NS};
use crate::vnode::{AbortController, ConnectCx, Element, Events, Props, Task};

/// Names that exist as properties but must be written as attributes.
const ATTRIBUTE_ONLY: &[&str] = &[
    "width", "height", "href", "list", "form", "tabIndex", "download", "rowSpan", "colSpan", "role",
    "popover",
];

// =============================================================================
// Listener container
// =============================================================================

type HandlerMap = Rc<RefCell<FxHashMap<String, ListenerFn>>>;

pub(crate) struct EventsContainer {
    handlers: HandlerMap,
    attached: FxHashMap<String, ListenerId>,
}

impl EventsContainer {
    fn new(events: &Events) -> Self {
        let container = Self {
            handlers: Rc::default(),
            attached: FxHashMap::default(),
        };
        container.replace(events);
        container
    }

    fn replace(&self, events: &Events) {
        let mut handlers = self.handlers.borrow_mut();
        handlers.clear();
        for (name, handler) in events.iter() {
            handlers.insert(name.to_string(), handler.clone());
        }
    }

    /// Attach a trampoline for every handled event and detach the rest.
    fn sync(&mut self, doc: &Document, dom: DomId) {
        let wanted: Vec<String> = self.handlers.borrow().keys().cloned().collect();
        self.attached.retain(|name, listener| {
            let keep = wanted.contains(name);
            if !keep {
                doc.remove_listener(dom, *listener);
            }
            keep
        });
        for name in wanted {
            if self.attached.contains_key(&name) {
                continue;
            }
            let handlers = self.handlers.clone();
            let key = name.clone();
            let listener = doc.add_listener(
                dom,
                &name,
                Rc::new(move |event: &Event| {
                    let handler = handlers.borrow().get(&key).cloned();
                    if let Some(handler) = handler {
                        handler(event);
                    }
                }),
            );
            self.attached.insert(name, listener);
        }
    }

    fn detach(self, doc: &Document, dom: DomId) {
        for listener in self.attached.into_values() {
            doc.remove_listener(dom, listener);
        }
    }
}

// =============================================================================
// Property writes
// =============================================================================

fn uses_property(doc: &Document, dom: DomId, svg: bool, name: &str) -> bool {
    !svg && !ATTRIBUTE_ONLY.contains(&name) && doc.has_property(dom, name)
}

fn set_prop(doc: &Document, dom: DomId, svg: bool, name: &str, value: &PropValue) {
    if uses_property(doc, dom, svg, name) {
        doc.set_property(dom, name, value.clone());
        return;
    }
    match value.to_attribute() {
        Some(attr) => match attribute_namespace(name) {
            Some(ns) => doc.set_attribute_ns(dom, ns, name, &attr),
            None => doc.set_attribute(dom, name, &attr),
        },
        None => doc.remove_attribute(dom, name),
    }
}

fn clear_prop(doc: &Document, dom: DomId, svg: bool, name: &str, old: &PropValue) {
    if uses_property(doc, dom, svg, name) {
        doc.set_property(dom, name, old.cleared());
    } else {
        doc.remove_attribute(dom, name);
    }
}

/// Attributes to apply, with the CSS class merged into `class`.
fn effective_attrs(attrs: &[(String, PropValue)], class_name: Option<&str>) -> Vec<(String, PropValue)> {
    let mut out = attrs.to_vec();
    let Some(class_name) = class_name else {
        return out;
    };
    match out.iter_mut().find(|(name, _)| name == "class") {
        Some((_, value)) => {
            let user = value.to_attribute().unwrap_or_default();
            *value = if user.is_empty() {
                PropValue::from(class_name)
            } else {
                PropValue::Str(format!("{user} {class_name}"))
            };
        }
        None => out.push(("class".to_string(), PropValue::from(class_name))),
    }
    out
}

fn lookup<'a>(attrs: &'a [(String, PropValue)], name: &str) -> Option<&'a PropValue> {
    attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

// =============================================================================
// Mount / diff
// =============================================================================

impl Runtime {
    pub(crate) fn insert_host(&self, element: Element, place: Place) -> Result<NodeId, RenderError> {
        let Element { tag, mut props } = element;
        let svg = place.svg || tag == "svg";

        if let Some(key) = props.key.clone() {
            let reclaimed = self.exiting.borrow_mut().take_match(place.dom_parent, &tag, &key);
            if let Some(exiting) = reclaimed {
                return self.reclaim(exiting, Element { tag, props }, place);
            }
        }

        let doc = self.doc();
        let hydrated = self.claim_element(&tag);
        let dom = match hydrated {
            Some(dom) => dom,
            None if svg => doc.create_element_ns(SVG_NS, &tag),
            None => doc.create_element(&tag),
        };
        let host = MountedHost::new(&tag, dom, svg);
        let child_svg = host.child_svg();
        let id = self.allocate(Mounted::new(
            props.key.clone(),
            place.parent,
            MountedKind::Host(host),
        ));
        self.apply_props(id, &props, hydrated.is_some());

        let children = props.take_children();
        let hydrating = self.is_hydrating();
        if hydrating {
            match hydrated {
                Some(dom) => self.push_cursor(doc.first_child(dom)),
                None => self.push_fresh(),
            }
        }
        let child_place = Place {
            dom_parent: dom,
            anchor: None,
            parent: Some(id),
            svg: child_svg,
        };
        let result = self.insert_children(children, child_place);
        if hydrating {
            self.pop_cursor(dom, hydrated.is_some());
        }
        match result {
            Ok(children) => self.set_children(id, children),
            Err(err) => {
                self.remove_now(id);
                return Err(err);
            }
        }

        if hydrated.is_none() {
            doc.insert_before(place.dom_parent, dom, self.insertion_anchor(place));
        }
        self.update_host_extras(id, &props, true);
        if let Some(presence) = &props.presence {
            if presence.has_enter() && !hydrating {
                self.enqueue_enter(id);
            }
        }
        Ok(id)
    }

    /// Same tag: reconcile children, then props.
    pub(crate) fn diff_host(&self, id: NodeId, element: Element) -> Result<NodeId, RenderError> {
        let Element { mut props, .. } = element;
        let Some((dom, child_svg)) = self
            .with_node(id, |n| n.as_host().map(|h| (h.dom, h.child_svg())))
            .flatten()
        else {
            return Ok(id);
        };

        let prev = self.take_children(id);
        let child_place = Place {
            dom_parent: dom,
            anchor: None,
            parent: Some(id),
            svg: child_svg,
        };
        match self.diff_children(prev, props.take_children(), child_place) {
            Ok(children) => self.set_children(id, children),
            Err(err) => {
                self.remove_now(id);
                return Err(err);
            }
        }

        self.apply_props(id, &props, false);
        self.update_host_extras(id, &props, false);
        Ok(id)
    }

    /// Diff attributes, properties and the CSS class.
    fn apply_props(&self, id: NodeId, props: &Props, hydrating: bool) {
        let next_class = props.css.as_ref().map(|css| self.styles.borrow_mut().acquire(css));
        let Some((dom, svg, prev_attrs, prev_class)) = self
            .with_node_mut(id, |n| {
                let host = n.as_host_mut()?;
                Some((
                    host.dom,
                    host.svg,
                    std::mem::take(&mut host.attrs),
                    host.class_name.take(),
                ))
            })
            .flatten()
        else {
            return;
        };
        if let Some(prev_class) = &prev_class {
            self.styles.borrow_mut().release(prev_class);
        }

        let doc = self.doc();
        let next_attrs = effective_attrs(props.attrs(), next_class.as_deref());
        if hydrating {
            self.heal_attributes(dom, svg, &next_attrs);
        } else {
            for (name, old) in &prev_attrs {
                if lookup(&next_attrs, name).is_none() {
                    clear_prop(doc, dom, svg, name, old);
                }
            }
            for (name, value) in &next_attrs {
                if lookup(&prev_attrs, name) != Some(value) {
                    set_prop(doc, dom, svg, name, value);
                }
            }
        }

        self.with_node_mut(id, |n| {
            if let Some(host) = n.as_host_mut() {
                host.attrs = next_attrs;
                host.class_name = next_class;
            }
        });
    }

    /// Make a server-rendered element's attributes match `attrs`.
    fn heal_attributes(&self, dom: DomId, svg: bool, attrs: &[(String, PropValue)]) {
        let doc = self.doc();
        for (name, value) in attrs {
            if uses_property(doc, dom, svg, name) {
                if doc.property(dom, name).as_ref() != Some(value) {
                    doc.set_property(dom, name, value.clone());
                }
                continue;
            }
            let expected = value.to_attribute();
            let actual = doc.attribute(dom, name);
            if actual != expected {
                log::warn!(
                    "hydration mismatch on <{}> attribute `{name}`: expected {expected:?}, found {actual:?}",
                    doc.tag(dom).unwrap_or_default()
                );
                set_prop(doc, dom, svg, name, value);
            }
        }
        let wanted: Vec<String> = attrs
            .iter()
            .filter(|(name, _)| !uses_property(doc, dom, svg, name))
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect();
        for attr in doc.attributes(dom) {
            if !wanted.contains(&attr.name.to_ascii_lowercase()) {
                log::warn!(
                    "hydration mismatch on <{}>: removing unexpected attribute `{}`",
                    doc.tag(dom).unwrap_or_default(),
                    attr.name
                );
                doc.remove_attribute(dom, &attr.name);
            }
        }
    }

    /// Events, connect, presence config and layout tracking.
    ///
    /// On mount, listeners and connect run as post-commit tasks (listeners
    /// first). On diff, listeners are updated in place right away.
    fn update_host_extras(&self, id: NodeId, props: &Props, mounting: bool) {
        let doc = self.doc();
        let mut detached = None;
        let mut abort = None;
        let mut start_connect = false;
        let mut layout = None;
        let Some(dom) = self
            .with_node_mut(id, |n| {
                let host = n.as_host_mut()?;
                match (host.events.as_ref(), props.on.as_ref()) {
                    (Some(container), Some(events)) => container.replace(events),
                    (None, Some(events)) => host.events = Some(EventsContainer::new(events)),
                    (Some(_), None) => detached = host.events.take(),
                    (None, None) => {}
                }

                host.connect = props.connect.clone();
                match (host.abort.is_some(), props.connect.is_some()) {
                    (false, true) => {
                        host.abort = Some(AbortController::new());
                        start_connect = true;
                    }
                    (true, false) => abort = host.abort.take(),
                    _ => {}
                }

                host.presence = props.presence.clone();
                let wants_layout = props.presence.as_ref().is_some_and(|p| p.tracks_layout());
                if wants_layout != host.layout {
                    host.layout = wants_layout;
                    layout = Some(wants_layout);
                }
                Some(host.dom)
            })
            .flatten()
        else {
            return;
        };

        if let Some(container) = detached {
            container.detach(doc, dom);
        }
        if let Some(controller) = abort {
            controller.abort();
        }
        match layout {
            Some(true) => self.layout.borrow_mut().register(dom),
            Some(false) => self.layout.borrow_mut().unregister(dom),
            None => {}
        }

        let weak = self.weak();
        let mut tasks: Vec<Task> = Vec::new();
        if props.on.is_some() {
            if mounting {
                let weak = weak.clone();
                tasks.push(Box::new(move || {
                    if let Some(runtime) = weak.upgrade() {
                        runtime.sync_listeners(id);
                    }
                }));
            } else {
                self.sync_listeners(id);
            }
        }
        if start_connect {
            tasks.push(Box::new(move || {
                if let Some(runtime) = weak.upgrade() {
                    runtime.run_connect(id);
                }
            }));
        }
        self.enqueue_tasks(tasks);
    }

    pub(crate) fn sync_listeners(&self, id: NodeId) {
        let doc = self.doc();
        self.with_node_mut(id, |n| {
            let Some(host) = n.as_host_mut() else {
                return;
            };
            let dom = host.dom;
            if let Some(events) = host.events.as_mut() {
                events.sync(doc, dom);
            }
        });
    }

    fn run_connect(&self, id: NodeId) {
        let Some((dom, connect, signal)) = self
            .with_node(id, |n| {
                let host = n.as_host()?;
                Some((host.dom, host.connect.clone()?, host.abort.as_ref()?.signal()))
            })
            .flatten()
        else {
            return;
        };
        if signal.is_aborted() {
            return;
        }
        connect(&ConnectCx {
            document: self.doc(),
            element: dom,
            signal,
        });
    }

    /// Release everything a host element holds, without touching the DOM
    /// tree. Its children have already been released.
    pub(crate) fn release_host(&self, id: NodeId, host: MountedHost) {
        let doc = self.doc();
        if let Some(events) = host.events {
            events.detach(doc, host.dom);
        }
        if let Some(controller) = host.abort {
            controller.abort();
        }
        if host.layout {
            self.layout.borrow_mut().unregister(host.dom);
        }
        if let Some(class_name) = &host.class_name {
            self.styles.borrow_mut().release(class_name);
        }
        if let Some(animation) = host.animation {
            if animation.is_running() {
                animation.cancel();
            }
        }
        if host.state == PresenceState::Exiting {
            self.exiting.borrow_mut().remove(id);
        }
    }
}
