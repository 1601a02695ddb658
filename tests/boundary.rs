//! Error boundary tests: containment during mount and diff, out-of-band
//! errors, and what happens without a boundary.
//!
//! Run with: cargo test --test boundary

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_vdom::{
    Component, ComponentHandle, Document, Fallback, Props, RenderError, Rendered, Root, Runtime,
    VNode,
};

// =============================================================================
// Helpers
// =============================================================================

fn setup() -> (Rc<Document>, Rc<Runtime>, Root) {
    let doc = Rc::new(Document::new());
    let runtime = Runtime::new(doc.clone());
    let container = doc.create_element("div");
    doc.append_child(doc.body(), container);
    let root = runtime.create_root(container);
    (doc, runtime, root)
}

/// Renders "ok" until `fail` is set.
fn flaky(fail: Rc<Cell<bool>>) -> Component {
    Component::stateless("Flaky", move |_| {
        if fail.get() {
            return Err(RenderError::msg("boom"));
        }
        Ok(Rendered::new(VNode::element("span").child("ok")))
    })
}

fn error_text() -> Fallback {
    Fallback::render(|err| VNode::element("em").child(err.to_string()).into())
}

fn page(content: VNode, errors: Rc<RefCell<Vec<String>>>) -> VNode {
    VNode::element("main")
        .child(VNode::element("h1").child("title"))
        .child(
            VNode::boundary([VNode::text("before "), content], error_text())
                .on_error(move |err| errors.borrow_mut().push(err.root_cause().to_string())),
        )
        .child(VNode::element("footer").child(" end"))
        .into()
}

// =============================================================================
// Containment in the diff
// =============================================================================

#[test]
fn test_mount_error_shows_fallback_in_place() {
    let (doc, runtime, root) = setup();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let broken = flaky(Rc::new(Cell::new(true)));

    root.render(page(VNode::component(&broken, Props::new()), errors.clone())).unwrap();
    assert_eq!(
        doc.text_content(root.container()),
        "titlecomponent `Flaky` failed: boom end"
    );
    assert_eq!(*errors.borrow(), vec!["boom".to_string()]);
    assert!(runtime.mounted_count() > 0);
}

#[test]
fn test_diff_error_is_contained() {
    let (doc, _runtime, root) = setup();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let fail = Rc::new(Cell::new(false));
    let component = flaky(fail.clone());

    root.render(page(VNode::component(&component, Props::new()), errors.clone())).unwrap();
    assert_eq!(doc.text_content(root.container()), "titlebefore ok end");
    let main = doc.first_child(root.container()).unwrap();
    let title = doc.first_child(main).unwrap();

    fail.set(true);
    root.render(page(VNode::component(&component, Props::new()), errors.clone())).unwrap();
    assert_eq!(
        doc.text_content(root.container()),
        "titlecomponent `Flaky` failed: boom end"
    );
    assert_eq!(doc.first_child(main), Some(title));
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_tripped_boundary_is_replaced_by_next_render() {
    let (doc, _runtime, root) = setup();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let fail = Rc::new(Cell::new(true));
    let component = flaky(fail.clone());

    root.render(page(VNode::component(&component, Props::new()), errors.clone())).unwrap();
    fail.set(false);
    root.render(page(VNode::component(&component, Props::new()), errors.clone())).unwrap();
    assert_eq!(doc.text_content(root.container()), "titlebefore ok end");
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_inner_boundary_shields_outer() {
    let (doc, _runtime, root) = setup();
    let broken = flaky(Rc::new(Cell::new(true)));
    root.render(VNode::boundary(
        [
            VNode::text("outer "),
            VNode::boundary([VNode::component(&broken, Props::new())], "inner fallback"),
        ],
        "outer fallback",
    ))
    .unwrap();
    assert_eq!(doc.text_content(root.container()), "outer inner fallback");
}

#[test]
fn test_failing_fallback_escalates() {
    let (doc, _runtime, root) = setup();
    let broken = flaky(Rc::new(Cell::new(true)));
    let inner_fallback = VNode::component(&broken, Props::new());
    root.render(VNode::boundary(
        [VNode::boundary([VNode::component(&broken, Props::new())], inner_fallback)],
        "outer fallback",
    ))
    .unwrap();
    assert_eq!(doc.text_content(root.container()), "outer fallback");
}

// =============================================================================
// Out-of-band errors
// =============================================================================

type Slot = Rc<RefCell<Option<ComponentHandle>>>;

/// A button that raises when clicked.
fn raiser(slot: Slot) -> Component {
    Component::new("Raiser", move |handle| {
        *slot.borrow_mut() = Some(handle.clone());
        let handle = handle.clone();
        move |_: &Props| {
            let handle = handle.clone();
            Ok(Rendered::new(
                VNode::element("button")
                    .child("press")
                    .on("click", move |_| handle.raise(RenderError::msg("clicked"))),
            ))
        }
    })
}

#[test]
fn test_raise_from_event_handler_trips_boundary() {
    let (doc, runtime, root) = setup();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let slot = Slot::default();
    let component = raiser(slot.clone());

    root.render(page(VNode::component(&component, Props::new()), errors.clone())).unwrap();
    runtime.run_microtasks();
    let main = doc.first_child(root.container()).unwrap();
    let button = doc.children(main)[2];
    assert_eq!(doc.tag(button).as_deref(), Some("button"));

    doc.dispatch(button, "click");
    assert!(!doc.is_connected(button));
    assert_eq!(doc.text_content(root.container()), "titleclicked end");
    assert_eq!(*errors.borrow(), vec!["clicked".to_string()]);
    assert!(!slot.borrow().as_ref().unwrap().is_mounted());
}

#[test]
fn test_raise_during_render_is_deferred_until_after_commit() {
    let (doc, runtime, root) = setup();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let eager = Component::new("Eager", |handle| {
        let handle = handle.clone();
        move |_: &Props| {
            handle.raise(RenderError::msg("eager"));
            Ok(Rendered::new(VNode::text("rendered")))
        }
    });

    root.render(page(VNode::component(&eager, Props::new()), errors.clone())).unwrap();
    assert_eq!(doc.text_content(root.container()), "titlebefore rendered end");
    assert!(errors.borrow().is_empty());

    runtime.run_microtasks();
    assert_eq!(doc.text_content(root.container()), "titleeager end");
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_raise_without_boundary_is_logged_and_dropped() {
    let (doc, runtime, root) = setup();
    let slot = Slot::default();
    let component = raiser(slot.clone());
    root.render(VNode::component(&component, Props::new())).unwrap();
    runtime.run_microtasks();

    let button = doc.first_child(root.container()).unwrap();
    doc.dispatch(button, "click");
    assert!(doc.is_connected(button));
    assert!(slot.borrow().as_ref().unwrap().is_mounted());
}

#[test]
fn test_failed_scheduled_rerender_trips_boundary() {
    let (doc, runtime, root) = setup();
    let fail = Rc::new(Cell::new(false));
    let slot = Slot::default();
    let component = {
        let fail = fail.clone();
        let slot = slot.clone();
        Component::new("Scheduled", move |handle| {
            *slot.borrow_mut() = Some(handle.clone());
            let fail = fail.clone();
            move |_: &Props| {
                if fail.get() {
                    return Err(RenderError::msg("late"));
                }
                Ok(Rendered::new(VNode::text("fine")))
            }
        })
    };

    root.render(VNode::boundary([VNode::component(&component, Props::new())], error_text()))
        .unwrap();
    fail.set(true);
    slot.borrow().as_ref().unwrap().update();
    runtime.run_microtasks();
    assert_eq!(doc.text_content(root.container()), "component `Scheduled` failed: late");
}

// =============================================================================
// No boundary
// =============================================================================

#[test]
fn test_uncontained_error_unmounts_root() {
    let (doc, runtime, root) = setup();
    let fail = Rc::new(Cell::new(false));
    let component = flaky(fail.clone());

    root.render(VNode::element("section").child(VNode::component(&component, Props::new())))
        .unwrap();
    assert_eq!(doc.text_content(root.container()), "ok");

    fail.set(true);
    let err = root
        .render(VNode::element("section").child(VNode::component(&component, Props::new())))
        .unwrap_err();
    assert_eq!(err.root_cause().to_string(), "boom");
    assert!(doc.children(root.container()).is_empty());
    assert_eq!(runtime.mounted_count(), 0);
    assert!(root.committed().is_none());

    fail.set(false);
    root.render(VNode::component(&component, Props::new())).unwrap();
    assert_eq!(doc.text_content(root.container()), "ok");
}

// =============================================================================
// Keyed positions
// =============================================================================

fn keyed_row(middle: VNode) -> VNode {
    VNode::element("ul")
        .child(VNode::element("li").key("a").child("A"))
        .child(middle.with_key("b"))
        .child(VNode::element("li").key("c").child("C"))
        .into()
}

#[test]
fn test_keyed_boundary_trips_in_place() {
    let (doc, _runtime, root) = setup();
    let fail = Rc::new(Cell::new(false));
    let component = flaky(fail.clone());
    let row = || keyed_row(VNode::boundary([VNode::component(&component, Props::new())], "fallback"));

    root.render(row()).unwrap();
    let ul = doc.first_child(root.container()).unwrap();
    let before = doc.children(ul);
    assert_eq!(doc.text_content(ul), "AokC");

    fail.set(true);
    root.render(row()).unwrap();
    let after = doc.children(ul);
    assert_eq!(doc.text_content(ul), "AfallbackC");
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert!(!doc.is_connected(before[1]));
}

#[test]
fn test_boundary_under_keyed_component_trips_in_place() {
    let (doc, _runtime, root) = setup();
    let fail = Rc::new(Cell::new(false));
    let inner = flaky(fail.clone());
    let guarded = Component::stateless("Guarded", move |_| {
        Ok(Rendered::new(VNode::boundary(
            [VNode::component(&inner, Props::new())],
            "fallback",
        )))
    });
    let row = || keyed_row(VNode::component(&guarded, Props::new()));

    root.render(row()).unwrap();
    let ul = doc.first_child(root.container()).unwrap();
    let before = doc.children(ul);

    fail.set(true);
    root.render(row()).unwrap();
    let after = doc.children(ul);
    assert_eq!(doc.text_content(ul), "AfallbackC");
    assert_eq!((after[0], after[2]), (before[0], before[2]));

    fail.set(false);
    root.render(row()).unwrap();
    assert_eq!(doc.text_content(ul), "AokC");
    assert_eq!(doc.children(ul)[0], before[0]);
}
