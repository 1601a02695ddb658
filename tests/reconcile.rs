//! Reconciliation tests: diff dispatch, keyed children, host props, events,
//! connect callbacks, CSS and frame placeholders.
//!
//! Run with: cargo test --test reconcile

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_vdom::{
    AbortSignal, Css, Document, DomId, Options, Props, Rendered, Root, Runtime, StyleManager,
    StyleSheet, VNode, SVG_NS,
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

fn list(keys: &[&str]) -> VNode {
    VNode::element("ul")
        .children(
            keys.iter()
                .map(|k| VNode::from(VNode::element("li").key(*k).child(k.to_uppercase()))),
        )
        .into()
}

fn items(doc: &Document, root: &Root) -> Vec<DomId> {
    let ul = doc.first_child(root.container()).unwrap();
    doc.children(ul)
}

// =============================================================================
// Diff basics
// =============================================================================

#[test]
fn test_identical_render_does_not_mutate() {
    let (doc, runtime, root) = setup();
    let tree = || {
        VNode::element("section")
            .attr("id", "main")
            .attr("data-state", "open")
            .child(VNode::element("h1").child("Title"))
            .child(list(&["a", "b", "c"]))
    };

    root.render(tree()).unwrap();
    runtime.run_microtasks();
    let mutations = doc.mutation_count();
    let created = doc.created_count();

    root.render(tree()).unwrap();
    runtime.run_microtasks();
    assert_eq!(doc.mutation_count(), mutations);
    assert_eq!(doc.created_count(), created);
}

#[test]
fn test_keyed_permutation_moves_nodes() {
    let (doc, _runtime, root) = setup();
    root.render(list(&["key1", "key2", "key3"])).unwrap();
    let before = items(&doc, &root);
    let created = doc.created_count();

    root.render(list(&["key3", "key1", "key2"])).unwrap();
    let after = items(&doc, &root);
    assert_eq!(after, vec![before[2], before[0], before[1]]);
    assert_eq!(doc.created_count(), created);
    assert_eq!(doc.text_content(root.container()), "KEY3KEY1KEY2");
}

#[test]
fn test_keyed_reverse_and_shift() {
    let (doc, _runtime, root) = setup();
    root.render(list(&["a", "b", "c", "d", "e"])).unwrap();
    let before = items(&doc, &root);

    root.render(list(&["e", "d", "c", "b", "a"])).unwrap();
    let reversed: Vec<DomId> = before.iter().rev().copied().collect();
    assert_eq!(items(&doc, &root), reversed);

    root.render(list(&["x", "e", "d", "c", "b", "a"])).unwrap();
    let shifted = items(&doc, &root);
    assert_eq!(shifted.len(), 6);
    assert_eq!(&shifted[1..], &reversed[..]);
    assert_eq!(doc.text_content(root.container()), "XEDCBA");
}

#[test]
fn test_keyed_shift_and_rotate_touch_one_node() {
    let (doc, _runtime, root) = setup();
    root.render(list(&["a", "b", "c", "d"])).unwrap();

    let mutations = doc.mutation_count();
    root.render(list(&["b", "c", "d"])).unwrap();
    assert_eq!(doc.mutation_count(), mutations + 1);

    let before = items(&doc, &root);
    let mutations = doc.mutation_count();
    root.render(list(&["d", "b", "c"])).unwrap();
    assert_eq!(doc.mutation_count(), mutations + 1);
    assert_eq!(items(&doc, &root), vec![before[2], before[0], before[1]]);
}

#[test]
fn test_keyed_insert_and_remove() {
    let (doc, _runtime, root) = setup();
    root.render(list(&["a", "b", "c"])).unwrap();
    let before = items(&doc, &root);

    root.render(list(&["a", "n", "c"])).unwrap();
    let after = items(&doc, &root);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert!(!before.contains(&after[1]));
    assert!(!doc.is_connected(before[1]));
    assert_eq!(doc.text_content(root.container()), "ANC");
}

#[test]
fn test_key_change_remounts() {
    let (doc, _runtime, root) = setup();
    root.render(list(&["a"])).unwrap();
    let before = items(&doc, &root);

    root.render(list(&["b"])).unwrap();
    let after = items(&doc, &root);
    assert_ne!(after[0], before[0]);
}

#[test]
fn test_unkeyed_surplus_is_removed() {
    let (doc, _runtime, root) = setup();
    let divs = |n: usize| {
        VNode::element("main").children((1..=n).map(|i| VNode::from(VNode::element("div").child(i.to_string()))))
    };
    root.render(divs(2)).unwrap();
    let main = doc.first_child(root.container()).unwrap();
    let before = doc.children(main);

    root.render(divs(1)).unwrap();
    assert_eq!(doc.children(main), vec![before[0]]);
    assert!(!doc.is_connected(before[1]));
}

#[test]
fn test_duplicate_keys_still_render() {
    let (doc, _runtime, root) = setup();
    root.render(list(&["a", "a", "b"])).unwrap();
    assert_eq!(items(&doc, &root).len(), 3);

    root.render(list(&["b", "a", "a"])).unwrap();
    assert_eq!(doc.text_content(root.container()), "BAA");
}

#[test]
fn test_type_change_replaces_node() {
    let (doc, _runtime, root) = setup();
    root.render(VNode::element("p").child("x")).unwrap();
    let p = doc.first_child(root.container()).unwrap();

    root.render(VNode::element("span").child("x")).unwrap();
    let span = doc.first_child(root.container()).unwrap();
    assert_ne!(p, span);
    assert!(!doc.is_connected(p));
    assert_eq!(doc.children(root.container()).len(), 1);
}

#[test]
fn test_text_updates_in_place() {
    let (doc, _runtime, root) = setup();
    root.render(VNode::element("p").child("one")).unwrap();
    let p = doc.first_child(root.container()).unwrap();
    let text = doc.first_child(p).unwrap();

    root.render(VNode::element("p").child("two")).unwrap();
    assert_eq!(doc.first_child(p), Some(text));
    assert_eq!(doc.text_data(text).as_deref(), Some("two"));
}

#[test]
fn test_fragment_keeps_order_among_siblings() {
    let (doc, _runtime, root) = setup();
    let tree = |middle: &[&str]| {
        VNode::element("div")
            .child("start")
            .child(VNode::fragment(middle.iter().map(|s| VNode::text(*s))))
            .child("end")
    };
    root.render(tree(&["a"])).unwrap();
    root.render(tree(&["a", "b", "c"])).unwrap();
    assert_eq!(doc.text_content(root.container()), "startabcend");

    root.render(tree(&[])).unwrap();
    assert_eq!(doc.text_content(root.container()), "startend");
}

#[test]
fn test_svg_children_use_namespace() {
    let (doc, _runtime, root) = setup();
    root.render(
        VNode::element("svg")
            .attr("viewBox", "0 0 10 10")
            .child(VNode::element("circle").attr("r", "4").attr("xlink:href", "#c")),
    )
    .unwrap();
    let svg = doc.first_child(root.container()).unwrap();
    let circle = doc.first_child(svg).unwrap();
    assert_eq!(doc.namespace(svg).as_deref(), Some(SVG_NS));
    assert_eq!(doc.namespace(circle).as_deref(), Some(SVG_NS));
    assert_eq!(doc.attribute(circle, "r").as_deref(), Some("4"));
    assert_eq!(doc.attribute(circle, "xlink:href").as_deref(), Some("#c"));
}

// =============================================================================
// Props
// =============================================================================

#[test]
fn test_attributes_added_changed_removed() {
    let (doc, _runtime, root) = setup();
    root.render(VNode::element("div").attr("title", "a").attr("data-x", "1")).unwrap();
    let div = doc.first_child(root.container()).unwrap();

    root.render(VNode::element("div").attr("title", "b").attr("aria-label", "l")).unwrap();
    assert_eq!(doc.attribute(div, "title").as_deref(), Some("b"));
    assert_eq!(doc.attribute(div, "aria-label").as_deref(), Some("l"));
    assert!(!doc.has_attribute(div, "data-x"));
}

#[test]
fn test_live_value_property() {
    let (doc, _runtime, root) = setup();
    root.render(VNode::element("input").attr("value", "hello")).unwrap();
    let input = doc.first_child(root.container()).unwrap();
    assert_eq!(
        doc.property(input, "value").and_then(|v| v.as_str().map(str::to_string)),
        Some("hello".to_string())
    );
    assert!(!doc.has_attribute(input, "value"));
}

#[test]
fn test_listeners_attach_after_commit_and_update_in_place() {
    let (doc, runtime, root) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let button = |label: &'static str| {
        let log = log.clone();
        VNode::element("button").on("click", move |_| log.borrow_mut().push(label))
    };

    root.render(button("first")).unwrap();
    let dom = doc.first_child(root.container()).unwrap();
    assert_eq!(doc.listener_count(dom), 0);
    runtime.run_microtasks();
    assert_eq!(doc.listener_count(dom), 1);

    doc.dispatch(dom, "click");
    root.render(button("second")).unwrap();
    assert_eq!(doc.listener_count(dom), 1);
    doc.dispatch(dom, "click");
    assert_eq!(*log.borrow(), vec!["first", "second"]);

    root.render(VNode::element("button")).unwrap();
    assert_eq!(doc.listener_count(dom), 0);
}

#[test]
fn test_connect_runs_once_and_aborts_on_removal() {
    let (doc, runtime, root) = setup();
    let calls = Rc::new(Cell::new(0));
    let signal: Rc<RefCell<Option<AbortSignal>>> = Rc::default();
    let tree = |show: bool| {
        let calls = calls.clone();
        let signal = signal.clone();
        let child = VNode::element("canvas").connect(move |cx| {
            calls.set(calls.get() + 1);
            assert!(cx.document.is_connected(cx.element));
            *signal.borrow_mut() = Some(cx.signal.clone());
        });
        VNode::element("div").children(show.then(|| VNode::from(child)))
    };

    root.render(tree(true)).unwrap();
    assert_eq!(calls.get(), 0);
    runtime.run_microtasks();
    assert_eq!(calls.get(), 1);

    root.render(tree(true)).unwrap();
    runtime.run_microtasks();
    assert_eq!(calls.get(), 1);

    let signal = signal.borrow().clone().unwrap();
    assert!(!signal.is_aborted());
    root.render(tree(false)).unwrap();
    assert!(signal.is_aborted());
    assert!(doc.first_child(doc.first_child(root.container()).unwrap()).is_none());
}

#[test]
fn test_css_rules_follow_their_users() {
    let doc = Rc::new(Document::new());
    let sheet = Rc::new(StyleSheet::new());
    let manager: Rc<dyn StyleManager> = sheet.clone();
    let runtime = Runtime::with_options(
        doc.clone(),
        Options {
            style_manager: Some(manager),
            ..Options::default()
        },
    );
    let root = runtime.create_root(doc.body());
    let red = Css::new("color: red;");
    let blue = Css::new("color: blue;");

    let tree = |css: &Css, copies: usize| {
        VNode::element("div").children(
            (0..copies).map(|_| VNode::from(VNode::element("span").attr("class", "label").css(css.clone()))),
        )
    };

    root.render(tree(&red, 2)).unwrap();
    assert_eq!(sheet.len(), 1);
    assert!(sheet.contains(&red.class_name()));
    let span = doc.first_child(doc.first_child(doc.body()).unwrap()).unwrap();
    assert_eq!(
        doc.attribute(span, "class"),
        Some(format!("label {}", red.class_name()))
    );

    root.render(tree(&red, 1)).unwrap();
    assert!(sheet.contains(&red.class_name()));

    root.render(tree(&blue, 1)).unwrap();
    assert!(!sheet.contains(&red.class_name()));
    assert!(sheet.contains(&blue.class_name()));

    root.unmount();
    assert!(sheet.is_empty());
}

// =============================================================================
// Components and frames
// =============================================================================

#[test]
fn test_component_receives_latest_props() {
    let (doc, _runtime, root) = setup();
    let setups = Rc::new(Cell::new(0));
    let setups_in = setups.clone();
    let greeting = spark_vdom::Component::new("Greeting", move |_| {
        setups_in.set(setups_in.get() + 1);
        |props: &Props| Ok(Rendered::new(VNode::element("b").child(format!("hi {}", props.str("name").unwrap_or("")))))
    });

    root.render(VNode::component(&greeting, Props::new().with("name", "ada"))).unwrap();
    root.render(VNode::component(&greeting, Props::new().with("name", "bob"))).unwrap();
    assert_eq!(doc.text_content(root.container()), "hi bob");
    assert_eq!(setups.get(), 1);
}

#[test]
fn test_frame_placeholder_renders_markers() {
    let (doc, _runtime, root) = setup();
    root.render(VNode::element("div").child("a").child(VNode::frame("nav")).child("b")).unwrap();
    let div = doc.first_child(root.container()).unwrap();
    assert_eq!(doc.inner_html(div), "a<!--vroot:nav--><!--/vroot-->b");

    root.render(VNode::element("div").child("a").child("b")).unwrap();
    assert_eq!(doc.inner_html(div), "ab");
}

#[test]
#[should_panic(expected = "invariant violation")]
fn test_frame_against_frame_is_an_invariant_violation() {
    let (_doc, _runtime, root) = setup();
    root.render(VNode::frame("a")).unwrap();
    let _ = root.render(VNode::frame("a"));
}

#[test]
fn test_unmount_releases_everything() {
    let (doc, runtime, root) = setup();
    root.render(list(&["a", "b"])).unwrap();
    assert!(runtime.mounted_count() > 0);

    root.unmount();
    assert_eq!(runtime.mounted_count(), 0);
    assert!(doc.children(root.container()).is_empty());
    assert!(root.committed().is_none());
}
