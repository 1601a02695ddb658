//! Hydration tests: adopting server-rendered nodes and healing mismatches.
//!
//! Run with: cargo test --test hydration

use std::rc::Rc;

use spark_vdom::{Component, Document, Presence, Props, Rendered, Root, Runtime, VNode};

fn setup(server_html: &str) -> (Rc<Document>, Rc<Runtime>, Root) {
    let doc = Rc::new(Document::new());
    let runtime = Runtime::new(doc.clone());
    let container = doc.create_element("div");
    doc.append_child(doc.body(), container);
    doc.set_inner_html(container, server_html);
    let root = runtime.create_root(container);
    (doc, runtime, root)
}

// =============================================================================
// Adoption
// =============================================================================

#[test]
fn test_matching_markup_is_adopted_without_mutations() {
    let (doc, runtime, root) = setup(r#"<ul><li class="x">One</li><li>Two</li></ul>"#);
    let ul = doc.first_child(root.container()).unwrap();
    let items = doc.children(ul);
    let created = doc.created_count();
    let mutations = doc.mutation_count();

    root.hydrate(
        VNode::element("ul")
            .child(VNode::element("li").attr("class", "x").child("One"))
            .child(VNode::element("li").child("Two")),
    )
    .unwrap();
    runtime.run_microtasks();

    assert_eq!(doc.first_child(root.container()), Some(ul));
    assert_eq!(doc.children(ul), items);
    assert_eq!(doc.created_count(), created);
    assert_eq!(doc.mutation_count(), mutations);
}

#[test]
fn test_components_and_keys_hydrate() {
    let (doc, _runtime, root) = setup("<ol><li>a</li><li>b</li></ol>");
    let ol = doc.first_child(root.container()).unwrap();
    let items = doc.children(ol);
    let list = Component::stateless("List", |props: &Props| {
        let keys: Vec<String> = props
            .str("keys")
            .unwrap_or("")
            .split(',')
            .map(str::to_string)
            .collect();
        Ok(Rendered::new(VNode::element("ol").children(
            keys.into_iter()
                .map(|k| VNode::from(VNode::element("li").key(k.as_str()).child(k))),
        )))
    });

    root.hydrate(VNode::component(&list, Props::new().with("keys", "a,b"))).unwrap();
    assert_eq!(doc.children(ol), items);

    root.render(VNode::component(&list, Props::new().with("keys", "b,a"))).unwrap();
    assert_eq!(doc.children(ol), vec![items[1], items[0]]);
}

#[test]
fn test_blank_text_between_elements_is_dropped() {
    let (doc, _runtime, root) = setup("<ul>\n  <li>1</li>\n</ul>");
    let ul = doc.first_child(root.container()).unwrap();
    let li = doc
        .children(ul)
        .into_iter()
        .find(|&n| doc.is_element(n))
        .unwrap();

    root.hydrate(VNode::element("ul").child(VNode::element("li").child("1"))).unwrap();
    assert_eq!(doc.children(ul), vec![li]);
}

// =============================================================================
// Mismatches
// =============================================================================

#[test]
fn test_text_mismatch_is_overwritten_in_place() {
    let (doc, _runtime, root) = setup("<p>Hello</p>");
    let p = doc.first_child(root.container()).unwrap();
    let text = doc.first_child(p).unwrap();

    root.hydrate(VNode::element("p").child("World")).unwrap();
    assert_eq!(doc.first_child(p), Some(text));
    assert_eq!(doc.text_data(text).as_deref(), Some("World"));
}

#[test]
fn test_tag_mismatch_recreates_the_subtree() {
    let (doc, _runtime, root) = setup("<div><span>a</span><b>keep</b></div>");
    let div = doc.first_child(root.container()).unwrap();
    let span = doc.first_child(div).unwrap();
    let b = doc.last_child(div).unwrap();

    root.hydrate(
        VNode::element("div")
            .child(VNode::element("p").child("a"))
            .child(VNode::element("b").child("keep")),
    )
    .unwrap();
    assert!(!doc.is_connected(span));
    assert_eq!(doc.last_child(div), Some(b));
    assert_eq!(doc.inner_html(div), "<p>a</p><b>keep</b>");
}

#[test]
fn test_unclaimed_nodes_are_removed() {
    let (doc, _runtime, root) =
        setup("<ul><li>1</li><li>2</li><li>3</li></ul><footer>stale</footer>");
    root.hydrate(VNode::element("ul").child(VNode::element("li").child("1"))).unwrap();
    assert_eq!(doc.inner_html(root.container()), "<ul><li>1</li></ul>");
}

#[test]
fn test_missing_nodes_are_created() {
    let (doc, _runtime, root) = setup("<ul><li>1</li></ul>");
    root.hydrate(
        VNode::element("ul")
            .child(VNode::element("li").child("1"))
            .child(VNode::element("li").child("2")),
    )
    .unwrap();
    assert_eq!(doc.inner_html(root.container()), "<ul><li>1</li><li>2</li></ul>");
}

#[test]
fn test_attributes_are_healed() {
    let (doc, _runtime, root) = setup(r#"<a href="/old" data-stale="1">x</a>"#);
    let a = doc.first_child(root.container()).unwrap();

    root.hydrate(VNode::element("a").attr("href", "/new").child("x")).unwrap();
    assert_eq!(doc.first_child(root.container()), Some(a));
    assert_eq!(doc.attribute(a, "href").as_deref(), Some("/new"));
    assert!(!doc.has_attribute(a, "data-stale"));
}

// =============================================================================
// Frames, listeners, presence
// =============================================================================

#[test]
fn test_frame_region_is_claimed_untouched() {
    let html = "<div>a<!--vroot:nav--><nav>server</nav><!--/vroot-->b</div>";
    let (doc, _runtime, root) = setup(html);
    let div = doc.first_child(root.container()).unwrap();
    let nav = doc.children(div)[2];

    root.hydrate(
        VNode::element("div")
            .child("a")
            .child(VNode::frame("nav"))
            .child("b"),
    )
    .unwrap();
    assert_eq!(doc.inner_html(root.container()), html);
    assert!(doc.is_connected(nav));
}

#[test]
fn test_listeners_attach_to_adopted_elements() {
    let (doc, runtime, root) = setup("<button>go</button>");
    let button = doc.first_child(root.container()).unwrap();
    root.hydrate(VNode::element("button").on("click", |_| {}).child("go")).unwrap();
    runtime.run_microtasks();
    assert_eq!(doc.listener_count(button), 1);
}

#[test]
fn test_hydrated_elements_skip_enter_animation() {
    let (doc, runtime, root) = setup("<section><p>x</p></section>");
    let faded = |text: &str| VNode::from(VNode::element("p").presence(Presence::fade()).child(text.to_string()));

    root.hydrate(VNode::element("section").child(faded("x"))).unwrap();
    runtime.run_microtasks();
    assert!(doc.running_animations().is_empty());

    root.render(VNode::element("section").child(faded("x")).child(faded("y"))).unwrap();
    runtime.run_microtasks();
    assert_eq!(doc.running_animations().len(), 1);
}

#[test]
#[should_panic(expected = "invariant violation")]
fn test_hydrating_a_rendered_root_is_an_invariant_violation() {
    let (_doc, _runtime, root) = setup("<p>x</p>");
    root.hydrate(VNode::element("p").child("x")).unwrap();
    let _ = root.hydrate(VNode::element("p").child("x"));
}
