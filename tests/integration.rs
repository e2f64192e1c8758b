//! Integration tests for gilt-bind.
//!
//! These tests exercise the public API from outside the crate: stores, the
//! binder, the layout builder and the state controller working together on
//! a headless app.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gilt_bind::app::{App, AppConfig};
use gilt_bind::dom::{NodeId, RenderTarget};
use gilt_bind::layout::{Layout, Rendered};
use gilt_bind::store::{Change, DataStore, ReactiveStore, Store, StoreRef};
use gilt_bind::testing::Pilot;
use gilt_bind::value::{display, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn counter(store: &dyn ReactiveStore, path: &str) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let hits_c = hits.clone();
    store.on(path, Box::new(move |_: &Change| hits_c.set(hits_c.get() + 1)));
    hits
}

fn recorder(store: &dyn ReactiveStore, path: &str) -> Rc<RefCell<Vec<Option<Value>>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_c = seen.clone();
    store.on(
        path,
        Box::new(move |change: &Change| seen_c.borrow_mut().push(change.value.clone())),
    );
    seen
}

fn mount_input(app: &App, store: &StoreRef, path: &str, value: Option<&str>) -> NodeId {
    let mut layout = Layout::new("input").bind(path);
    if let Some(value) = value {
        layout = layout.attr("value", value);
    }
    app.mount(&layout, &app.context().with_data(store))
}

// ---------------------------------------------------------------------------
// Two-way binding
// ---------------------------------------------------------------------------

#[test]
fn test_no_reentrant_bind_loop_shallow() {
    let app = App::new();
    let store = app.store();
    let data: StoreRef = store.clone();
    let node = mount_input(&app, &data, "name", None);
    let hits = counter(store.as_ref(), "name");

    store.set("name", json!("v1"), None);
    assert_eq!(app.target().get_attribute(node, "value"), Some(json!("v1")));
    assert_eq!(hits.get(), 1);

    // Node-originated change to the same value: the store write is an
    // idempotent scalar set and publishes nothing.
    app.target().input(node, "value", json!("v1"));
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_no_reentrant_bind_loop_deep() {
    let app = App::new();
    let store = app.data_store();
    let data: StoreRef = store.clone();
    let node = mount_input(&app, &data, "user.name", None);
    let hits = counter(store.as_ref(), "user.name");

    store.set("user.name", json!("v1"), None);
    assert_eq!(hits.get(), 1);

    // Deep stores always publish: exactly one more hop, then the committer
    // check stops the echo toward the node.
    app.target().input(node, "value", json!("v1"));
    assert_eq!(hits.get(), 2);
    assert!(store.is_dirty());
}

#[test]
fn test_first_bind_store_adopts_node_value() {
    let app = App::new();
    let store = app.store();
    let data: StoreRef = store.clone();
    mount_input(&app, &data, "email", Some("typed@x"));
    assert_eq!(store.get(Some("email")), Some(json!("typed@x")));
}

#[test]
fn test_first_bind_node_adopts_store_value() {
    let app = App::new();
    let store = app.store();
    store.set("email", json!("stored@x"), None);
    let data: StoreRef = store.clone();
    let node = mount_input(&app, &data, "email", None);
    assert_eq!(app.target().get_attribute(node, "value"), Some(json!("stored@x")));
}

#[test]
fn test_first_bind_store_wins_when_both_have_data() {
    let app = App::new();
    let store = app.store();
    store.set("email", json!("stored@x"), None);
    let data: StoreRef = store.clone();
    let node = mount_input(&app, &data, "email", Some("typed@x"));
    assert_eq!(app.target().get_attribute(node, "value"), Some(json!("stored@x")));
    assert_eq!(store.get(Some("email")), Some(json!("stored@x")));
}

#[test]
fn test_filtered_bind_renders_template() {
    let app = App::new();
    let store: StoreRef = app.data_store();
    store.set("total", json!(12), None);
    let node = app.mount(
        &Layout::new("span").bind_filtered("total", "Total: [[value]]"),
        &app.context().with_data(&store),
    );
    assert_eq!(app.target().text(node), "Total: 12");
    store.set("total", json!(13), None);
    assert_eq!(app.target().text(node), "Total: 13");
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[test]
fn test_idempotent_scalar_set() {
    let app = App::new();
    let store = app.store();
    let hits = counter(store.as_ref(), "p");
    store.set("p", json!(5), None);
    store.set("p", json!(5), None);
    assert_eq!(hits.get(), 1);
    // Composite values always publish.
    store.set("q", json!([1]), None);
    let q_hits = counter(store.as_ref(), "q");
    store.set("q", json!([1]), None);
    assert_eq!(q_hits.get(), 1);
}

#[test]
fn test_deep_publish_completeness() {
    let app = App::new();
    let store = app.data_store();
    let user = recorder(store.as_ref(), "user");
    let name = recorder(store.as_ref(), "user.name");
    let tags = recorder(store.as_ref(), "user.tags");
    let first = recorder(store.as_ref(), "user.tags[0]");
    let second = recorder(store.as_ref(), "user.tags[1]");

    store.set("user", json!({"name": "a", "tags": ["x", "y"]}), None);

    assert_eq!(*user.borrow(), vec![Some(json!({"name": "a", "tags": ["x", "y"]}))]);
    assert_eq!(*name.borrow(), vec![Some(json!("a"))]);
    assert_eq!(*tags.borrow(), vec![Some(json!(["x", "y"]))]);
    assert_eq!(*first.borrow(), vec![Some(json!("x"))]);
    assert_eq!(*second.borrow(), vec![Some(json!("y"))]);
}

#[test]
fn test_replacing_a_parent_updates_nodes_bound_below_it() {
    let app = App::new();
    let store = app.data_store();
    let data: StoreRef = store.clone();
    let node = mount_input(&app, &data, "user.name", None);

    store.set("user", json!({"name": "Grace", "age": 36}), None);
    assert_eq!(app.target().get_attribute(node, "value"), Some(json!("Grace")));

    store.set("user", json!({"name": "Ada"}), None);
    assert_eq!(app.target().get_attribute(node, "value"), Some(json!("Ada")));

    // The bound key vanished with the replacement.
    store.set("user", json!({"age": 3}), None);
    assert_eq!(app.target().get_attribute(node, "value"), Some(json!("")));
}

#[test]
fn test_indexed_placeholder_watch_follows_array_writes() {
    let app = App::new();
    let store: StoreRef = app.data_store();
    let node = app.mount(
        &Layout::new("p").watch("first: [[tags[0]]]", "text"),
        &app.context().with_data(&store),
    );
    store.set("tags", json!(["x", "y"]), None);
    assert_eq!(app.target().text(node), "first: x");
    store.set("tags[0]", json!("z"), None);
    assert_eq!(app.target().text(node), "first: z");
}

#[test]
fn test_two_nodes_bound_to_one_path_coexist() {
    let app = App::new();
    let store = app.data_store();
    let data: StoreRef = store.clone();
    let first = mount_input(&app, &data, "shared", None);
    let second = mount_input(&app, &data, "shared", None);
    let hits = counter(store.as_ref(), "shared");

    // One store publish reaches the other node; nothing is re-announced.
    app.target().input(first, "value", json!("typed"));
    assert_eq!(hits.get(), 1);
    assert_eq!(app.target().get_attribute(second, "value"), Some(json!("typed")));
    assert_eq!(app.target().get_attribute(first, "value"), Some(json!("typed")));

    app.target().input(second, "value", json!("edited"));
    assert_eq!(hits.get(), 2);
    assert_eq!(app.target().get_attribute(first, "value"), Some(json!("edited")));
    assert_eq!(store.get(Some("shared")), Some(json!("edited")));
}

#[test]
fn test_revert_round_trip() {
    let app = App::new();
    let store = app.data_store();
    let committer = gilt_bind::store::Committer::new(app.bus());
    store.set("a", json!(1), None);
    store.set("a", json!(2), Some(committer));
    assert_eq!(store.get(Some("a")), Some(json!(2)));
    store.revert();
    assert_eq!(store.get(Some("a")), Some(json!(1)));
    assert!(!store.is_dirty());
}

#[test]
fn test_stores_share_a_bus_without_collisions() {
    let app = App::new();
    let first = app.store();
    let second = app.store();
    let hits = counter(second.as_ref(), "x");
    first.set("x", json!(1), None);
    assert_eq!(hits.get(), 0);
    assert_ne!(first.id(), second.id());
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn test_teardown_completeness() {
    let app = App::new();
    let store = app.data_store();
    let data: StoreRef = store.clone();
    let node = mount_input(&app, &data, "a", None);

    let watched = Rc::new(Cell::new(0));
    for path in ["b", "c"] {
        let watched = watched.clone();
        app.binder()
            .watch(node, &data, path, move |_| watched.set(watched.get() + 1));
    }
    assert_eq!(app.binder().connection_count(node), 3);
    let topics: Vec<String> = ["a", "b", "c"].iter().map(|p| data.topic(p)).collect();
    assert!(topics.iter().all(|t| app.bus().subscriber_count(t) > 0));

    assert!(app.unmount(node));
    assert!(app.binder().is_empty());
    assert!(topics.iter().all(|t| app.bus().subscriber_count(t) == 0));

    store.set("a", json!(1), None);
    store.set("b", json!(1), None);
    store.set("c", json!(1), None);
    assert_eq!(watched.get(), 0);
}

#[test]
fn test_removing_a_parent_releases_descendants() {
    let app = App::new();
    let store: StoreRef = app.data_store();
    let form = app.mount(
        &Layout::new("form")
            .child(Layout::new("input").bind("a"))
            .child(Layout::new("p").watch("[[b]]", "text")),
        &app.context().with_data(&store),
    );
    assert_eq!(app.binder().len(), 2);
    app.unmount(form);
    assert!(app.binder().is_empty());
    assert_eq!(app.bus().topic_count(), 0);
}

// ---------------------------------------------------------------------------
// Layout builder
// ---------------------------------------------------------------------------

fn view_switcher(builds: Rc<Cell<u32>>) -> Layout {
    Layout::new("main").on_state_render("view", move |value| {
        builds.set(builds.get() + 1);
        Rendered::from(Layout::new("section").attr("text", display(value)))
    })
}

#[test]
fn test_rebuild_reuses_cached_subtree_when_persistent() {
    let app = App::with_config(AppConfig::new().with_persist(true));
    let state: StoreRef = app.states().get_target("nav");
    state.set("view", json!("home"), None);
    let builds = Rc::new(Cell::new(0));
    let main = app.mount(&view_switcher(builds.clone()), &app.context().with_state(&state));
    let home = app.target().children(main);

    state.set("view", json!("about"), None);
    state.set("view", json!("home"), None);
    assert_eq!(app.target().children(main), home);
    state.set("view", json!("home"), None);
    assert_eq!(app.target().children(main), home);
    assert_eq!(builds.get(), 2);
}

#[test]
fn test_rebuild_constructs_fresh_subtree_otherwise() {
    let app = App::new();
    let state: StoreRef = app.states().get_target("nav");
    state.set("view", json!("home"), None);
    let builds = Rc::new(Cell::new(0));
    let main = app.mount(&view_switcher(builds.clone()), &app.context().with_state(&state));
    let home = app.target().children(main);

    state.set("view", json!("about"), None);
    state.set("view", json!("home"), None);
    let again = app.target().children(main);
    assert_ne!(again, home);
    assert!(!app.target().contains(home[0]));
    assert_eq!(builds.get(), 3);
}

#[test]
fn test_unresolved_directive_leaves_rest_of_tree_working() {
    let app = App::new();
    let store: StoreRef = app.data_store();
    store.set("name", json!("Ada"), None);
    let root = app.mount(
        &Layout::new("div")
            .child(Layout::new("p").bind_to(&store, "name"))
            .child(Layout::new("aside").on_state_classes("tab", [("x", "on")])),
        &app.context(),
    );
    let children = app.target().children(root);
    assert_eq!(children.len(), 2);
    assert_eq!(app.target().text(children[0]), "Ada");
    assert_eq!(app.binder().connection_count(children[1]), 0);
}

#[test]
fn test_json_layout_end_to_end() {
    let pilot = Pilot::new();
    let app = pilot.app();
    let store: StoreRef = app.data_store();
    store.set("user", json!({"name": "Ada", "email": "ada@x"}), None);

    let layout = Layout::parse(&json!({
        "tag": "form",
        "class": "signup",
        "children": [
            {"tag": "input", "type": "email", "bind": "user.email"},
            {"tag": "p", "watch": "Hi [[user.name]]"}
        ]
    }))
    .unwrap();
    app.mount(&layout, &app.context().with_data(&store));

    let input = app.find("type", "email").unwrap();
    assert!(pilot.set_value(input, "new@x"));
    assert_eq!(store.get(Some("user.email")), Some(json!("new@x")));
    store.set("user.name", json!("Grace"), None);

    insta::assert_snapshot!(pilot.snapshot(), @r#"
    <root>
      <form class="signup">
        <input type="email" value="new@x">
        <p text="Hi Grace">
    "#);
}

// ---------------------------------------------------------------------------
// State controller
// ---------------------------------------------------------------------------

#[test]
fn test_remote_state_symmetry() {
    let app = App::new();
    let states = app.states();
    assert!(states.link_remote("a", "b", "x"));
    let a = states.get_target("a");
    let b = states.get_target("b");
    let on_a = counter(a.as_ref(), "x");
    let on_b = counter(b.as_ref(), "x");

    a.set("x", json!("v"), None);
    assert_eq!(b.get(Some("x")), Some(json!("v")));
    assert_eq!(on_b.get(), 1);
    assert_eq!(on_a.get(), 1);
}

#[test]
fn test_state_classes_follow_shared_target() {
    let app = App::new();
    let tabs: StoreRef = app.states().get_target("tabs");
    let nav = app.mount(
        &Layout::new("nav").on_state_classes("current", [("home", "at-home"), ("docs", "at-docs")]),
        &app.context().with_state(&tabs),
    );
    tabs.set("current", json!("docs"), None);
    assert!(app.target().has_class(nav, "at-docs"));
    assert!(!app.target().has_class(nav, "at-home"));
}

// ---------------------------------------------------------------------------
// Deep store with store-level listeners
// ---------------------------------------------------------------------------

#[test]
fn test_shallow_wildcard_listener_sees_every_key() {
    let app = App::new();
    let store: Rc<Store> = app.store();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_c = seen.clone();
    store.on_any(Box::new(move |change: &Change| {
        seen_c.borrow_mut().push(change.path.clone())
    }));
    store.set("a", json!(1), None);
    store.set("b", json!(2), None);
    assert_eq!(*seen.borrow(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_get_all_merges_staged_writes() {
    let app = App::new();
    let store: Rc<DataStore> = app.data_store();
    let committer = gilt_bind::store::Committer::new(app.bus());
    store.set("a", json!({"x": 1}), None);
    store.set("a.y", json!(2), Some(committer));
    assert_eq!(store.get(None), Some(json!({"a": {"x": 1, "y": 2}})));
    assert_eq!(store.committed(), json!({"a": {"x": 1}}));
}

#[cfg(feature = "macros")]
#[test]
fn test_layout_macro() {
    let layout = gilt_bind::layout! {
        <form class="signup">
            <input type="email" bind="email" />
            "Thanks"
        </form>
    };
    assert_eq!(layout.tag, "form");
    assert_eq!(layout.children.len(), 2);
    assert_eq!(layout.live_children().next().map(|c| c.directive_names()), Some(vec!["bind"]));
}
