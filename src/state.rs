//! Named state targets and remote links between them.
//!
//! A target is a [`SimpleStore`] created on first access and kept until
//! [`StateController::remove`]. Two targets can be linked on one action: each
//! side forwards its writes to the other under its own committer, and drops
//! changes that carry the other side's committer, so a write crosses the
//! link once.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::connection::Subscription;
use crate::pubsub::Token;
use crate::store::{Bus, Change, Committer, ReactiveStore, SimpleStore};
use crate::value::Value;

struct RemoteLink {
    a: String,
    b: String,
    action: String,
    // Cancelled on drop.
    _forward: Subscription,
    _backward: Subscription,
}

impl RemoteLink {
    fn joins(&self, a: &str, b: &str, action: &str) -> bool {
        self.action == action && ((self.a == a && self.b == b) || (self.a == b && self.b == a))
    }

    fn touches(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }
}

/// Registry of state targets keyed by an arbitrary id.
pub struct StateController {
    bus: Bus,
    targets: RefCell<BTreeMap<String, Rc<SimpleStore>>>,
    links: RefCell<Vec<RemoteLink>>,
}

impl StateController {
    pub fn new(bus: &Bus) -> Self {
        Self {
            bus: bus.clone(),
            targets: RefCell::new(BTreeMap::new()),
            links: RefCell::new(Vec::new()),
        }
    }

    /// The target for `id`, created empty on first access.
    pub fn get_target(&self, id: &str) -> Rc<SimpleStore> {
        if let Some(target) = self.targets.borrow().get(id) {
            return Rc::clone(target);
        }
        let target = SimpleStore::new(&self.bus);
        tracing::debug!(id, store = %target.id(), "state target created");
        self.targets
            .borrow_mut()
            .insert(id.to_owned(), Rc::clone(&target));
        target
    }

    pub fn has_target(&self, id: &str) -> bool {
        self.targets.borrow().contains_key(id)
    }

    /// Ids of all live targets, sorted.
    pub fn target_ids(&self) -> Vec<String> {
        self.targets.borrow().keys().cloned().collect()
    }

    /// Declare `action` on target `id`. Returns whether it was new.
    pub fn add_action(&self, id: &str, action: &str, initial: Value) -> bool {
        self.get_target(id).add_action(action, initial)
    }

    pub fn on(&self, id: &str, action: &str, callback: impl Fn(&Change) + 'static) -> Token {
        self.get_target(id).on(action, Box::new(callback))
    }

    /// Returns `false` if no target `id` exists.
    pub fn off(&self, id: &str, action: &str, token: Token) -> bool {
        let target = self.targets.borrow().get(id).cloned();
        match target {
            Some(target) => {
                target.off(action, token);
                true
            }
            None => false,
        }
    }

    /// Drop target `id` and every remote link touching it.
    pub fn remove(&self, id: &str) -> bool {
        self.unlink_all(id);
        let removed = self.targets.borrow_mut().remove(id).is_some();
        if removed {
            tracing::debug!(id, "state target removed");
        }
        removed
    }

    /// Keep `action` equal on targets `a` and `b`. Both targets are created
    /// if needed. Returns `false` for a self-link or an existing link.
    pub fn link_remote(&self, a: &str, b: &str, action: &str) -> bool {
        if a == b || self.is_linked(a, b, action) {
            return false;
        }
        let first = self.get_target(a);
        let second = self.get_target(b);

        let forward = Subscription::open(
            &self.bus,
            first.topic(action),
            relay(&second, second.committer(), first.committer(), action),
        );
        let backward = Subscription::open(
            &self.bus,
            second.topic(action),
            relay(&first, first.committer(), second.committer(), action),
        );

        tracing::debug!(a, b, action, "remote link");
        self.links.borrow_mut().push(RemoteLink {
            a: a.to_owned(),
            b: b.to_owned(),
            action: action.to_owned(),
            _forward: forward,
            _backward: backward,
        });
        true
    }

    pub fn is_linked(&self, a: &str, b: &str, action: &str) -> bool {
        self.links.borrow().iter().any(|link| link.joins(a, b, action))
    }

    /// Remove the link between `a` and `b` on `action`, in either direction.
    pub fn unlink_remote(&self, a: &str, b: &str, action: &str) -> bool {
        let removed: Vec<RemoteLink> = {
            let mut links = self.links.borrow_mut();
            let (gone, kept): (Vec<RemoteLink>, Vec<RemoteLink>) = std::mem::take(&mut *links)
                .into_iter()
                .partition(|link| link.joins(a, b, action));
            *links = kept;
            gone
        };
        !removed.is_empty()
    }

    /// Remove every link touching target `id`. Returns how many were removed.
    pub fn unlink_all(&self, id: &str) -> usize {
        let removed: Vec<RemoteLink> = {
            let mut links = self.links.borrow_mut();
            let (gone, kept): (Vec<RemoteLink>, Vec<RemoteLink>) = std::mem::take(&mut *links)
                .into_iter()
                .partition(|link| link.touches(id));
            *links = kept;
            gone
        };
        if !removed.is_empty() {
            tracing::debug!(id, removed = removed.len(), "remote links removed");
        }
        removed.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.borrow().len()
    }
}

/// Forward changes into `to` under `sender`, ignoring changes `to` itself
/// forwarded (those carry `echo`).
fn relay(
    to: &Rc<SimpleStore>,
    echo: Committer,
    sender: Committer,
    action: &str,
) -> impl Fn(&Change) + 'static {
    let to: Weak<SimpleStore> = Rc::downgrade(to);
    let action = action.to_owned();
    move |change: &Change| {
        if change.is_from(echo) {
            tracing::trace!(action = %action, "remote echo skipped");
            return;
        }
        let Some(to) = to.upgrade() else {
            return;
        };
        match &change.value {
            Some(value) => to.set(&action, value.clone(), Some(sender)),
            None => to.delete(Some(&action)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;

    fn counter(state: &StateController, id: &str, action: &str) -> Rc<Cell<u32>> {
        let hits = Rc::new(Cell::new(0));
        let hits_c = hits.clone();
        state.on(id, action, move |_| hits_c.set(hits_c.get() + 1));
        hits
    }

    #[test]
    fn targets_are_lazy_and_stable() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        assert!(!state.has_target("menu"));
        let first = state.get_target("menu");
        let again = state.get_target("menu");
        assert!(Rc::ptr_eq(&first, &again));
        state.get_target("dialog");
        assert_eq!(state.target_ids(), vec!["dialog", "menu"]);
    }

    #[test]
    fn actions_and_listeners_delegate() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        assert!(state.add_action("menu", "open", json!(false)));
        assert!(!state.add_action("menu", "open", json!(true)));
        let hits = Rc::new(Cell::new(0));
        let hits_c = hits.clone();
        let token = state.on("menu", "open", move |_| hits_c.set(hits_c.get() + 1));
        state.get_target("menu").toggle("open", None);
        assert_eq!(state.get_target("menu").get(Some("open")), Some(json!(true)));
        assert!(state.off("menu", "open", token));
        state.get_target("menu").toggle("open", None);
        assert_eq!(hits.get(), 1);
        assert!(!state.off("missing", "open", token));
    }

    #[test]
    fn remote_link_propagates_once_each_way() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        assert!(state.link_remote("a", "b", "tab"));
        let on_a = counter(&state, "a", "tab");
        let on_b = counter(&state, "b", "tab");

        state.get_target("a").set("tab", json!("home"), None);
        assert_eq!(state.get_target("b").get(Some("tab")), Some(json!("home")));
        assert_eq!((on_a.get(), on_b.get()), (1, 1));

        state.get_target("b").set("tab", json!("about"), None);
        assert_eq!(state.get_target("a").get(Some("tab")), Some(json!("about")));
        assert_eq!((on_a.get(), on_b.get()), (2, 2));
    }

    #[test]
    fn remote_link_forwards_deletes() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        state.link_remote("a", "b", "tab");
        state.get_target("a").set("tab", json!(1), None);
        state.get_target("b").delete(Some("tab"));
        assert_eq!(state.get_target("a").get(Some("tab")), None);
    }

    #[test]
    fn only_the_linked_action_crosses() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        state.link_remote("a", "b", "tab");
        state.get_target("a").set("other", json!(1), None);
        assert_eq!(state.get_target("b").get(Some("other")), None);
    }

    #[test]
    fn duplicate_and_self_links_are_refused() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        assert!(!state.link_remote("a", "a", "tab"));
        assert!(state.link_remote("a", "b", "tab"));
        assert!(!state.link_remote("b", "a", "tab"));
        assert!(state.link_remote("a", "b", "open"));
        assert_eq!(state.link_count(), 2);
    }

    #[test]
    fn unlink_removes_only_link_subscriptions() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        let own = counter(&state, "a", "tab");
        state.link_remote("a", "b", "tab");
        state.link_remote("a", "c", "tab");

        assert!(state.unlink_remote("b", "a", "tab"));
        assert!(!state.unlink_remote("a", "b", "tab"));
        state.get_target("a").set("tab", json!("x"), None);
        assert_eq!(state.get_target("b").get(Some("tab")), None);
        assert_eq!(state.get_target("c").get(Some("tab")), Some(json!("x")));
        assert_eq!(own.get(), 1);

        assert_eq!(state.unlink_all("a"), 1);
        assert_eq!(state.link_count(), 0);
        assert!(state.has_target("a"));
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn remove_drops_target_and_links() {
        let bus = Bus::new();
        let state = StateController::new(&bus);
        state.link_remote("a", "b", "tab");
        assert!(state.remove("a"));
        assert!(!state.remove("a"));
        assert_eq!(state.link_count(), 0);
        assert!(state.has_target("b"));
        state.get_target("b").set("tab", json!(1), None);
        assert_eq!(state.get_target("a").get(Some("tab")), None);
    }
}
