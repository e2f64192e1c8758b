//! Token-addressed publish/subscribe bus.
//!
//! [`PubSub`] maps topic strings to ordered subscriber lists. Subscribing
//! returns a [`Token`] used only for removal; dispatch order is subscription
//! order. The bus is single-threaded and synchronous: `publish` runs every
//! subscriber to completion before returning, and a subscriber may publish,
//! subscribe or unsubscribe (on any topic) while it runs.
//!
//! The bus also hands out monotonic ids ([`PubSub::allocate_id`]) so that
//! everything sharing a bus (stores, binding endpoints, bound nodes) draws
//! identities from one space.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Subscription handle, unique per bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    pub fn get(self) -> u64 {
        self.0
    }
}

type Callback<M> = Rc<dyn Fn(&M)>;

struct Subscriber<M> {
    token: Token,
    callback: Callback<M>,
}

struct Registry<M> {
    topics: HashMap<String, Vec<Subscriber<M>>>,
    next_token: u64,
    next_id: u64,
}

impl<M> Registry<M> {
    fn new() -> Self {
        Self {
            topics: HashMap::new(),
            next_token: 1,
            next_id: 1,
        }
    }

    fn contains(&self, topic: &str, token: Token) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|subs| subs.iter().any(|s| s.token == token))
    }
}

/// A message bus carrying `M` payloads. Cloning yields another handle to the
/// same registry.
pub struct PubSub<M: 'static> {
    registry: Rc<RefCell<Registry<M>>>,
}

impl<M: 'static> PubSub<M> {
    /// Create an empty, independent bus.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry::new())),
        }
    }

    /// Add a subscriber to `topic`, creating the topic on demand.
    pub fn subscribe(&self, topic: impl Into<String>, callback: impl Fn(&M) + 'static) -> Token {
        let mut registry = self.registry.borrow_mut();
        let token = Token(registry.next_token);
        registry.next_token += 1;
        registry
            .topics
            .entry(topic.into())
            .or_default()
            .push(Subscriber {
                token,
                callback: Rc::new(callback),
            });
        token
    }

    /// Remove a subscriber. Returns whether anything was removed; unknown
    /// topics and tokens are a no-op.
    pub fn unsubscribe(&self, topic: &str, token: Token) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(subs) = registry.topics.get_mut(topic) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.token != token);
        let removed = subs.len() != before;
        if subs.is_empty() {
            registry.topics.remove(topic);
        }
        removed
    }

    /// Deliver `message` to every subscriber of `topic`, in subscription order.
    ///
    /// Dispatch walks a snapshot of the subscriber list. Entries removed while
    /// dispatch is in progress are skipped; entries added are not reached by
    /// this publish. Publishing to an unknown topic delivers nothing.
    ///
    /// Returns the number of subscribers invoked.
    pub fn publish(&self, topic: &str, message: &M) -> usize {
        let snapshot: Vec<(Token, Callback<M>)> = {
            let registry = self.registry.borrow();
            match registry.topics.get(topic) {
                Some(subs) => subs
                    .iter()
                    .map(|s| (s.token, Rc::clone(&s.callback)))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (token, callback) in snapshot {
            if !self.registry.borrow().contains(topic, token) {
                continue;
            }
            callback(message);
            delivered += 1;
        }
        tracing::trace!(topic, delivered, "publish");
        delivered
    }

    /// Whether `token` is still subscribed to `topic`.
    pub fn is_subscribed(&self, topic: &str, token: Token) -> bool {
        self.registry.borrow().contains(topic, token)
    }

    /// Number of subscribers currently on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .borrow()
            .topics
            .get(topic)
            .map_or(0, Vec::len)
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.registry.borrow().topics.contains_key(topic)
    }

    /// Drop a topic and all its subscribers. Returns how many were dropped.
    pub fn remove_topic(&self, topic: &str) -> usize {
        self.registry
            .borrow_mut()
            .topics
            .remove(topic)
            .map_or(0, |subs| subs.len())
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.registry.borrow().topics.len()
    }

    /// Hand out the next id from this bus's monotonic id space.
    pub fn allocate_id(&self) -> u64 {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        id
    }

    /// Whether two handles share one registry.
    pub fn same_bus(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }
}

impl<M: 'static> Clone for PubSub<M> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<M: 'static> Default for PubSub<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: 'static> fmt::Debug for PubSub<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSub")
            .field("topics", &self.topic_count())
            .finish()
    }
}
