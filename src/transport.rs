//! A minimal in-process pub/sub substrate.
//!
//! The protocol core is written against this module's `Node`/`Publisher`/
//! `Subscription` as its only notion of "the messaging substrate" — exactly
//! the primitives called out as out of scope for the core itself: creating
//! a named publisher, creating a named subscriber with a callback,
//! publishing a message, querying peer counts, and querying the time. A
//! real deployment would swap this module for one backed by an actual
//! transport; nothing above this layer would change.
//!
//! Payloads cross the wire as JSON (`serde_json`), so messages really are
//! serialized and deserialized on every publish, not just passed by
//! reference.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock},
  time::Duration,
};

#[allow(unused_imports)]
use log::{debug, error, warn};

use crate::{builtin_interfaces::Time, message::Message};

type RawCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

#[derive(Default)]
struct TopicState {
  publisher_count: usize,
  subscriber_count: usize,
  subscribers: Vec<RawCallback>,
}

#[derive(Default)]
struct Broker {
  topics: RwLock<HashMap<String, TopicState>>,
}

impl Broker {
  fn register_publisher(&self, topic: &str) {
    let mut topics = self.topics.write().expect("broker lock poisoned");
    topics.entry(topic.to_owned()).or_default().publisher_count += 1;
  }

  fn register_subscriber(&self, topic: &str, callback: RawCallback) {
    let mut topics = self.topics.write().expect("broker lock poisoned");
    let state = topics.entry(topic.to_owned()).or_default();
    state.subscriber_count += 1;
    state.subscribers.push(callback);
  }

  fn publisher_count(&self, topic: &str) -> usize {
    self
      .topics
      .read()
      .expect("broker lock poisoned")
      .get(topic)
      .map_or(0, |s| s.publisher_count)
  }

  fn subscriber_count(&self, topic: &str) -> usize {
    self
      .topics
      .read()
      .expect("broker lock poisoned")
      .get(topic)
      .map_or(0, |s| s.subscriber_count)
  }

  fn publish(&self, topic: &str, bytes: &[u8]) {
    // Snapshot the callback list under the read lock, then release it
    // before invoking anything: user callbacks must never run while a
    // broker lock is held.
    let callbacks: Vec<RawCallback> = {
      let topics = self.topics.read().expect("broker lock poisoned");
      topics.get(topic).map_or_else(Vec::new, |s| s.subscribers.clone())
    };
    for cb in callbacks {
      cb(bytes);
    }
  }
}

/// A process-wide (or test-scoped) messaging domain. Cheap to clone; all
/// clones and all `Node`s created from it share the same topic registry.
#[derive(Clone, Default)]
pub struct Context {
  broker: Arc<Broker>,
}

impl Context {
  pub fn new() -> Self {
    Context::default()
  }

  pub fn new_node(&self, name: impl Into<String>) -> Node {
    Node { name: name.into(), broker: self.broker.clone() }
  }
}

/// A named participant in the messaging domain: the factory for typed
/// publishers and subscriptions.
#[derive(Clone)]
pub struct Node {
  name: String,
  broker: Arc<Broker>,
}

impl Node {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn create_publisher<M: Message>(&self, topic: &str) -> Publisher<M> {
    self.broker.register_publisher(topic);
    Publisher { broker: self.broker.clone(), topic: topic.to_owned(), _marker: std::marker::PhantomData }
  }

  pub fn create_subscription<M, F>(&self, topic: &str, callback: F) -> Subscription<M>
  where
    M: Message + 'static,
    F: Fn(M) + Send + Sync + 'static,
  {
    let wrapped: RawCallback = Arc::new(move |bytes: &[u8]| match serde_json::from_slice::<M>(bytes) {
      Ok(msg) => callback(msg),
      Err(e) => warn!("dropping malformed message on {topic}: {e}"),
    });
    self.broker.register_subscriber(topic, wrapped);
    Subscription { broker: self.broker.clone(), topic: topic.to_owned(), _marker: std::marker::PhantomData }
  }

  /// The current time, as seen by this node. A real substrate might offer
  /// simulation time here; this one always reads the system clock.
  pub fn now(&self) -> Time {
    Time::now()
  }
}

/// A typed handle to publish on one topic.
pub struct Publisher<M: Message> {
  broker: Arc<Broker>,
  topic: String,
  _marker: std::marker::PhantomData<M>,
}

impl<M: Message> Publisher<M> {
  pub fn topic(&self) -> &str {
    &self.topic
  }

  pub fn publish(&self, message: &M) {
    match serde_json::to_vec(message) {
      Ok(bytes) => self.broker.publish(&self.topic, &bytes),
      Err(e) => error!("failed to serialize message for {}: {e}", self.topic),
    }
  }

  /// Number of live subscriptions on this topic.
  pub fn peer_count(&self) -> usize {
    self.broker.subscriber_count(&self.topic)
  }
}

/// A typed handle representing one registered subscription.
pub struct Subscription<M: Message> {
  broker: Arc<Broker>,
  topic: String,
  _marker: std::marker::PhantomData<M>,
}

impl<M: Message> Subscription<M> {
  pub fn topic(&self) -> &str {
    &self.topic
  }

  /// Number of live publishers on this topic.
  pub fn peer_count(&self) -> usize {
    self.broker.publisher_count(&self.topic)
  }
}

/// Block the calling thread until `peer_ready` reports `true` or `timeout`
/// elapses, polling on a fixed small interval. Returns whether it was ready.
pub(crate) fn poll_until_ready(timeout: Duration, mut peer_ready: impl FnMut() -> bool) -> bool {
  const POLL_INTERVAL: Duration = Duration::from_millis(20);
  let deadline = std::time::Instant::now() + timeout;
  loop {
    if peer_ready() {
      return true;
    }
    if std::time::Instant::now() >= deadline {
      return false;
    }
    std::thread::sleep(POLL_INTERVAL.min(deadline - std::time::Instant::now()));
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn publish_reaches_subscriber() {
    let ctx = Context::new();
    let node = ctx.new_node("tester");
    let received = Arc::new(AtomicUsize::new(0));
    let r2 = received.clone();
    let _sub: Subscription<i32> = node.create_subscription("topic/x", move |v: i32| {
      r2.fetch_add(v as usize, Ordering::SeqCst);
    });
    let pub_: Publisher<i32> = node.create_publisher("topic/x");
    assert_eq!(pub_.peer_count(), 1);
    pub_.publish(&41);
    pub_.publish(&1);
    assert_eq!(received.load(Ordering::SeqCst), 42);
  }

  #[test]
  fn peer_counts_cross_nodes() {
    let ctx = Context::new();
    let a = ctx.new_node("a");
    let b = ctx.new_node("b");
    let sub: Subscription<String> = b.create_subscription("topic/y", |_s: String| {});
    let pub_: Publisher<String> = a.create_publisher("topic/y");
    assert_eq!(pub_.peer_count(), 1);
    assert_eq!(sub.peer_count(), 1);
  }
}
