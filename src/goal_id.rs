//! Goal identity: the `GoalID` wire type and its per-client generator.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::{builtin_interfaces::Time, message::Message};

/// Identifies one goal. `id` is unique per (client instance, counter);
/// `stamp` is the time the id was minted.
///
/// `GoalID::default()` (empty id, zero stamp) is the cancel-all wildcard
/// used by `ActionClient::cancel_all_goals`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalID {
  pub id: String,
  pub stamp: Time,
}

impl GoalID {
  pub fn new(id: String, stamp: Time) -> Self {
    GoalID { id, stamp }
  }

  /// The cancel-all-goals wildcard: empty id, zero stamp.
  pub fn cancel_all() -> Self {
    GoalID { id: String::new(), stamp: Time::ZERO }
  }

  /// The cancel-before-stamp wildcard: empty id, given stamp.
  pub fn cancel_before(stamp: Time) -> Self {
    GoalID { id: String::new(), stamp }
  }
}
impl Message for GoalID {}

/// Produces unique goal ids for a single client instance.
///
/// `next_id()` returns `"<node_name>-<counter>-<timestamp>"`, where
/// `counter` is incremented atomically on every call. Safe to share across
/// threads: concurrent callers always get distinct ids.
pub struct GoalIdGenerator {
  node_name: String,
  counter: AtomicU64,
}

impl GoalIdGenerator {
  pub fn new(node_name: impl Into<String>) -> Self {
    GoalIdGenerator {
      node_name: node_name.into(),
      counter: AtomicU64::new(0),
    }
  }

  pub fn next_id(&self) -> GoalID {
    let n = self.counter.fetch_add(1, Ordering::SeqCst);
    let stamp = Time::now();
    let id = format!("{}-{}-{}", self.node_name, n, stamp.nanos_since_epoch);
    GoalID { id, stamp }
  }
}

#[cfg(test)]
mod test {
  use super::GoalIdGenerator;
  use std::collections::HashSet;

  #[test]
  fn ids_are_unique() {
    let gen = GoalIdGenerator::new("tester");
    let mut seen = HashSet::new();
    for _ in 0..500 {
      let id = gen.next_id();
      assert!(seen.insert(id.id), "generator produced a duplicate id");
    }
  }

  #[test]
  fn ids_embed_node_name() {
    let gen = GoalIdGenerator::new("fibonacci_client");
    let id = gen.next_id();
    assert!(id.id.starts_with("fibonacci_client-0-"));
  }
}
