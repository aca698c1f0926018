//! Node-level object owning one action's client-side pub/sub endpoints and
//! the set of live goal handles.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock, Weak},
  time::Duration,
};

#[allow(unused_imports)]
use log::{debug, warn};

use crate::{
  action_types::ActionTypes,
  builtin_interfaces::Time,
  client_handle::ClientGoalHandle,
  envelope::{ActionFeedback, ActionGoal, ActionResult},
  goal_id::{GoalID, GoalIdGenerator},
  status::{Header, StatusArray},
  transport::{poll_until_ready, Node, Publisher},
};

struct ActionClientInner<A: ActionTypes> {
  node: Node,
  goal_publisher: Arc<Publisher<ActionGoal<A::GoalType>>>,
  cancel_publisher: Arc<Publisher<GoalID>>,
  #[allow(dead_code)]
  status_subscription: crate::transport::Subscription<StatusArray>,
  #[allow(dead_code)]
  feedback_subscription: crate::transport::Subscription<ActionFeedback<A::FeedbackType>>,
  #[allow(dead_code)]
  result_subscription: crate::transport::Subscription<ActionResult<A::ResultType>>,
  handles: RwLock<HashMap<String, Arc<ClientGoalHandle<A>>>>,
  goal_ids: GoalIdGenerator,
  last_status_peer_count: RwLock<usize>,
}

impl<A: ActionTypes> ActionClientInner<A> {
  fn on_status_array(&self, status_array: StatusArray) {
    let current_peers = self.status_subscription.peer_count();
    let mut last = self.last_status_peer_count.write().expect("lock poisoned");
    if *last != current_peers {
      if *last != 0 {
        warn!(
          "status publisher peer count changed {} -> {} (possible server failover)",
          *last, current_peers
        );
      }
      *last = current_peers;
    }
    drop(last);

    let handles = self.handles.read().expect("lock poisoned");
    for (id, handle) in handles.iter() {
      match status_array.find(id) {
        Some(status) => handle.deliver_status(status),
        None => handle.deliver_lost(),
      }
    }
  }

  fn on_feedback(&self, feedback: ActionFeedback<A::FeedbackType>) {
    let handles = self.handles.read().expect("lock poisoned");
    for handle in handles.values() {
      handle.deliver_feedback(&feedback);
    }
  }

  fn on_result(&self, result: ActionResult<A::ResultType>) {
    let handles = self.handles.read().expect("lock poisoned");
    for handle in handles.values() {
      handle.deliver_result(&result);
    }
  }
}

/// The client side of one action. Owns the five pub/sub endpoints named
/// after the action (`<name>/goal`, `/cancel`, `/status`, `/feedback`,
/// `/result`) and routes every inbound message to the matching live
/// handle.
pub struct ActionClient<A: ActionTypes> {
  action_name: String,
  inner: Arc<ActionClientInner<A>>,
}

impl<A: ActionTypes + 'static> ActionClient<A> {
  pub fn new(node: &Node, action_name: &str) -> Self {
    let goal_publisher = Arc::new(node.create_publisher(&format!("{action_name}/goal")));
    let cancel_publisher = Arc::new(node.create_publisher(&format!("{action_name}/cancel")));

    let inner = Arc::new_cyclic(|weak: &Weak<ActionClientInner<A>>| {
      let w_status = weak.clone();
      let status_subscription = node.create_subscription(&format!("{action_name}/status"), move |msg: StatusArray| {
        if let Some(inner) = w_status.upgrade() {
          inner.on_status_array(msg);
        }
      });
      let w_feedback = weak.clone();
      let feedback_subscription = node.create_subscription(
        &format!("{action_name}/feedback"),
        move |msg: ActionFeedback<A::FeedbackType>| {
          if let Some(inner) = w_feedback.upgrade() {
            inner.on_feedback(msg);
          }
        },
      );
      let w_result = weak.clone();
      let result_subscription = node.create_subscription(
        &format!("{action_name}/result"),
        move |msg: ActionResult<A::ResultType>| {
          if let Some(inner) = w_result.upgrade() {
            inner.on_result(msg);
          }
        },
      );

      ActionClientInner {
        node: node.clone(),
        goal_publisher,
        cancel_publisher,
        status_subscription,
        feedback_subscription,
        result_subscription,
        handles: RwLock::new(HashMap::new()),
        goal_ids: GoalIdGenerator::new(node.name().to_owned()),
        last_status_peer_count: RwLock::new(0),
      }
    });

    ActionClient { action_name: action_name.to_owned(), inner }
  }

  pub fn action_name(&self) -> &str {
    &self.action_name
  }

  /// Instantaneous peer-count check, without blocking.
  pub fn server_is_ready(&self) -> bool {
    self.inner.goal_publisher.peer_count() > 0
      && self.inner.cancel_publisher.peer_count() > 0
      && self.inner.status_subscription.peer_count() > 0
      && self.inner.feedback_subscription.peer_count() > 0
      && self.inner.result_subscription.peer_count() > 0
  }

  /// Block until all five endpoints report at least one peer, or `timeout`
  /// elapses. Polls at a fixed small interval.
  pub fn wait_for_server(&self, timeout: Duration) -> bool {
    poll_until_ready(timeout, || self.server_is_ready())
  }

  /// Build an `ActionGoal` with a fresh id and the current timestamp,
  /// publish it, register and return the resulting handle.
  pub fn send_goal(
    &self,
    payload: A::GoalType,
    transition_cb: Option<Box<dyn Fn(&ClientGoalHandle<A>) + Send + Sync>>,
    feedback_cb: Option<Box<dyn Fn(&ClientGoalHandle<A>, &A::FeedbackType) + Send + Sync>>,
  ) -> Arc<ClientGoalHandle<A>> {
    let goal_id = self.inner.goal_ids.next_id();
    let goal = ActionGoal {
      header: Header { stamp: goal_id.stamp, frame_id: String::new() },
      goal_id: goal_id.clone(),
      goal: payload,
    };
    let handle = Arc::new(ClientGoalHandle::new(
      goal.clone(),
      self.inner.cancel_publisher.clone(),
      self.inner.goal_publisher.clone(),
      transition_cb,
      feedback_cb,
    ));
    // Register before publishing: the broker dispatches synchronously, so a
    // server that accepts and publishes status inline (on this same call)
    // must find the handle already in the map.
    self
      .inner
      .handles
      .write()
      .expect("lock poisoned")
      .insert(goal_id.id, handle.clone());
    self.inner.goal_publisher.publish(&goal);
    handle
  }

  /// Cancel every live goal: publish the cancel-all wildcard.
  pub fn cancel_all_goals(&self) {
    self.inner.cancel_publisher.publish(&GoalID::cancel_all());
  }

  /// Cancel every goal registered at or before `stamp`.
  pub fn cancel_all_goals_before(&self, stamp: Time) {
    self.inner.cancel_publisher.publish(&GoalID::cancel_before(stamp));
  }

  /// Shut down every live handle, then release node-level resources.
  pub fn shutdown(&self) {
    let mut handles = self.inner.handles.write().expect("lock poisoned");
    for handle in handles.values() {
      handle.shutdown();
    }
    handles.clear();
  }
}
