//! Node-level object owning one action's server-side pub/sub endpoints,
//! the set of live goal handles, and the status heartbeat.

use std::{
  collections::HashMap,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, RwLock, Weak,
  },
  thread::JoinHandle,
  time::Duration,
};

#[allow(unused_imports)]
use log::debug;

use crate::{
  action_types::ActionTypes,
  config::ActionConfig,
  envelope::{ActionFeedback, ActionGoal, ActionResult},
  goal_id::GoalID,
  server_handle::{ServerGoalHandle, StatusSink},
  status::{GoalStatus, Header, StatusArray},
  transport::{Node, Publisher, Subscription},
};

struct ActionServerInner<A: ActionTypes> {
  node: Node,
  status_publisher: Arc<Publisher<StatusArray>>,
  feedback_publisher: Arc<Publisher<ActionFeedback<A::FeedbackType>>>,
  result_publisher: Arc<Publisher<ActionResult<A::ResultType>>>,
  #[allow(dead_code)]
  goal_subscription: Subscription<ActionGoal<A::GoalType>>,
  #[allow(dead_code)]
  cancel_subscription: Subscription<GoalID>,
  handles: RwLock<HashMap<String, Arc<ServerGoalHandle<A>>>>,
  goal_cb: RwLock<Option<Box<dyn Fn(Arc<ServerGoalHandle<A>>) + Send + Sync>>>,
  cancel_cb: RwLock<Option<Box<dyn Fn(Arc<ServerGoalHandle<A>>) + Send + Sync>>>,
  config: ActionConfig,
  status_sink: Weak<dyn StatusSink>,
  running: AtomicBool,
  heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl<A: ActionTypes> StatusSink for ActionServerInner<A> {
  fn publish_status(&self) {
    self.publish_status_impl();
  }
}

impl<A: ActionTypes> ActionServerInner<A> {
  fn publish_status_impl(&self) {
    let list: Vec<GoalStatus> = self
      .handles
      .read()
      .expect("lock poisoned")
      .values()
      .map(|h| h.get_goal_status())
      .collect();
    self.status_publisher.publish(&StatusArray::new(list));
  }

  fn reap_expired(&self) {
    let timeout_nanos = (self.config.status_list_timeout_sec() * 1e9) as i64;
    let now = self.node.now().nanos_since_epoch;
    self.handles.write().expect("lock poisoned").retain(|_, h| match h.destruction_time() {
      Some(t) => now - t.nanos_since_epoch < timeout_nanos,
      None => true,
    });
  }

  fn on_goal(&self, goal: ActionGoal<A::GoalType>) {
    {
      let handles = self.handles.read().expect("lock poisoned");
      if handles.contains_key(&goal.goal_id.id) {
        debug!("duplicate goal {}, ignoring", goal.goal_id.id);
        return;
      }
    }

    let tolerance = self.config.goal_timestamp_tolerance_sec();
    let is_stale = tolerance > 0.0 && {
      let age_sec = (self.node.now().nanos_since_epoch - goal.goal_id.stamp.nanos_since_epoch) as f64 / 1e9;
      age_sec > tolerance
    };

    let id = goal.goal_id.id.clone();
    let handle = Arc::new(ServerGoalHandle::new(goal, self.status_sink.clone()));
    self.handles.write().expect("lock poisoned").insert(id, handle.clone());

    if is_stale {
      let _ = handle.reject("goal timestamp older than configured tolerance");
      return;
    }

    self.publish_status_impl();
    if let Some(cb) = self.goal_cb.read().expect("lock poisoned").as_ref() {
      cb(handle);
    }
  }

  fn on_cancel(&self, request: GoalID) {
    let selected: Vec<Arc<ServerGoalHandle<A>>> = {
      let handles = self.handles.read().expect("lock poisoned");
      handles
        .values()
        .filter(|h| goal_matches_cancel(h, &request))
        .cloned()
        .collect()
    };
    for handle in selected {
      if handle.request_cancel().is_ok() {
        if let Some(cb) = self.cancel_cb.read().expect("lock poisoned").as_ref() {
          cb(handle);
        }
      }
      // Already-terminal handles error out of request_cancel(); per spec
      // §4.6 that failure is silently absorbed.
    }
  }
}

/// Wildcard matching rules for an inbound cancel request (spec §4.6):
/// - id set, stamp zero: exactly that goal.
/// - id empty, stamp zero: every live goal.
/// - id empty, stamp set: every goal registered at or before stamp.
/// - id set, stamp set: that goal, plus every goal registered at or before stamp.
fn goal_matches_cancel<A: ActionTypes>(handle: &ServerGoalHandle<A>, request: &GoalID) -> bool {
  let id_matches = !request.id.is_empty() && handle.goal_id() == request.id;
  let before_stamp = request.stamp.nanos_since_epoch != 0
    && handle.registration_stamp().nanos_since_epoch <= request.stamp.nanos_since_epoch;
  let cancel_all = request.id.is_empty() && request.stamp.nanos_since_epoch == 0;
  cancel_all || id_matches || before_stamp
}

/// The server side of one action.
pub struct ActionServer<A: ActionTypes> {
  action_name: String,
  inner: Arc<ActionServerInner<A>>,
}

impl<A: ActionTypes + 'static> ActionServer<A> {
  pub fn new(node: &Node, action_name: &str, config: ActionConfig) -> Self {
    let status_publisher = Arc::new(node.create_publisher(&format!("{action_name}/status")));
    let feedback_publisher = Arc::new(node.create_publisher(&format!("{action_name}/feedback")));
    let result_publisher = Arc::new(node.create_publisher(&format!("{action_name}/result")));

    let inner = Arc::new_cyclic(|weak: &Weak<ActionServerInner<A>>| {
      let w_goal = weak.clone();
      let goal_subscription = node.create_subscription(&format!("{action_name}/goal"), move |msg: ActionGoal<A::GoalType>| {
        if let Some(inner) = w_goal.upgrade() {
          inner.on_goal(msg);
        }
      });
      let w_cancel = weak.clone();
      let cancel_subscription = node.create_subscription(&format!("{action_name}/cancel"), move |msg: GoalID| {
        if let Some(inner) = w_cancel.upgrade() {
          inner.on_cancel(msg);
        }
      });

      ActionServerInner {
        node: node.clone(),
        status_publisher,
        feedback_publisher,
        result_publisher,
        goal_subscription,
        cancel_subscription,
        handles: RwLock::new(HashMap::new()),
        goal_cb: RwLock::new(None),
        cancel_cb: RwLock::new(None),
        config,
        status_sink: weak.clone(),
        running: AtomicBool::new(false),
        heartbeat: Mutex::new(None),
      }
    });

    ActionServer { action_name: action_name.to_owned(), inner }
  }

  pub fn action_name(&self) -> &str {
    &self.action_name
  }

  pub fn register_goal_callback(&self, cb: impl Fn(Arc<ServerGoalHandle<A>>) + Send + Sync + 'static) {
    *self.inner.goal_cb.write().expect("lock poisoned") = Some(Box::new(cb));
  }

  pub fn register_cancel_callback(&self, cb: impl Fn(Arc<ServerGoalHandle<A>>) + Send + Sync + 'static) {
    *self.inner.cancel_cb.write().expect("lock poisoned") = Some(Box::new(cb));
  }

  pub fn publish_feedback(&self, handle: &Arc<ServerGoalHandle<A>>, payload: A::FeedbackType) {
    let msg = ActionFeedback {
      header: Header { stamp: self.inner.node.now(), frame_id: String::new() },
      status: handle.get_goal_status(),
      feedback: payload,
    };
    self.inner.feedback_publisher.publish(&msg);
  }

  pub fn publish_result(&self, handle: &Arc<ServerGoalHandle<A>>, payload: A::ResultType) {
    let msg = ActionResult {
      header: Header { stamp: self.inner.node.now(), frame_id: String::new() },
      status: handle.get_goal_status(),
      result: payload,
    };
    self.inner.result_publisher.publish(&msg);
  }

  pub fn publish_status(&self) {
    self.inner.publish_status_impl();
  }

  /// Begin accepting goals and start the periodic status-publish timer.
  pub fn start(&self) {
    self.inner.running.store(true, Ordering::SeqCst);
    let inner = self.inner.clone();
    let rate = inner.config.status_publish_rate_hz().max(0.001);
    let period = Duration::from_secs_f64(1.0 / rate);
    let join = std::thread::spawn(move || {
      while inner.running.load(Ordering::SeqCst) {
        inner.reap_expired();
        inner.publish_status_impl();
        std::thread::sleep(period);
      }
    });
    *self.inner.heartbeat.lock().expect("lock poisoned") = Some(join);
  }

  /// Stop the heartbeat thread. Live handles are left as they are.
  pub fn stop(&self) {
    self.inner.running.store(false, Ordering::SeqCst);
    if let Some(join) = self.inner.heartbeat.lock().expect("lock poisoned").take() {
      let _ = join.join();
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{builtin_interfaces::Time, server_handle::ServerGoalHandle};

  struct NullSink;
  impl StatusSink for NullSink {
    fn publish_status(&self) {}
  }

  fn handle_with(id: &str, stamp_nanos: i64) -> ServerGoalHandle<crate::action_types::Action<i32, i32, i32>> {
    let goal = ActionGoal {
      header: Header::default(),
      goal_id: GoalID::new(id.to_owned(), Time::from_nanos(stamp_nanos)),
      goal: 0,
    };
    let sink: Weak<dyn StatusSink> = Weak::<NullSink>::new();
    ServerGoalHandle::new(goal, sink)
  }

  #[test]
  fn exact_id_matches_only_that_goal() {
    let h = handle_with("g1", 0);
    assert!(goal_matches_cancel(&h, &GoalID::new("g1".into(), Time::ZERO)));
    assert!(!goal_matches_cancel(&h, &GoalID::new("g2".into(), Time::ZERO)));
  }

  #[test]
  fn cancel_all_matches_everything() {
    let h = handle_with("g1", 1000);
    assert!(goal_matches_cancel(&h, &GoalID::cancel_all()));
  }

  #[test]
  fn cancel_before_matches_older_registrations() {
    let older = handle_with("g1", 100);
    let newer = handle_with("g2", 300);
    let cutoff = GoalID::cancel_before(Time::from_nanos(200));
    assert!(goal_matches_cancel(&older, &cutoff));
    assert!(!goal_matches_cancel(&newer, &cutoff));
  }

  #[test]
  fn combined_matches_id_or_before_stamp() {
    let by_id = handle_with("target", 900);
    let by_stamp = handle_with("other", 50);
    let neither = handle_with("unrelated", 900);
    let req = GoalID::new("target".into(), Time::from_nanos(100));
    assert!(goal_matches_cancel(&by_id, &req));
    assert!(goal_matches_cancel(&by_stamp, &req));
    assert!(!goal_matches_cancel(&neither, &req));
  }
}
