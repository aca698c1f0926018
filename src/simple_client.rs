//! Single-goal client facade over the general multi-goal `ActionClient`.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, RwLock,
};
use std::time::Duration;

use crate::{
  action_client::ActionClient,
  action_types::ActionTypes,
  client_handle::ClientGoalHandle,
  client_sm::ClientState,
  error::ActionError,
  status::StatusCode,
  transport::Node,
};

/// Simplified client-visible lifecycle: every communication state collapses
/// into one of these three.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimpleState {
  Pending,
  Active,
  Done,
}

/// Tracks exactly one goal at a time.
pub struct SimpleActionClient<A: ActionTypes> {
  client: ActionClient<A>,
  current: RwLock<Option<Arc<ClientGoalHandle<A>>>>,
}

impl<A: ActionTypes + 'static> SimpleActionClient<A> {
  pub fn new(node: &Node, action_name: &str) -> Self {
    SimpleActionClient { client: ActionClient::new(node, action_name), current: RwLock::new(None) }
  }

  pub fn wait_for_server(&self, timeout: Duration) -> bool {
    self.client.wait_for_server(timeout)
  }

  /// Send a goal, replacing whatever goal was previously tracked.
  ///
  /// `done_cb` is guaranteed to fire exactly once for the returned handle.
  pub fn send_goal(
    &self,
    payload: A::GoalType,
    active_cb: Option<Box<dyn Fn() + Send + Sync>>,
    feedback_cb: Option<Box<dyn Fn(&A::FeedbackType) + Send + Sync>>,
    done_cb: Option<Box<dyn Fn(StatusCode, Option<A::ResultType>) + Send + Sync>>,
  ) -> Arc<ClientGoalHandle<A>> {
    let active_fired = Arc::new(AtomicBool::new(false));
    let done_fired = Arc::new(AtomicBool::new(false));

    let transition_cb: Box<dyn Fn(&ClientGoalHandle<A>) + Send + Sync> = Box::new(move |h: &ClientGoalHandle<A>| {
      let state = h.get_comm_state();
      if state == ClientState::Active && !active_fired.swap(true, Ordering::SeqCst) {
        if let Some(cb) = &active_cb {
          cb();
        }
      }
      if state == ClientState::Done && !done_fired.swap(true, Ordering::SeqCst) {
        let status = h.get_goal_status().map(|s| s.status).unwrap_or(StatusCode::Lost);
        let result = h.get_result().ok();
        if let Some(cb) = &done_cb {
          cb(status, result);
        }
      }
    });

    let feedback_cb_wrapped = feedback_cb.map(|cb| -> Box<dyn Fn(&ClientGoalHandle<A>, &A::FeedbackType) + Send + Sync> {
      Box::new(move |_h: &ClientGoalHandle<A>, fb: &A::FeedbackType| cb(fb))
    });

    let handle = self.client.send_goal(payload, Some(transition_cb), feedback_cb_wrapped);
    *self.current.write().expect("lock poisoned") = Some(handle.clone());
    handle
  }

  pub fn cancel_goal(&self) -> Result<(), ActionError> {
    match self.current.read().expect("lock poisoned").clone() {
      Some(h) => h.cancel(),
      None => Err(ActionError::InactiveHandle),
    }
  }

  pub fn get_state(&self) -> SimpleState {
    match self.current.read().expect("lock poisoned").as_ref() {
      None => SimpleState::Pending,
      Some(h) => match h.get_comm_state() {
        ClientState::WaitingForGoalAck | ClientState::Pending | ClientState::Recalling | ClientState::WaitingForCancelAck => {
          SimpleState::Pending
        }
        ClientState::Active | ClientState::Preempting | ClientState::WaitingForResult => SimpleState::Active,
        ClientState::Done => SimpleState::Done,
      },
    }
  }

  pub fn get_result(&self) -> Result<A::ResultType, ActionError> {
    match self.current.read().expect("lock poisoned").clone() {
      Some(h) => h.get_result(),
      None => Err(ActionError::MissingResult),
    }
  }
}
