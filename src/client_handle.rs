//! Per-goal client-side handle: wraps the client state machine, the
//! remembered goal, and the user callbacks.

use std::sync::{Arc, RwLock};

#[allow(unused_imports)]
use log::{debug, warn};

use crate::{
  action_types::ActionTypes,
  builtin_interfaces::Time,
  client_sm::{ClientState, ClientStateMachine},
  envelope::{ActionFeedback, ActionGoal, ActionResult},
  error::ActionError,
  goal_id::GoalID,
  status::{GoalStatus, StatusCode},
  transport::Publisher,
};

type TransitionCallback<A> = dyn Fn(&ClientGoalHandle<A>) + Send + Sync;
type FeedbackCallback<A> = dyn Fn(&ClientGoalHandle<A>, &<A as ActionTypes>::FeedbackType) + Send + Sync;

/// One submitted goal, from the client's point of view. Held behind an
/// `Arc` by `ActionClient`; user code also holds an `Arc` returned from
/// `send_goal`, so the handle outlives a single inbound callback.
pub struct ClientGoalHandle<A: ActionTypes> {
  goal: ActionGoal<A::GoalType>,
  sm: RwLock<ClientStateMachine>,
  last_status: RwLock<Option<GoalStatus>>,
  result: RwLock<Option<A::ResultType>>,
  active: RwLock<bool>,
  cancel_publisher: Arc<Publisher<GoalID>>,
  goal_publisher: Arc<Publisher<ActionGoal<A::GoalType>>>,
  transition_cb: Option<Box<TransitionCallback<A>>>,
  feedback_cb: Option<Box<FeedbackCallback<A>>>,
}

impl<A: ActionTypes> ClientGoalHandle<A> {
  pub(crate) fn new(
    goal: ActionGoal<A::GoalType>,
    cancel_publisher: Arc<Publisher<GoalID>>,
    goal_publisher: Arc<Publisher<ActionGoal<A::GoalType>>>,
    transition_cb: Option<Box<TransitionCallback<A>>>,
    feedback_cb: Option<Box<FeedbackCallback<A>>>,
  ) -> Self {
    ClientGoalHandle {
      goal,
      sm: RwLock::new(ClientStateMachine::new()),
      last_status: RwLock::new(None),
      result: RwLock::new(None),
      active: RwLock::new(true),
      cancel_publisher,
      goal_publisher,
      transition_cb,
      feedback_cb,
    }
  }

  pub fn goal_id(&self) -> &str {
    &self.goal.goal_id.id
  }

  pub fn get_goal(&self) -> &A::GoalType {
    &self.goal.goal
  }

  pub fn get_comm_state(&self) -> ClientState {
    self.sm.read().expect("lock poisoned").state()
  }

  /// The last reported `GoalStatus`, or the derived `Lost` status if the
  /// server stopped reporting this goal.
  pub fn get_goal_status(&self) -> Option<GoalStatus> {
    self.last_status.read().expect("lock poisoned").clone()
  }

  pub fn get_result(&self) -> Result<A::ResultType, ActionError> {
    self.result.read().expect("lock poisoned").clone().ok_or(ActionError::MissingResult)
  }

  fn is_active(&self) -> bool {
    *self.active.read().expect("lock poisoned")
  }

  /// Advisory cancel: publish this goal's id on the cancel channel and move
  /// to `WaitingForCancelAck`. No synchronous acknowledgement is waited on.
  pub fn cancel(&self) -> Result<(), ActionError> {
    if !self.is_active() {
      return Err(ActionError::InactiveHandle);
    }
    self.sm.write().expect("lock poisoned").on_cancel()?;
    self.cancel_publisher.publish(&GoalID::new(self.goal.goal_id.id.clone(), Time::ZERO));
    Ok(())
  }

  /// Re-publish the original goal unchanged, e.g. after suspecting the
  /// server that had it has failed over.
  pub fn resend_goal(&self) -> Result<(), ActionError> {
    if !self.is_active() {
      return Err(ActionError::InactiveHandle);
    }
    self.goal_publisher.publish(&self.goal);
    Ok(())
  }

  pub fn shutdown(&self) {
    *self.active.write().expect("lock poisoned") = false;
  }

  /// A `GoalStatus` for this goal, extracted from an inbound `StatusArray`.
  pub(crate) fn deliver_status(&self, status: &GoalStatus) {
    if !self.is_active() || status.goal_id.id != self.goal.goal_id.id {
      return;
    }
    if self.last_status.read().expect("lock poisoned").is_none() {
      debug!("goal {}: first status received ({:?})", self.goal.goal_id.id, status.status);
    }
    self.apply_status(status);
  }

  fn apply_status(&self, status: &GoalStatus) {
    let visited = {
      let mut sm = self.sm.write().expect("lock poisoned");
      match sm.on_status(status.status) {
        Ok(v) => v,
        Err(e) => {
          warn!("goal {}: {e}", self.goal.goal_id.id);
          return;
        }
      }
    };
    *self.last_status.write().expect("lock poisoned") = Some(status.clone());
    for _visited_state in visited {
      if let Some(cb) = &self.transition_cb {
        cb(self);
      }
    }
  }

  pub(crate) fn deliver_feedback(&self, feedback: &ActionFeedback<A::FeedbackType>) {
    if !self.is_active() || feedback.status.goal_id.id != self.goal.goal_id.id {
      return;
    }
    if let Some(cb) = &self.feedback_cb {
      cb(self, &feedback.feedback);
    }
  }

  pub(crate) fn deliver_result(&self, result: &ActionResult<A::ResultType>) {
    if !self.is_active() || result.status.goal_id.id != self.goal.goal_id.id {
      return;
    }
    if self.get_comm_state() != ClientState::Done {
      self.apply_status(&result.status);
    }
    {
      let mut sm = self.sm.write().expect("lock poisoned");
      if sm.on_result().is_err() {
        warn!("goal {}: result received after Done", self.goal.goal_id.id);
        return;
      }
    }
    *self.result.write().expect("lock poisoned") = Some(result.result.clone());
    *self.last_status.write().expect("lock poisoned") = Some(result.status.clone());
    if let Some(cb) = &self.transition_cb {
      cb(self);
    }
  }

  /// This goal was absent from the latest `StatusArray`. No-op unless the
  /// machine is in a state where loss is meaningful (spec §4.3).
  pub(crate) fn deliver_lost(&self) {
    if !self.is_active() {
      return;
    }
    let applied = self.sm.write().expect("lock poisoned").on_lost().is_ok();
    if !applied {
      return;
    }
    let lost_id = self.goal.goal_id.clone();
    *self.last_status.write().expect("lock poisoned") =
      Some(GoalStatus::new(lost_id, StatusCode::Lost));
    if let Some(cb) = &self.transition_cb {
      cb(self);
    }
  }
}
