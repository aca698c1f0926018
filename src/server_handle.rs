//! Per-goal server-side handle: wraps the server state machine and
//! exposes the operations a goal callback uses to drive a goal to
//! completion.

use std::sync::{RwLock, Weak};

use crate::{
  action_types::ActionTypes,
  builtin_interfaces::Time,
  envelope::ActionGoal,
  error::ActionError,
  server_sm::{ServerEvent, ServerStateMachine},
  status::GoalStatus,
};

/// Narrow back-reference to the owning `ActionServer`: just enough to ask
/// for an out-of-band status broadcast on a state change, without the
/// handle holding a strong reference to its owner (spec §9's "cyclic
/// reference between handle and parent" design note).
pub(crate) trait StatusSink: Send + Sync {
  fn publish_status(&self);
}

/// One accepted goal, from the server's point of view.
pub struct ServerGoalHandle<A: ActionTypes> {
  goal: ActionGoal<A::GoalType>,
  sm: RwLock<ServerStateMachine>,
  text: RwLock<String>,
  cancel_requested: RwLock<bool>,
  handler_destruction_time: RwLock<Option<Time>>,
  owner: Weak<dyn StatusSink>,
}

impl<A: ActionTypes> ServerGoalHandle<A> {
  pub(crate) fn new(goal: ActionGoal<A::GoalType>, owner: Weak<dyn StatusSink>) -> Self {
    ServerGoalHandle {
      goal,
      sm: RwLock::new(ServerStateMachine::new()),
      text: RwLock::new(String::new()),
      cancel_requested: RwLock::new(false),
      handler_destruction_time: RwLock::new(None),
      owner,
    }
  }

  pub fn goal_id(&self) -> &str {
    &self.goal.goal_id.id
  }

  pub fn get_goal(&self) -> &A::GoalType {
    &self.goal.goal
  }

  pub fn get_goal_status(&self) -> GoalStatus {
    GoalStatus::with_text(
      self.goal.goal_id.clone(),
      self.sm.read().expect("lock poisoned").state(),
      self.text.read().expect("lock poisoned").clone(),
    )
  }

  /// `true` once a cancel request has matched this goal (used by
  /// `SimpleActionServer::is_preempt_requested`).
  pub fn is_cancel_requested(&self) -> bool {
    *self.cancel_requested.read().expect("lock poisoned")
  }

  pub(crate) fn destruction_time(&self) -> Option<Time> {
    *self.handler_destruction_time.read().expect("lock poisoned")
  }

  pub(crate) fn registration_stamp(&self) -> Time {
    self.goal.goal_id.stamp
  }

  fn notify_changed(&self) {
    if let Some(owner) = self.owner.upgrade() {
      owner.publish_status();
    }
  }

  fn mark_terminal(&self) {
    *self.handler_destruction_time.write().expect("lock poisoned") = Some(Time::now());
  }

  pub fn accept(&self) -> Result<(), ActionError> {
    self.sm.write().expect("lock poisoned").apply(ServerEvent::Accept)?;
    self.notify_changed();
    Ok(())
  }

  pub fn reject(&self, text: impl Into<String>) -> Result<(), ActionError> {
    *self.text.write().expect("lock poisoned") = text.into();
    self.sm.write().expect("lock poisoned").apply(ServerEvent::Reject)?;
    self.mark_terminal();
    self.notify_changed();
    Ok(())
  }

  pub fn set_succeeded(&self, text: impl Into<String>) -> Result<(), ActionError> {
    *self.text.write().expect("lock poisoned") = text.into();
    self.sm.write().expect("lock poisoned").apply(ServerEvent::Succeed)?;
    self.mark_terminal();
    self.notify_changed();
    Ok(())
  }

  pub fn set_aborted(&self, text: impl Into<String>) -> Result<(), ActionError> {
    *self.text.write().expect("lock poisoned") = text.into();
    self.sm.write().expect("lock poisoned").apply(ServerEvent::Abort)?;
    self.mark_terminal();
    self.notify_changed();
    Ok(())
  }

  /// Resolves to `Recalled` or `Preempted` depending on whether this goal
  /// was canceled before or during execution; the transition table picks
  /// the right target from the current state.
  pub fn set_canceled(&self, text: impl Into<String>) -> Result<(), ActionError> {
    *self.text.write().expect("lock poisoned") = text.into();
    self.sm.write().expect("lock poisoned").apply(ServerEvent::Cancel)?;
    self.mark_terminal();
    self.notify_changed();
    Ok(())
  }

  /// Drive the external cancel-request event. Errors (e.g. already
  /// terminal) are absorbed by the caller, per spec §4.6.
  pub(crate) fn request_cancel(&self) -> Result<(), ActionError> {
    self.sm.write().expect("lock poisoned").apply(ServerEvent::CancelRequest)?;
    *self.cancel_requested.write().expect("lock poisoned") = true;
    self.notify_changed();
    Ok(())
  }
}
