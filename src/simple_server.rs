//! Single-goal server facade over the general multi-goal `ActionServer`.

use std::{
  sync::{Arc, RwLock, Weak},
  thread,
};

#[allow(unused_imports)]
use log::warn;

use crate::{
  action_server::ActionServer,
  action_types::ActionTypes,
  config::ActionConfig,
  error::ActionError,
  server_handle::ServerGoalHandle,
  transport::Node,
};

struct SimpleState<A: ActionTypes> {
  current: Option<Arc<ServerGoalHandle<A>>>,
  pending: Option<Arc<ServerGoalHandle<A>>>,
}

/// Drives a single goal at a time through a user-provided execute function,
/// run on a dedicated worker thread so it can block for the goal's
/// duration while cancel requests and new goals keep arriving.
///
/// If a new goal arrives while one is executing, the current goal is asked
/// to cancel (`is_preempt_requested()` starts returning true) and the new
/// one becomes active once the running execute call returns.
pub struct SimpleActionServer<A: ActionTypes> {
  server: ActionServer<A>,
  state: RwLock<SimpleState<A>>,
  execute: Box<dyn Fn(&Arc<SimpleActionServer<A>>, Arc<ServerGoalHandle<A>>) + Send + Sync>,
}

impl<A: ActionTypes + 'static> SimpleActionServer<A> {
  pub fn new(
    node: &Node,
    action_name: &str,
    config: ActionConfig,
    execute: impl Fn(&Arc<SimpleActionServer<A>>, Arc<ServerGoalHandle<A>>) + Send + Sync + 'static,
  ) -> Arc<Self> {
    let server = ActionServer::new(node, action_name, config);
    Arc::new_cyclic(|weak: &Weak<SimpleActionServer<A>>| {
      let w = weak.clone();
      server.register_goal_callback(move |handle| {
        if let Some(this) = w.upgrade() {
          this.on_goal(handle);
        }
      });
      SimpleActionServer {
        server,
        state: RwLock::new(SimpleState { current: None, pending: None }),
        execute: Box::new(execute),
      }
    })
  }

  pub fn start(&self) {
    self.server.start();
  }

  pub fn stop(&self) {
    self.server.stop();
  }

  fn on_goal(self: &Arc<Self>, handle: Arc<ServerGoalHandle<A>>) {
    let mut state = self.state.write().expect("lock poisoned");
    if let Some(current) = &state.current {
      let _ = current.request_cancel();
      state.pending = Some(handle);
      return;
    }
    state.current = Some(handle.clone());
    drop(state);
    self.spawn_execute(handle);
  }

  fn spawn_execute(self: &Arc<Self>, handle: Arc<ServerGoalHandle<A>>) {
    if let Err(e) = handle.accept() {
      warn!("goal {} could not be accepted: {e}", handle.goal_id());
      self.finish_current();
      return;
    }
    let this = self.clone();
    thread::spawn(move || {
      (this.execute)(&this, handle);
      this.finish_current();
    });
  }

  fn finish_current(self: &Arc<Self>) {
    let next = {
      let mut state = self.state.write().expect("lock poisoned");
      state.current = None;
      state.pending.take()
    };
    if let Some(handle) = next {
      {
        let mut state = self.state.write().expect("lock poisoned");
        state.current = Some(handle.clone());
      }
      self.spawn_execute(handle);
    }
  }

  /// True once a cancel request has matched the active goal, or a newer
  /// goal has been queued behind it.
  pub fn is_preempt_requested(&self) -> bool {
    let state = self.state.read().expect("lock poisoned");
    match &state.current {
      Some(h) => h.is_cancel_requested() || state.pending.is_some(),
      None => false,
    }
  }

  pub fn set_succeeded(&self, text: impl Into<String>) -> Result<(), ActionError> {
    self.with_current(|h| h.set_succeeded(text))
  }

  pub fn set_preempted(&self, text: impl Into<String>) -> Result<(), ActionError> {
    self.with_current(|h| h.set_canceled(text))
  }

  pub fn set_aborted(&self, text: impl Into<String>) -> Result<(), ActionError> {
    self.with_current(|h| h.set_aborted(text))
  }

  pub fn publish_feedback(&self, payload: A::FeedbackType) {
    if let Some(h) = self.state.read().expect("lock poisoned").current.clone() {
      self.server.publish_feedback(&h, payload);
    }
  }

  pub fn publish_result(&self, payload: A::ResultType) {
    if let Some(h) = self.state.read().expect("lock poisoned").current.clone() {
      self.server.publish_result(&h, payload);
    }
  }

  fn with_current(&self, f: impl FnOnce(&ServerGoalHandle<A>) -> Result<(), ActionError>) -> Result<(), ActionError> {
    match self.state.read().expect("lock poisoned").current.clone() {
      Some(h) => f(&h),
      None => Err(ActionError::InactiveHandle),
    }
  }
}
