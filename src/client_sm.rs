//! Client-side communication state machine.
//!
//! Distinct from the wire `StatusCode`: this tracks where the *client* is in
//! the conversation, not what the server last reported. The legal
//! transition table is a static lookup table (a single source of truth,
//! simplifying tests that check every combination), not control flow.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::{error::ActionError, status::StatusCode};

/// Client-side communication states. `Lost` is a derived reporting value
/// (see `ClientStateMachine::on_lost`), not a ninth variant here: the
/// machine itself always ends in `Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientState {
  WaitingForGoalAck,
  Pending,
  Active,
  WaitingForResult,
  WaitingForCancelAck,
  Recalling,
  Preempting,
  Done,
}

impl ClientState {
  pub fn is_cancelable(self) -> bool {
    matches!(self, ClientState::WaitingForGoalAck | ClientState::Pending | ClientState::Active)
  }
}

type Table = HashMap<(ClientState, StatusCode), Vec<ClientState>>;

lazy_static! {
  /// `(current_state, incoming wire status) -> ordered list of next states`.
  /// Each entry in the list is visited in order, each one invoking the
  /// user transition callback. A missing entry is an invalid transition.
  static ref TRANSITIONS: Table = {
    use ClientState::*;
    use StatusCode::*;
    let mut t: Table = HashMap::new();

    // From WaitingForGoalAck.
    t.insert((WaitingForGoalAck, Pending), vec![Pending]);
    t.insert((WaitingForGoalAck, Active), vec![Active]);
    t.insert((WaitingForGoalAck, Rejected), vec![Pending, WaitingForResult]);
    t.insert((WaitingForGoalAck, Recalling), vec![Pending, Recalling]);
    t.insert((WaitingForGoalAck, Recalled), vec![Pending, Recalling, WaitingForResult]);
    t.insert((WaitingForGoalAck, Preempted), vec![Active, Preempting, WaitingForResult]);
    t.insert((WaitingForGoalAck, Succeeded), vec![Active, WaitingForResult]);
    t.insert((WaitingForGoalAck, Aborted), vec![Active, WaitingForResult]);
    t.insert((WaitingForGoalAck, Preempting), vec![Active, Preempting]);

    // From Pending.
    t.insert((Pending, Pending), vec![]);
    t.insert((Pending, Active), vec![Active]);
    t.insert((Pending, Rejected), vec![WaitingForResult]);
    t.insert((Pending, Recalling), vec![Recalling]);
    t.insert((Pending, Recalled), vec![Recalling, WaitingForResult]);
    t.insert((Pending, Preempted), vec![Active, Preempting, WaitingForResult]);
    t.insert((Pending, Succeeded), vec![Active, WaitingForResult]);
    t.insert((Pending, Aborted), vec![Active, WaitingForResult]);
    t.insert((Pending, Preempting), vec![Active, Preempting]);

    // From Active: only preempting/terminal paths; Pending/Rejected/Recalling/Recalled are invalid.
    t.insert((Active, Active), vec![]);
    t.insert((Active, Preempting), vec![Preempting]);
    t.insert((Active, Preempted), vec![Preempting, WaitingForResult]);
    t.insert((Active, Succeeded), vec![WaitingForResult]);
    t.insert((Active, Aborted), vec![WaitingForResult]);

    // From WaitingForCancelAck: resolves to Recalling, Preempting, or WaitingForResult.
    t.insert((WaitingForCancelAck, Pending), vec![]);
    t.insert((WaitingForCancelAck, Active), vec![]);
    t.insert((WaitingForCancelAck, Recalling), vec![Recalling]);
    t.insert((WaitingForCancelAck, Preempting), vec![Preempting]);
    t.insert((WaitingForCancelAck, Recalled), vec![Recalling, WaitingForResult]);
    t.insert((WaitingForCancelAck, Preempted), vec![Preempting, WaitingForResult]);
    t.insert((WaitingForCancelAck, Rejected), vec![WaitingForResult]);
    t.insert((WaitingForCancelAck, Succeeded), vec![WaitingForResult]);
    t.insert((WaitingForCancelAck, Aborted), vec![WaitingForResult]);

    // From Recalling: only to Preempting and/or WaitingForResult; Pending/Active invalid.
    t.insert((Recalling, Recalling), vec![]);
    t.insert((Recalling, Preempting), vec![Preempting]);
    t.insert((Recalling, Recalled), vec![WaitingForResult]);
    t.insert((Recalling, Preempted), vec![Preempting, WaitingForResult]);
    t.insert((Recalling, Rejected), vec![WaitingForResult]);
    t.insert((Recalling, Succeeded), vec![WaitingForResult]);
    t.insert((Recalling, Aborted), vec![WaitingForResult]);

    // From Preempting: only WaitingForResult paths allowed.
    t.insert((Preempting, Preempting), vec![]);
    t.insert((Preempting, Preempted), vec![WaitingForResult]);
    t.insert((Preempting, Succeeded), vec![WaitingForResult]);
    t.insert((Preempting, Aborted), vec![WaitingForResult]);

    // From WaitingForResult: idempotent on every non-invalid input.
    for s in [Pending, Active, Rejected, Recalled, Preempted, Succeeded, Aborted] {
      t.insert((WaitingForResult, s), vec![]);
    }

    // From Done: terminal inputs idempotent, everything else invalid.
    for s in [Preempted, Succeeded, Aborted, Rejected, Recalled] {
      t.insert((Done, s), vec![]);
    }

    t
  };
}

/// The per-goal client-side state machine. Holds only the current state;
/// the owning `ClientGoalHandle` holds the remembered goal and the user
/// callbacks invoked on each transition.
#[derive(Clone, Copy, Debug)]
pub struct ClientStateMachine {
  state: ClientState,
}

impl ClientStateMachine {
  pub fn new() -> Self {
    ClientStateMachine { state: ClientState::WaitingForGoalAck }
  }

  pub fn state(&self) -> ClientState {
    self.state
  }

  /// Apply an incoming wire status. Returns the ordered list of states
  /// visited (possibly empty for an idempotent input). The caller invokes
  /// its transition callback once per visited state, in order.
  pub fn on_status(&mut self, status: StatusCode) -> Result<Vec<ClientState>, ActionError> {
    if self.state == ClientState::Done {
      // Done only accepts idempotent terminal statuses; everything else is
      // invalid but must not panic.
      return match TRANSITIONS.get(&(ClientState::Done, status)) {
        Some(path) => Ok(path.clone()),
        None => Err(ActionError::InvalidClientTransition { from: self.state, event: "status" }),
      };
    }
    match TRANSITIONS.get(&(self.state, status)) {
      Some(path) => {
        if let Some(&last) = path.last() {
          self.state = last;
        }
        Ok(path.clone())
      }
      None => Err(ActionError::InvalidClientTransition { from: self.state, event: "status" }),
    }
  }

  /// A terminal result has arrived. Always succeeds (unless already `Done`,
  /// which is an error per spec): force the machine into `Done`.
  pub fn on_result(&mut self) -> Result<(), ActionError> {
    if self.state == ClientState::Done {
      return Err(ActionError::InvalidClientTransition { from: self.state, event: "result" });
    }
    self.state = ClientState::Done;
    Ok(())
  }

  /// User requested cancellation. Legal only while the goal is cancelable.
  pub fn on_cancel(&mut self) -> Result<(), ActionError> {
    if !self.state.is_cancelable() {
      return Err(ActionError::InvalidClientTransition { from: self.state, event: "cancel" });
    }
    self.state = ClientState::WaitingForCancelAck;
    Ok(())
  }

  /// The goal dropped out of the server's status view. Legal only outside
  /// `WaitingForGoalAck`, `WaitingForResult`, and `Done` (spec §4.3).
  pub fn on_lost(&mut self) -> Result<(), ActionError> {
    if matches!(self.state, ClientState::WaitingForGoalAck | ClientState::WaitingForResult | ClientState::Done) {
      return Err(ActionError::InvalidClientTransition { from: self.state, event: "lost" });
    }
    self.state = ClientState::Done;
    Ok(())
  }
}

impl Default for ClientStateMachine {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use test_case::test_case;

  #[test_case(ClientState::WaitingForGoalAck, StatusCode::Active, ClientState::Active)]
  #[test_case(ClientState::Pending, StatusCode::Active, ClientState::Active)]
  #[test_case(ClientState::Active, StatusCode::Succeeded, ClientState::WaitingForResult)]
  #[test_case(ClientState::WaitingForResult, StatusCode::Succeeded, ClientState::WaitingForResult)]
  fn legal_transition_lands_on_expected_state(from: ClientState, status: StatusCode, expect: ClientState) {
    let mut sm = ClientStateMachine::new();
    sm.state = from;
    sm.on_status(status).unwrap();
    assert_eq!(sm.state(), expect);
  }

  #[test]
  fn active_rejects_pending() {
    let mut sm = ClientStateMachine::new();
    sm.state = ClientState::Active;
    assert!(sm.on_status(StatusCode::Pending).is_err());
  }

  #[test]
  fn done_is_a_sink_for_non_terminal_input() {
    let mut sm = ClientStateMachine::new();
    sm.state = ClientState::Done;
    assert!(sm.on_status(StatusCode::Active).is_err());
    assert!(sm.on_status(StatusCode::Succeeded).is_ok());
  }

  #[test]
  fn happy_path_fibonacci() {
    let mut sm = ClientStateMachine::new();
    assert_eq!(sm.state(), ClientState::WaitingForGoalAck);
    sm.on_status(StatusCode::Pending).unwrap();
    assert_eq!(sm.state(), ClientState::Pending);
    sm.on_status(StatusCode::Active).unwrap();
    assert_eq!(sm.state(), ClientState::Active);
    sm.on_status(StatusCode::Succeeded).unwrap();
    assert_eq!(sm.state(), ClientState::WaitingForResult);
    sm.on_result().unwrap();
    assert_eq!(sm.state(), ClientState::Done);
  }

  #[test]
  fn cancel_before_accept_then_recalled() {
    let mut sm = ClientStateMachine::new();
    sm.on_cancel().unwrap();
    assert_eq!(sm.state(), ClientState::WaitingForCancelAck);
    sm.on_status(StatusCode::Recalling).unwrap();
    assert_eq!(sm.state(), ClientState::Recalling);
    sm.on_status(StatusCode::Recalled).unwrap();
    assert_eq!(sm.state(), ClientState::WaitingForResult);
  }

  #[test]
  fn lost_forces_done_from_active_only() {
    let mut sm = ClientStateMachine::new();
    assert!(sm.on_lost().is_err());
    sm.state = ClientState::Active;
    sm.on_lost().unwrap();
    assert_eq!(sm.state(), ClientState::Done);
  }
}
