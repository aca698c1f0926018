//! Server-side state machine. States are the wire status codes themselves
//! (minus `Lost`, which never occurs server-side); events are the
//! operations a user goal callback invokes through a `ServerGoalHandle`.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::{error::ActionError, status::StatusCode};

/// User/external events driving the server-side machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerEvent {
  Accept,
  Reject,
  CancelRequest,
  Cancel,
  Abort,
  Succeed,
}

impl ServerEvent {
  fn name(self) -> &'static str {
    match self {
      ServerEvent::Accept => "Accept",
      ServerEvent::Reject => "Reject",
      ServerEvent::CancelRequest => "CancelRequest",
      ServerEvent::Cancel => "Cancel",
      ServerEvent::Abort => "Abort",
      ServerEvent::Succeed => "Succeed",
    }
  }
}

type Table = HashMap<(StatusCode, ServerEvent), StatusCode>;

lazy_static! {
  static ref TRANSITIONS: Table = {
    use ServerEvent::*;
    use StatusCode::*;
    let mut t: Table = HashMap::new();

    t.insert((Pending, Accept), Active);
    t.insert((Recalling, Accept), Active);

    t.insert((Pending, Reject), Rejected);
    t.insert((Recalling, Reject), Rejected);

    t.insert((Pending, CancelRequest), Recalling);
    t.insert((Active, CancelRequest), Preempting);

    t.insert((Pending, Cancel), Recalled);
    t.insert((Recalling, Cancel), Recalled);
    t.insert((Preempting, Cancel), Preempted);

    t.insert((Active, Abort), Aborted);
    t.insert((Preempting, Abort), Aborted);

    t.insert((Pending, Succeed), Succeeded);
    t.insert((Recalling, Succeed), Succeeded);
    t.insert((Active, Succeed), Succeeded);
    t.insert((Preempting, Succeed), Succeeded);

    t
  };
}

/// Per-goal server-side state machine. `ServerGoalHandle` wraps one of
/// these plus the remembered goal envelope.
#[derive(Clone, Copy, Debug)]
pub struct ServerStateMachine {
  state: StatusCode,
}

impl ServerStateMachine {
  pub fn new() -> Self {
    ServerStateMachine { state: StatusCode::Pending }
  }

  pub fn state(&self) -> StatusCode {
    self.state
  }

  pub fn apply(&mut self, event: ServerEvent) -> Result<StatusCode, ActionError> {
    if self.state.is_terminal() {
      return Err(ActionError::InvalidServerTransition {
        from: status_name(self.state),
        event: event.name(),
      });
    }
    match TRANSITIONS.get(&(self.state, event)) {
      Some(&next) => {
        self.state = next;
        Ok(next)
      }
      None => Err(ActionError::InvalidServerTransition {
        from: status_name(self.state),
        event: event.name(),
      }),
    }
  }
}

impl Default for ServerStateMachine {
  fn default() -> Self {
    Self::new()
  }
}

fn status_name(s: StatusCode) -> &'static str {
  match s {
    StatusCode::Pending => "Pending",
    StatusCode::Active => "Active",
    StatusCode::Preempted => "Preempted",
    StatusCode::Succeeded => "Succeeded",
    StatusCode::Aborted => "Aborted",
    StatusCode::Rejected => "Rejected",
    StatusCode::Preempting => "Preempting",
    StatusCode::Recalling => "Recalling",
    StatusCode::Recalled => "Recalled",
    StatusCode::Lost => "Lost",
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use test_case::test_case;

  #[test_case(StatusCode::Pending, ServerEvent::Accept, StatusCode::Active)]
  #[test_case(StatusCode::Pending, ServerEvent::Reject, StatusCode::Rejected)]
  #[test_case(StatusCode::Pending, ServerEvent::CancelRequest, StatusCode::Recalling)]
  #[test_case(StatusCode::Active, ServerEvent::CancelRequest, StatusCode::Preempting)]
  #[test_case(StatusCode::Preempting, ServerEvent::Cancel, StatusCode::Preempted)]
  #[test_case(StatusCode::Active, ServerEvent::Succeed, StatusCode::Succeeded)]
  fn legal_transition(from: StatusCode, event: ServerEvent, expect: StatusCode) {
    let mut sm = ServerStateMachine { state: from };
    let next = sm.apply(event).unwrap();
    assert_eq!(next, expect);
    assert_eq!(sm.state(), expect);
  }

  #[test]
  fn accept_on_active_is_invalid() {
    let mut sm = ServerStateMachine { state: StatusCode::Active };
    assert!(sm.apply(ServerEvent::Accept).is_err());
  }

  #[test]
  fn terminal_state_rejects_every_event() {
    let mut sm = ServerStateMachine { state: StatusCode::Succeeded };
    for event in [
      ServerEvent::Accept,
      ServerEvent::Reject,
      ServerEvent::CancelRequest,
      ServerEvent::Cancel,
      ServerEvent::Abort,
      ServerEvent::Succeed,
    ] {
      assert!(sm.apply(event).is_err());
    }
    assert_eq!(sm.state(), StatusCode::Succeeded);
  }
}
