//! Error type for the action protocol core.

use std::fmt;

use crate::client_sm::ClientState;

/// Failure outcomes reported by the action machinery.
///
/// None of these unwind across an API boundary: every fallible operation
/// returns a `Result<_, ActionError>` and the caller decides what to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionError {
  /// A client-side state machine received an event that is illegal in its
  /// current state.
  InvalidClientTransition { from: ClientState, event: &'static str },

  /// A server-side state machine received an event that is illegal in its
  /// current state.
  InvalidServerTransition { from: &'static str, event: &'static str },

  /// A goal id that is already registered was submitted again.
  DuplicateGoal,

  /// A goal's timestamp was older than the configured tolerance.
  StaleGoal,

  /// An operation was attempted on a handle that has been shut down.
  InactiveHandle,

  /// The server stopped reporting a goal the client was still tracking.
  LostGoal,

  /// `get_result` was called before a result had arrived.
  MissingResult,
}

impl fmt::Display for ActionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ActionError::InvalidClientTransition { from, event } => {
        write!(f, "invalid client transition: event {event:?} in state {from:?}")
      }
      ActionError::InvalidServerTransition { from, event } => {
        write!(f, "invalid server transition: event {event} in state {from}")
      }
      ActionError::DuplicateGoal => write!(f, "duplicate goal id"),
      ActionError::StaleGoal => write!(f, "goal timestamp older than configured tolerance"),
      ActionError::InactiveHandle => write!(f, "operation on a shut-down handle"),
      ActionError::LostGoal => write!(f, "goal lost: server stopped reporting it"),
      ActionError::MissingResult => write!(f, "no result received yet"),
    }
  }
}

impl std::error::Error for ActionError {}
