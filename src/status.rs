//! Wire-level goal status: the closed `StatusCode` enumeration, `GoalStatus`,
//! and `StatusArray`.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{builtin_interfaces::Time, goal_id::GoalID, message::Message};

/// Closed set of wire-level goal status values.
///
/// `Lost` (9) is never sent by a server; it is a client-side inference, kept
/// in this enum so `ClientGoalHandle::get_goal_status` can report it using
/// the same vocabulary as every other terminal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum StatusCode {
  Pending = 0,
  Active = 1,
  Preempted = 2,
  Succeeded = 3,
  Aborted = 4,
  Rejected = 5,
  Preempting = 6,
  Recalling = 7,
  Recalled = 8,
  Lost = 9,
}

impl StatusCode {
  /// Terminal codes: {Preempted, Succeeded, Aborted, Rejected, Recalled, Lost}.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      StatusCode::Preempted
        | StatusCode::Succeeded
        | StatusCode::Aborted
        | StatusCode::Rejected
        | StatusCode::Recalled
        | StatusCode::Lost
    )
  }
}

/// One goal's current status, as reported by the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalStatus {
  pub goal_id: GoalID,
  pub status: StatusCode,
  pub text: String,
}
impl Message for GoalStatus {}

impl GoalStatus {
  pub fn new(goal_id: GoalID, status: StatusCode) -> Self {
    GoalStatus { goal_id, status, text: String::new() }
  }

  pub fn with_text(goal_id: GoalID, status: StatusCode, text: impl Into<String>) -> Self {
    GoalStatus { goal_id, status, text: text.into() }
  }
}

/// Header shared by `StatusArray`/`ActionGoal`/`ActionFeedback`/`ActionResult`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Header {
  pub stamp: Time,
  pub frame_id: String,
}

/// The complete current view of all active goals known to a server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusArray {
  pub header: Header,
  pub status_list: Vec<GoalStatus>,
}
impl Message for StatusArray {}

impl StatusArray {
  pub fn new(status_list: Vec<GoalStatus>) -> Self {
    StatusArray {
      header: Header { stamp: Time::now(), frame_id: String::new() },
      status_list,
    }
  }

  pub fn find(&self, id: &str) -> Option<&GoalStatus> {
    self.status_list.iter().find(|s| s.goal_id.id == id)
  }
}
