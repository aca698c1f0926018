//! Wire envelopes carrying the opaque user payload: `ActionGoal`,
//! `ActionFeedback`, `ActionResult`.

use serde::{Deserialize, Serialize};

use crate::{
  goal_id::GoalID,
  message::Message,
  status::{GoalStatus, Header},
};

/// A goal as published by the client. Immutable once created; the client
/// goal handle keeps a copy around so it can be republished verbatim on
/// `resend_goal`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionGoal<G: Message> {
  pub header: Header,
  pub goal_id: GoalID,
  pub goal: G,
}
impl<G: Message> Message for ActionGoal<G> {}

/// One feedback sample for a goal, published by the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionFeedback<F: Message> {
  pub header: Header,
  pub status: GoalStatus,
  pub feedback: F,
}
impl<F: Message> Message for ActionFeedback<F> {}

/// The terminal result for a goal, published by the server at most once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionResult<R: Message> {
  pub header: Header,
  pub status: GoalStatus,
  pub result: R,
}
impl<R: Message> Message for ActionResult<R> {}
