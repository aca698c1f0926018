//! `ActionTypes`: the capability trait that names an action's three payload
//! types, and `Action<G, R, F>`, a convenience implementor for ad hoc use.

use crate::message::Message;

/// Names the goal, result, and feedback payload types of one action.
/// Implemented once per action definition (e.g. "Fibonacci") and used as
/// the type parameter of `ActionClient`/`ActionServer`.
pub trait ActionTypes {
  type GoalType: Message + Clone + Send + Sync + 'static;
  type ResultType: Message + Clone + Send + Sync + 'static;
  type FeedbackType: Message + Clone + Send + Sync + 'static;

  fn goal_type_name() -> String;
  fn result_type_name() -> String;
  fn feedback_type_name() -> String;
}

/// A ready-made `ActionTypes` implementor, parameterized directly over the
/// three payload types. Saves having to declare a marker struct for simple
/// or ad hoc actions.
pub struct Action<G, R, F> {
  g: std::marker::PhantomData<G>,
  r: std::marker::PhantomData<R>,
  f: std::marker::PhantomData<F>,
}

impl<G, R, F> ActionTypes for Action<G, R, F>
where
  G: Message + Clone + Send + Sync + 'static,
  R: Message + Clone + Send + Sync + 'static,
  F: Message + Clone + Send + Sync + 'static,
{
  type GoalType = G;
  type ResultType = R;
  type FeedbackType = F;

  fn goal_type_name() -> String {
    std::any::type_name::<G>().to_string()
  }
  fn result_type_name() -> String {
    std::any::type_name::<R>().to_string()
  }
  fn feedback_type_name() -> String {
    std::any::type_name::<F>().to_string()
  }
}
