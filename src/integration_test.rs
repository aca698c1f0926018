//! End-to-end tests driving `ActionClient` and `ActionServer` together over
//! the in-process `transport`, rather than the isolated state-machine unit
//! tests that live alongside `client_sm`/`server_sm`.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc,
  },
  thread,
  time::{Duration, Instant},
};

use crate::{
  action_client::ActionClient,
  action_server::ActionServer,
  action_types::Action,
  config::ActionConfig,
  goal_id::GoalID,
  status::StatusCode,
  transport::Context,
};

type Fibonacci = Action<u32, Vec<u32>, u32>;

fn poll_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while !condition() {
    if Instant::now() >= deadline {
      return false;
    }
    thread::sleep(Duration::from_millis(5));
  }
  true
}

#[test]
fn happy_path_delivers_feedback_then_result() {
  let ctx = Context::new();
  let node = ctx.new_node("fib_node");

  let server = Arc::new(ActionServer::<Fibonacci>::new(&node, "/fibonacci", ActionConfig::default()));
  let server_for_cb = server.clone();
  server.register_goal_callback(move |handle| {
    let server = server_for_cb.clone();
    thread::spawn(move || {
      let _ = handle.accept();
      server.publish_feedback(&handle, 1);
      server.publish_feedback(&handle, 1);
      let _ = handle.set_succeeded("computed");
      server.publish_result(&handle, vec![0, 1, 1, 2, 3]);
    });
  });
  server.start();

  let client = ActionClient::<Fibonacci>::new(&node, "/fibonacci");
  assert!(client.wait_for_server(Duration::from_secs(1)));

  let feedback_count = Arc::new(AtomicUsize::new(0));
  let fc = feedback_count.clone();
  let (done_tx, done_rx) = mpsc::channel();

  let handle = client.send_goal(
    5,
    Some(Box::new(move |h: &crate::client_handle::ClientGoalHandle<Fibonacci>| {
      if h.get_comm_state() == crate::client_sm::ClientState::Done {
        let _ = done_tx.send(h.get_result());
      }
    })),
    Some(Box::new(move |_h, _fb: &u32| {
      fc.fetch_add(1, Ordering::SeqCst);
    })),
  );

  let result = done_rx.recv_timeout(Duration::from_secs(2)).expect("goal never completed").unwrap();
  assert_eq!(result, vec![0, 1, 1, 2, 3]);
  assert_eq!(handle.get_goal_status().unwrap().status, StatusCode::Succeeded);
  assert!(feedback_count.load(Ordering::SeqCst) >= 2);

  server.stop();
}

#[test]
fn cancel_during_execution_is_observed_by_the_executing_goal() {
  let ctx = Context::new();
  let node = ctx.new_node("fib_node");

  let server = Arc::new(ActionServer::<Fibonacci>::new(&node, "/fibonacci", ActionConfig::default()));
  let server_for_cb = server.clone();
  server.register_goal_callback(move |handle| {
    let server = server_for_cb.clone();
    thread::spawn(move || {
      let _ = handle.accept();
      let cancelled = poll_until(Duration::from_secs(2), || handle.is_cancel_requested());
      assert!(cancelled, "goal callback never observed the cancel request");
      let _ = handle.set_canceled("stopped early");
      server.publish_result(&handle, Vec::new());
    });
  });
  server.start();

  let client = ActionClient::<Fibonacci>::new(&node, "/fibonacci");
  assert!(client.wait_for_server(Duration::from_secs(1)));

  let (done_tx, done_rx) = mpsc::channel();
  let handle = client.send_goal(
    1000,
    Some(Box::new(move |h: &crate::client_handle::ClientGoalHandle<Fibonacci>| {
      if h.get_comm_state() == crate::client_sm::ClientState::Done {
        let _ = done_tx.send(());
      }
    })),
    None,
  );

  assert!(poll_until(Duration::from_secs(1), || handle.get_comm_state() == crate::client_sm::ClientState::Active));
  handle.cancel().unwrap();

  done_rx.recv_timeout(Duration::from_secs(2)).expect("cancellation never completed");
  assert_eq!(handle.get_goal_status().unwrap().status, StatusCode::Preempted);

  server.stop();
}

#[test]
fn duplicate_goal_id_is_registered_once() {
  let ctx = Context::new();
  let node = ctx.new_node("fib_node");

  let server = Arc::new(ActionServer::<Fibonacci>::new(&node, "/fibonacci", ActionConfig::default()));
  server.register_goal_callback(|handle| {
    let _ = handle.accept();
  });
  server.start();

  // Bypass ActionClient so both goals carry the identical GoalID, and watch
  // the status topic directly rather than reaching into server internals.
  let raw_goal_pub = node.create_publisher::<crate::envelope::ActionGoal<u32>>("/fibonacci/goal");
  let id = GoalID::new("dup-1".to_owned(), crate::builtin_interfaces::Time::now());
  let goal = crate::envelope::ActionGoal {
    header: crate::status::Header { stamp: id.stamp, frame_id: String::new() },
    goal_id: id.clone(),
    goal: 7,
  };

  let seen = Arc::new(AtomicUsize::new(0));
  let seen_cb = seen.clone();
  let id_for_cb = id.id.clone();
  let _status_sub = node.create_subscription::<crate::status::StatusArray, _>("/fibonacci/status", move |arr| {
    let count = arr.status_list.iter().filter(|s| s.goal_id.id == id_for_cb).count();
    seen_cb.store(count, Ordering::SeqCst);
  });

  raw_goal_pub.publish(&goal);
  thread::sleep(Duration::from_millis(60));
  raw_goal_pub.publish(&goal);

  assert!(poll_until(Duration::from_secs(1), || seen.load(Ordering::SeqCst) > 0));
  thread::sleep(Duration::from_millis(100));
  assert_eq!(seen.load(Ordering::SeqCst), 1, "duplicate goal id must not create a second handle");

  server.stop();
}

#[test]
fn cancel_all_goals_before_only_cancels_older_registrations() {
  let ctx = Context::new();
  let node = ctx.new_node("fib_node");

  let server = Arc::new(ActionServer::<Fibonacci>::new(&node, "/fibonacci", ActionConfig::default()));
  server.register_goal_callback(move |handle| {
    thread::spawn(move || {
      let _ = handle.accept();
      let cancelled = poll_until(Duration::from_secs(2), || handle.is_cancel_requested());
      if cancelled {
        let _ = handle.set_canceled("cut off by cancel_all_goals_before");
      }
    });
  });
  server.start();

  let client = ActionClient::<Fibonacci>::new(&node, "/fibonacci");
  assert!(client.wait_for_server(Duration::from_secs(1)));

  let h1 = client.send_goal(1, None, None);
  thread::sleep(Duration::from_millis(30));
  let cutoff = crate::builtin_interfaces::Time::now();
  thread::sleep(Duration::from_millis(30));
  let h2 = client.send_goal(2, None, None);

  client.cancel_all_goals_before(cutoff);

  let h1_terminal = poll_until(Duration::from_secs(2), || h1.get_goal_status().map(|s| s.status.is_terminal()).unwrap_or(false));
  assert!(h1_terminal, "goal registered before the cutoff should have been canceled");

  thread::sleep(Duration::from_millis(100));
  assert!(
    h2.get_goal_status().map(|s| !s.status.is_terminal()).unwrap_or(true),
    "goal registered after the cutoff should be unaffected"
  );

  server.stop();
}
