//! An implementation of the classic action protocol: a client submits a
//! goal, the server streams feedback while it works and eventually reports
//! a terminal result, and either side can track or request cancellation
//! along the way.
//!
//! # Example
//!
//! ```no_run
//! use ros_actionlib::{Action, ActionClient, ActionConfig, ActionServer, Context};
//! use std::time::Duration;
//!
//! let ctx = Context::new();
//! let node = ctx.new_node("fibonacci_node");
//!
//! type Fibonacci = Action<u32, Vec<u32>, Vec<u32>>;
//!
//! let server = ActionServer::<Fibonacci>::new(&node, "/fibonacci", ActionConfig::default());
//! server.register_goal_callback(|handle| {
//!   let _ = handle.accept();
//! });
//! server.start();
//!
//! let client = ActionClient::<Fibonacci>::new(&node, "/fibonacci");
//! client.wait_for_server(Duration::from_secs(1));
//! let handle = client.send_goal(10, None, None);
//! let _ = handle.get_comm_state();
//! ```

#[macro_use]
extern crate lazy_static;

/// Wire-level timestamp type shared by goal ids and status stamps.
pub mod builtin_interfaces;

pub mod action_client;
pub mod action_server;
pub mod action_types;
pub mod client_handle;
pub mod client_sm;
pub mod config;
pub mod envelope;
pub mod error;
pub mod goal_id;
pub mod server_handle;
pub mod server_sm;
pub mod simple_client;
pub mod simple_server;
pub mod status;
pub mod transport;

pub mod message;

#[cfg(test)]
mod integration_test;

// Re-exports from crate root to simplify usage
#[doc(inline)]
pub use action_client::ActionClient;
#[doc(inline)]
pub use action_server::ActionServer;
#[doc(inline)]
pub use action_types::{Action, ActionTypes};
#[doc(inline)]
pub use client_handle::ClientGoalHandle;
#[doc(inline)]
pub use client_sm::ClientState;
#[doc(inline)]
pub use config::ActionConfig;
#[doc(inline)]
pub use error::ActionError;
#[doc(inline)]
pub use goal_id::{GoalID, GoalIdGenerator};
#[doc(inline)]
pub use message::Message;
#[doc(inline)]
pub use server_handle::ServerGoalHandle;
#[doc(inline)]
pub use simple_client::SimpleActionClient;
#[doc(inline)]
pub use simple_server::SimpleActionServer;
#[doc(inline)]
pub use status::{GoalStatus, StatusCode};
#[doc(inline)]
pub use transport::{Context, Node};
