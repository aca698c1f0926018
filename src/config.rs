//! Per-action-instance configuration, built the way `NodeOptions` is built.

/// Configuration parameters for one action client/server instance.
///
/// Construct with `ActionConfig::new()` and chain the `with_*` builders;
/// unset fields take the defaults actionlib implementations conventionally
/// use.
#[must_use]
#[derive(Clone, Copy, Debug)]
pub struct ActionConfig {
  status_publish_rate_hz: f64,
  status_list_timeout_sec: f64,
  goal_timestamp_tolerance_sec: f64,
}

impl ActionConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Rate at which the server emits a full `StatusArray` heartbeat.
  pub fn with_status_publish_rate_hz(mut self, hz: f64) -> Self {
    self.status_publish_rate_hz = hz;
    self
  }

  /// Delay after a goal reaches a terminal state before its handle is reaped.
  pub fn with_status_list_timeout_sec(mut self, sec: f64) -> Self {
    self.status_list_timeout_sec = sec;
    self
  }

  /// Reject goals whose timestamp is older than this many seconds.
  /// `0.0` (the default) disables the check.
  pub fn with_goal_timestamp_tolerance_sec(mut self, sec: f64) -> Self {
    self.goal_timestamp_tolerance_sec = sec;
    self
  }

  pub fn status_publish_rate_hz(&self) -> f64 {
    self.status_publish_rate_hz
  }

  pub fn status_list_timeout_sec(&self) -> f64 {
    self.status_list_timeout_sec
  }

  pub fn goal_timestamp_tolerance_sec(&self) -> f64 {
    self.goal_timestamp_tolerance_sec
  }
}

impl Default for ActionConfig {
  fn default() -> Self {
    ActionConfig {
      status_publish_rate_hz: 5.0,
      status_list_timeout_sec: 5.0,
      goal_timestamp_tolerance_sec: 0.0,
    }
  }
}
