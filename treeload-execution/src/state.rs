//! Connection worker lifecycle states

use serde::Serialize;
use std::fmt;

/// Lifecycle of one simulated client.
///
/// `Closed` and `Failed` are absorbing; every event that arrives after either
/// is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    Init,
    Connecting,
    Connected,
    SendScheduled,
    Sent,
    Heartbeating,
    Receiving,
    Deadline,
    Closed,
    Failed,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Init => "INIT",
            WorkerState::Connecting => "CONNECTING",
            WorkerState::Connected => "CONNECTED",
            WorkerState::SendScheduled => "SEND_SCHEDULED",
            WorkerState::Sent => "SENT",
            WorkerState::Heartbeating => "HEARTBEATING",
            WorkerState::Receiving => "RECEIVING",
            WorkerState::Deadline => "DEADLINE",
            WorkerState::Closed => "CLOSED",
            WorkerState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Closed | WorkerState::Failed)
    }

    /// The transport is open and inbound messages are accepted
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            WorkerState::Connected
                | WorkerState::SendScheduled
                | WorkerState::Sent
                | WorkerState::Heartbeating
                | WorkerState::Receiving
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
