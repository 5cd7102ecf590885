//! Event-driven connection worker state machine
//!
//! The machine owns no I/O. The driver in [`crate::worker`] feeds it
//! [`WorkerEvent`]s (connection result, timer fires, decoded inbound
//! messages) and performs the [`Action`]s it returns. Keeping the lifecycle
//! here makes every transition testable without a transport or a clock.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};
use treeload_core::{ChangeRecord, Dataset, WorkerId};
use treeload_protocol::{InboundMessage, OutboundMessage};

use crate::received::ReceivedSet;
use crate::settings::WorkerSettings;
use crate::state::WorkerState;

/// Name of the completeness check
pub const COMPLETENESS_CHECK: &str = "all changes received";

/// Name of the ordering check
pub const ORDER_CHECK: &str = "changes in ground-truth order";

/// Something that happened to the worker
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Transport opened with the given handshake status
    Connected { status: u16 },
    /// Transport could not be opened
    ConnectFailed { reason: String, status: Option<u16> },
    /// The send delay (or batch spacing) elapsed
    SendTimerFired,
    HeartbeatFired,
    /// A decoded message arrived
    Inbound(InboundMessage),
    /// A send or receive on an open transport failed
    TransportFailed { reason: String },
    DeadlineFired,
}

/// Something the driver must do on the machine's behalf
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(OutboundMessage),
    ArmSendTimer(Duration),
    StartHeartbeat(Duration),
    Close,
}

/// Outcome of one named boolean check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, passed: bool) -> Self {
        Self {
            name: name.into(),
            passed,
        }
    }
}

/// Lifecycle of one simulated client
#[derive(Debug)]
pub struct WorkerMachine {
    id: WorkerId,
    dataset: Dataset,
    settings: WorkerSettings,
    send_delay: Duration,
    state: WorkerState,
    history: Vec<WorkerState>,
    pending_batches: VecDeque<Vec<ChangeRecord>>,
    shard_len: usize,
    received: ReceivedSet,
    checks: Vec<CheckResult>,
    failure: Option<String>,
}

impl WorkerMachine {
    pub fn new(
        id: WorkerId,
        dataset: Dataset,
        settings: WorkerSettings,
        send_delay: Duration,
    ) -> Self {
        Self {
            id,
            dataset,
            settings,
            send_delay,
            state: WorkerState::Init,
            history: vec![WorkerState::Init],
            pending_batches: VecDeque::new(),
            shard_len: 0,
            received: ReceivedSet::new(),
            checks: Vec::new(),
            failure: None,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[WorkerState] {
        &self.history
    }

    pub fn received(&self) -> &ReceivedSet {
        &self.received
    }

    pub fn received_mut(&mut self) -> &mut ReceivedSet {
        &mut self.received
    }

    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Number of records in this worker's shard, known once connected
    pub fn shard_len(&self) -> usize {
        self.shard_len
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// INIT → CONNECTING
    pub fn start(&mut self) {
        if self.state == WorkerState::Init {
            self.transition(WorkerState::Connecting);
        }
    }

    /// Apply one event and return the actions the driver must perform
    pub fn handle(&mut self, event: WorkerEvent) -> Vec<Action> {
        if self.state.is_terminal() {
            trace!(worker_id = %self.id, state = %self.state, ?event, "Ignoring event after termination");
            return Vec::new();
        }

        match event {
            WorkerEvent::Connected { status } => self.on_connected(status),
            WorkerEvent::ConnectFailed { reason, status } => self.on_connect_failed(reason, status),
            WorkerEvent::SendTimerFired => self.on_send_timer(),
            WorkerEvent::HeartbeatFired => self.on_heartbeat(),
            WorkerEvent::Inbound(message) => {
                self.on_inbound(message);
                Vec::new()
            }
            WorkerEvent::TransportFailed { reason } => self.on_transport_failed(reason),
            WorkerEvent::DeadlineFired => self.on_deadline(),
        }
    }

    fn on_connected(&mut self, status: u16) -> Vec<Action> {
        if self.state != WorkerState::Connecting {
            return Vec::new();
        }

        if status != self.settings.expected_status {
            self.record_status_check(false);
            self.fail(format!("Unexpected handshake status {}", status));
            return vec![Action::Close];
        }

        self.record_status_check(true);
        self.transition(WorkerState::Connected);

        let mut actions = vec![Action::Send(OutboundMessage::Connect {
            batch_size: self.settings.batch_size,
        })];

        let shard = self.dataset.shard(self.id);
        self.shard_len = shard.len();
        self.pending_batches = split_batches(shard, self.settings.send_batches);
        debug!(
            worker_id = %self.id,
            shard = self.shard_len,
            batches = self.pending_batches.len(),
            delay_ms = self.send_delay.as_millis() as u64,
            "Shard computed, send scheduled"
        );

        self.transition(WorkerState::SendScheduled);
        actions.push(Action::ArmSendTimer(self.send_delay));
        actions
    }

    fn on_connect_failed(&mut self, reason: String, status: Option<u16>) -> Vec<Action> {
        if self.state != WorkerState::Connecting {
            return Vec::new();
        }
        debug!(worker_id = %self.id, ?status, %reason, "Connection failed");
        self.record_status_check(false);
        self.fail(reason);
        Vec::new()
    }

    fn on_send_timer(&mut self) -> Vec<Action> {
        if self.state != WorkerState::SendScheduled {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if let Some(batch) = self.pending_batches.pop_front() {
            actions.push(Action::Send(OutboundMessage::Changes { payload: batch }));
        }

        if !self.pending_batches.is_empty() {
            actions.push(Action::ArmSendTimer(self.settings.batch_spacing));
            return actions;
        }

        self.transition(WorkerState::Sent);
        match self.settings.heartbeat_interval {
            Some(interval) => {
                self.transition(WorkerState::Heartbeating);
                actions.push(Action::StartHeartbeat(interval));
            }
            None => self.transition(WorkerState::Receiving),
        }
        actions
    }

    fn on_heartbeat(&mut self) -> Vec<Action> {
        if self.state != WorkerState::Heartbeating {
            return Vec::new();
        }
        vec![Action::Send(OutboundMessage::Ping)]
    }

    fn on_inbound(&mut self, message: InboundMessage) {
        if !self.state.is_connected() {
            return;
        }

        let kind = message.response_type();
        for record in message.into_edits() {
            if !self.dataset.contains(&record.path) {
                trace!(worker_id = %self.id, path = %record.path, "Dropping edit outside the ground truth");
                continue;
            }
            self.received.insert(record);
        }
        trace!(worker_id = %self.id, response_type = %kind, received = self.received.len(), "Inbound message handled");
    }

    fn on_transport_failed(&mut self, reason: String) -> Vec<Action> {
        if !self.state.is_connected() {
            return Vec::new();
        }
        if self.settings.verify_completeness {
            self.checks.push(CheckResult::new(COMPLETENESS_CHECK, false));
        }
        self.fail(reason);
        vec![Action::Close]
    }

    fn on_deadline(&mut self) -> Vec<Action> {
        if self.state == WorkerState::Connecting {
            self.record_status_check(false);
            self.fail("Deadline reached while connecting".to_string());
            return Vec::new();
        }

        self.transition(WorkerState::Deadline);

        let expected = self.dataset.len();
        let received = self.received.len();
        if self.settings.verify_completeness {
            self.checks
                .push(CheckResult::new(COMPLETENESS_CHECK, received == expected));
        }
        if self.settings.verify_order {
            self.checks.push(CheckResult::new(
                ORDER_CHECK,
                self.received.is_in_order_of(&self.dataset),
            ));
        }
        debug!(worker_id = %self.id, received, expected, "Deadline reached, verified");

        self.transition(WorkerState::Closed);
        vec![Action::Close]
    }

    fn record_status_check(&mut self, passed: bool) {
        self.checks
            .push(CheckResult::new(self.settings.status_check_name(), passed));
    }

    fn fail(&mut self, reason: String) {
        self.failure = Some(reason);
        self.transition(WorkerState::Failed);
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(worker_id = %self.id, from = %self.state, state = %next, "Worker transition");
        self.state = next;
        self.history.push(next);
    }
}

/// Split a shard into at most `batches` contiguous, non-empty chunks
pub fn split_batches(shard: Vec<ChangeRecord>, batches: u32) -> VecDeque<Vec<ChangeRecord>> {
    if shard.is_empty() {
        return VecDeque::new();
    }
    let batches = batches.max(1) as usize;
    let chunk = shard.len().div_ceil(batches);
    shard.chunks(chunk).map(<[ChangeRecord]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use treeload_core::generate_seeded;

    const DELAY: Duration = Duration::from_millis(700);

    fn machine(id: u32, records: i64, settings: WorkerSettings) -> WorkerMachine {
        let dataset = generate_seeded(records, 4, 99).unwrap();
        WorkerMachine::new(WorkerId::new(id).unwrap(), dataset, settings, DELAY)
    }

    fn connected(id: u32, records: i64, settings: WorkerSettings) -> WorkerMachine {
        let mut m = machine(id, records, settings);
        m.start();
        m.handle(WorkerEvent::Connected { status: 101 });
        m
    }

    fn deliver_all(m: &mut WorkerMachine) {
        let records: Vec<_> = m.dataset().iter().cloned().collect();
        for record in records {
            m.handle(WorkerEvent::Inbound(InboundMessage::Add(record)));
        }
    }

    fn check(m: &WorkerMachine, name: &str) -> Option<bool> {
        m.checks().iter().find(|c| c.name == name).map(|c| c.passed)
    }

    #[test]
    fn test_connect_sends_announce_and_arms_timer() {
        let settings = WorkerSettings {
            batch_size: Some(10),
            ..Default::default()
        };
        let mut m = machine(1, 5, settings);
        m.start();
        let actions = m.handle(WorkerEvent::Connected { status: 101 });

        assert_eq!(
            actions,
            vec![
                Action::Send(OutboundMessage::Connect { batch_size: Some(10) }),
                Action::ArmSendTimer(DELAY),
            ]
        );
        assert_eq!(m.state(), WorkerState::SendScheduled);
        assert_eq!(m.shard_len(), 5);
        assert_eq!(check(&m, "status is 101"), Some(true));
    }

    #[test]
    fn test_send_timer_sends_shard() {
        let mut m = connected(2, 5, WorkerSettings::default());
        let actions = m.handle(WorkerEvent::SendTimerFired);

        let expected: Vec<_> = m.dataset().iter().step_by(2).cloned().collect();
        assert_eq!(actions, vec![Action::Send(OutboundMessage::Changes { payload: expected })]);
        assert_eq!(m.state(), WorkerState::Receiving);
        assert_eq!(
            m.history(),
            &[
                WorkerState::Init,
                WorkerState::Connecting,
                WorkerState::Connected,
                WorkerState::SendScheduled,
                WorkerState::Sent,
                WorkerState::Receiving,
            ]
        );
    }

    #[test]
    fn test_heartbeat_after_send() {
        let settings = WorkerSettings {
            heartbeat_interval: Some(Duration::from_secs(2)),
            ..Default::default()
        };
        let mut m = connected(1, 3, settings);

        // Heartbeat before the send is not yet armed
        assert!(m.handle(WorkerEvent::HeartbeatFired).is_empty());

        let actions = m.handle(WorkerEvent::SendTimerFired);
        assert_eq!(actions.last(), Some(&Action::StartHeartbeat(Duration::from_secs(2))));
        assert_eq!(m.state(), WorkerState::Heartbeating);
        assert_eq!(
            m.handle(WorkerEvent::HeartbeatFired),
            vec![Action::Send(OutboundMessage::Ping)]
        );
    }

    #[test]
    fn test_multi_batch_schedule() {
        let settings = WorkerSettings {
            send_batches: 3,
            batch_spacing: Duration::from_secs(1),
            ..Default::default()
        };
        let mut m = connected(1, 7, settings);

        let first = m.handle(WorkerEvent::SendTimerFired);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1], Action::ArmSendTimer(Duration::from_secs(1)));
        assert_eq!(m.state(), WorkerState::SendScheduled);

        m.handle(WorkerEvent::SendTimerFired);
        assert_eq!(m.state(), WorkerState::SendScheduled);

        let last = m.handle(WorkerEvent::SendTimerFired);
        assert_eq!(m.state(), WorkerState::Receiving);
        match &last[0] {
            Action::Send(OutboundMessage::Changes { payload }) => assert_eq!(payload.len(), 1),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_split_batches() {
        let dataset = generate_seeded(7, 2, 1).unwrap();
        let records: Vec<_> = dataset.iter().cloned().collect();

        let sizes: Vec<_> = split_batches(records.clone(), 3).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);

        let sizes: Vec<_> = split_batches(records.clone(), 10).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1; 7]);

        assert_eq!(split_batches(records, 1).len(), 1);
        assert!(split_batches(Vec::new(), 4).is_empty());
    }

    #[test]
    fn test_empty_shard_sends_nothing() {
        let mut m = connected(1, 0, WorkerSettings::default());
        assert!(m.handle(WorkerEvent::SendTimerFired).is_empty());
        assert_eq!(m.state(), WorkerState::Receiving);
    }

    #[test]
    fn test_complete_delivery_passes() {
        let mut m = connected(1, 5, WorkerSettings::default());
        m.handle(WorkerEvent::SendTimerFired);
        deliver_all(&mut m);

        assert_eq!(m.handle(WorkerEvent::DeadlineFired), vec![Action::Close]);
        assert_eq!(m.state(), WorkerState::Closed);
        assert_eq!(check(&m, COMPLETENESS_CHECK), Some(true));
    }

    #[test]
    fn test_missing_record_fails_completeness() {
        let mut m = connected(1, 5, WorkerSettings::default());
        deliver_all(&mut m);
        let victim = m.dataset().records()[2].path.clone();
        m.received_mut().remove(&victim);

        m.handle(WorkerEvent::DeadlineFired);
        assert_eq!(check(&m, COMPLETENESS_CHECK), Some(false));
        assert_eq!(m.state(), WorkerState::Closed);
    }

    #[test]
    fn test_duplicates_and_foreign_paths_are_ignored() {
        let mut m = connected(1, 3, WorkerSettings::default());
        deliver_all(&mut m);
        deliver_all(&mut m);

        let foreign = m.dataset().records()[0]
            .path
            .child(treeload_core::Step::right(123_456));
        m.handle(WorkerEvent::Inbound(InboundMessage::Add(ChangeRecord::new(foreign, 'x'))));

        assert_eq!(m.received().len(), 3);
    }

    #[test]
    fn test_events_after_close_are_noops() {
        let mut m = connected(1, 2, WorkerSettings::default());
        m.handle(WorkerEvent::DeadlineFired);
        let checks_before = m.checks().to_vec();
        let history_len = m.history().len();

        assert!(m.handle(WorkerEvent::SendTimerFired).is_empty());
        assert!(m.handle(WorkerEvent::HeartbeatFired).is_empty());
        assert!(m.handle(WorkerEvent::DeadlineFired).is_empty());
        assert!(m
            .handle(WorkerEvent::TransportFailed { reason: "reset".to_string() })
            .is_empty());
        let record = m.dataset().records()[0].clone();
        assert!(m.handle(WorkerEvent::Inbound(InboundMessage::Add(record))).is_empty());

        assert_eq!(m.state(), WorkerState::Closed);
        assert_eq!(m.checks(), checks_before.as_slice());
        assert_eq!(m.history().len(), history_len);
        assert!(m.received().is_empty());
    }

    #[test]
    fn test_connect_failure_records_failed_status() {
        let mut m = machine(3, 5, WorkerSettings::default());
        m.start();
        let actions = m.handle(WorkerEvent::ConnectFailed {
            reason: "refused".to_string(),
            status: None,
        });

        assert!(actions.is_empty());
        assert_eq!(m.state(), WorkerState::Failed);
        assert_eq!(m.failure(), Some("refused"));
        assert_eq!(m.checks(), &[CheckResult::new("status is 101", false)]);

        // FAILED is absorbing
        assert!(m.handle(WorkerEvent::DeadlineFired).is_empty());
        assert_eq!(m.checks().len(), 1);
    }

    #[test]
    fn test_unexpected_status_fails() {
        let mut m = machine(1, 5, WorkerSettings::default());
        m.start();
        assert_eq!(m.handle(WorkerEvent::Connected { status: 200 }), vec![Action::Close]);
        assert_eq!(m.state(), WorkerState::Failed);
        assert_eq!(check(&m, "status is 101"), Some(false));
    }

    #[test]
    fn test_transport_failure_after_connect() {
        let mut m = connected(1, 5, WorkerSettings::default());
        let actions = m.handle(WorkerEvent::TransportFailed {
            reason: "reset by peer".to_string(),
        });
        assert_eq!(actions, vec![Action::Close]);
        assert_eq!(m.state(), WorkerState::Failed);
        assert_eq!(check(&m, "status is 101"), Some(true));
        assert_eq!(check(&m, COMPLETENESS_CHECK), Some(false));
    }

    #[test]
    fn test_order_check_when_enabled() {
        let settings = WorkerSettings {
            verify_order: true,
            ..Default::default()
        };
        let mut m = connected(1, 6, settings);
        deliver_all(&mut m);
        m.handle(WorkerEvent::DeadlineFired);
        assert_eq!(check(&m, ORDER_CHECK), Some(true));
        assert_eq!(m.checks().len(), 3);
    }

    #[test]
    fn test_completeness_can_be_disabled() {
        let settings = WorkerSettings {
            verify_completeness: false,
            ..Default::default()
        };
        let mut m = connected(1, 6, settings);
        m.handle(WorkerEvent::DeadlineFired);
        assert_eq!(check(&m, COMPLETENESS_CHECK), None);
        assert_eq!(m.checks().len(), 1);
    }
}
