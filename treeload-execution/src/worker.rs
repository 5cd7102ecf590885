//! Connection worker driver
//!
//! Runs one [`WorkerMachine`] against a live [`Transport`]: owns the timers,
//! decodes inbound frames and performs the machine's actions.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep_until, timeout, timeout_at, Instant, Sleep};
use tracing::{debug, info, trace, warn};
use treeload_core::{Dataset, WorkerId};
use treeload_protocol::{Codec, InboundMessage, ProtocolError};

use crate::machine::{Action, CheckResult, WorkerEvent, WorkerMachine};
use crate::settings::WorkerSettings;
use crate::state::WorkerState;
use crate::transport::{Connector, Frame, Transport};

/// Upper bound on the close handshake once the machine asks for it
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// What one worker reports back to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerReport {
    pub worker_id: WorkerId,
    pub final_state: WorkerState,
    pub checks: Vec<CheckResult>,
    /// Distinct ground-truth records observed
    pub received: usize,
    /// Ground-truth size
    pub expected: usize,
    /// Records this worker sent
    pub shard: usize,
    pub failure: Option<String>,
    #[serde(with = "treeload_config::serde_duration_ms")]
    pub elapsed: Duration,
}

impl WorkerReport {
    fn from_machine(machine: WorkerMachine, elapsed: Duration) -> Self {
        Self {
            worker_id: machine.id(),
            final_state: machine.state(),
            checks: machine.checks().to_vec(),
            received: machine.received().len(),
            expected: machine.dataset().len(),
            shard: machine.shard_len(),
            failure: machine.failure().map(str::to_string),
            elapsed,
        }
    }

    /// Every recorded check passed
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    pub fn failed(&self) -> bool {
        self.final_state == WorkerState::Failed
    }
}

/// One-shot timer that can be re-armed
struct Timer {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl Timer {
    fn idle() -> Self {
        Self {
            sleep: Box::pin(sleep_until(Instant::now())),
            armed: false,
        }
    }

    fn arm(&mut self, after: Duration) {
        self.sleep.as_mut().reset(Instant::now() + after);
        self.armed = true;
    }
}

/// One simulated client
pub struct ConnectionWorker {
    id: WorkerId,
    dataset: Dataset,
    settings: Arc<WorkerSettings>,
    connector: Arc<dyn Connector>,
    codec: Codec,
}

impl ConnectionWorker {
    pub fn new(
        id: WorkerId,
        dataset: Dataset,
        settings: Arc<WorkerSettings>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let codec = Codec::new(settings.compressed_payloads);
        Self {
            id,
            dataset,
            settings,
            connector,
            codec,
        }
    }

    /// Run the full lifecycle; the deadline is measured from the call
    pub async fn run(self, send_delay: Duration) -> WorkerReport {
        let started = Instant::now();
        let deadline = started + self.settings.deadline;
        let mut machine = WorkerMachine::new(
            self.id,
            self.dataset.clone(),
            (*self.settings).clone(),
            send_delay,
        );
        machine.start();

        let connected = timeout_at(deadline, self.connector.connect(self.id)).await;
        let (mut transport, initial) = match connected {
            Ok(Ok(connection)) => {
                let actions = machine.handle(WorkerEvent::Connected {
                    status: connection.status,
                });
                (connection.transport, actions)
            }
            Ok(Err(e)) => {
                machine.handle(WorkerEvent::ConnectFailed {
                    reason: e.to_string(),
                    status: e.status(),
                });
                return self.finish(machine, started);
            }
            Err(_) => {
                machine.handle(WorkerEvent::DeadlineFired);
                return self.finish(machine, started);
            }
        };

        let mut send_timer = Timer::idle();
        let mut heartbeat_timer = Timer::idle();
        let mut heartbeat_period: Option<Duration> = None;
        let deadline_sleep = sleep_until(deadline);
        tokio::pin!(deadline_sleep);
        let mut inbound_open = true;
        let mut pending: VecDeque<Action> = initial.into();

        loop {
            while let Some(action) = pending.pop_front() {
                match action {
                    Action::Send(message) => {
                        let frame = match self.codec.encode(&message) {
                            Ok(frame) => frame,
                            Err(e) => {
                                let reason = e.to_string();
                                pending.extend(machine.handle(WorkerEvent::TransportFailed { reason }));
                                continue;
                            }
                        };
                        // A stalled send must not outlive the deadline
                        match timeout_at(deadline, transport.send(frame)).await {
                            Ok(Ok(())) => trace!(worker_id = %self.id, kind = message.kind(), "Sent"),
                            Ok(Err(e)) => pending.extend(machine.handle(WorkerEvent::TransportFailed {
                                reason: e.to_string(),
                            })),
                            Err(_) => {
                                debug!(worker_id = %self.id, kind = message.kind(), "Deadline reached during send");
                                pending.extend(machine.handle(WorkerEvent::DeadlineFired));
                            }
                        }
                    }
                    Action::ArmSendTimer(after) => send_timer.arm(after),
                    Action::StartHeartbeat(period) => {
                        heartbeat_period = Some(period);
                        heartbeat_timer.arm(period);
                    }
                    Action::Close => match timeout(CLOSE_TIMEOUT, transport.close()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => debug!(worker_id = %self.id, error = %e, "Close failed"),
                        Err(_) => debug!(worker_id = %self.id, "Close timed out, abandoning transport"),
                    },
                }
            }

            if machine.state().is_terminal() {
                break;
            }

            let event = tokio::select! {
                biased;

                _ = &mut deadline_sleep => WorkerEvent::DeadlineFired,

                _ = &mut send_timer.sleep, if send_timer.armed => {
                    send_timer.armed = false;
                    WorkerEvent::SendTimerFired
                }

                _ = &mut heartbeat_timer.sleep, if heartbeat_timer.armed => {
                    match heartbeat_period {
                        Some(period) => heartbeat_timer.arm(period),
                        None => heartbeat_timer.armed = false,
                    }
                    WorkerEvent::HeartbeatFired
                }

                frame = transport.recv(), if inbound_open => match frame {
                    Ok(Some(frame)) => match self.decode(frame) {
                        Ok(message) => WorkerEvent::Inbound(message),
                        Err(e) => {
                            trace!(worker_id = %self.id, error = %e, "Dropping undecodable message");
                            continue;
                        }
                    },
                    Ok(None) => {
                        debug!(worker_id = %self.id, "Peer closed the connection, waiting for deadline");
                        inbound_open = false;
                        continue;
                    }
                    Err(e) => WorkerEvent::TransportFailed { reason: e.to_string() },
                },
            };

            pending.extend(machine.handle(event));
        }

        self.finish(machine, started)
    }

    fn decode(&self, frame: Frame) -> Result<InboundMessage, ProtocolError> {
        match frame {
            Frame::Binary(bytes) => self.codec.decode(&bytes),
            Frame::Text(text) => self.codec.decode_text(&text),
        }
    }

    fn finish(&self, machine: WorkerMachine, started: Instant) -> WorkerReport {
        let report = WorkerReport::from_machine(machine, started.elapsed());
        if report.passed() {
            info!(
                worker_id = %report.worker_id,
                received = report.received,
                expected = report.expected,
                "Worker passed"
            );
        } else {
            warn!(
                worker_id = %report.worker_id,
                state = %report.final_state,
                received = report.received,
                expected = report.expected,
                failure = report.failure.as_deref().unwrap_or(""),
                "Worker failed checks"
            );
        }
        report
    }
}
