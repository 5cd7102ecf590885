//! Treeload execution engine
//!
//! Connection workers, the transports they speak over, and the orchestrator
//! that runs a population of them against one shared ground truth.

pub mod error;
pub mod machine;
pub mod orchestrator;
pub mod received;
pub mod settings;
pub mod state;
pub mod summary;
pub mod transport;
pub mod worker;

// Re-export main types
pub use error::{ExecutionError, TransportError};
pub use machine::{Action, CheckResult, WorkerEvent, WorkerMachine, COMPLETENESS_CHECK, ORDER_CHECK};
pub use orchestrator::Orchestrator;
pub use received::ReceivedSet;
pub use settings::WorkerSettings;
pub use state::WorkerState;
pub use summary::{CheckTally, RunSummary, WORKER_REPORTED_CHECK};
pub use transport::{Connection, Connector, Frame, LoopbackHub, Transport, WebSocketConnector};
pub use worker::{ConnectionWorker, WorkerReport};
