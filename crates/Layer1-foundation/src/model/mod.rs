//! Wire data model
//!
//! Plain values exchanged between the agent and the orchestrator.

mod event;
mod fingerprint;
mod message;

pub use event::{Event, TestEventBatch, TestResult};
pub use fingerprint::{Fingerprint, FingerprintKind};
pub use message::{AgentMessage, LogMessage};
pub use test::{FrameworkDescriptor, TestDefinition};
