//! Agent → orchestrator messages
//!
//! Every value the agent writes to the channel is an [`AgentMessage`].
//! The orchestrator decodes the same type.

use super::event::TestEventBatch;
use crate::marshal::MarshalledError;
use serde::{Deserialize, Serialize};

/// Log line forwarded to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "message", rename_all = "camelCase")]
pub enum LogMessage {
    Error(String),
    Warn(String),
    Info(String),
    Debug(String),
    Trace(MarshalledError),
}

impl LogMessage {
    pub fn level(&self) -> &'static str {
        match self {
            Self::Error(_) => "error",
            Self::Warn(_) => "warn",
            Self::Info(_) => "info",
            Self::Debug(_) => "debug",
            Self::Trace(_) => "trace",
        }
    }

    /// Text of a leveled message; `None` for `Trace`.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Error(s) | Self::Warn(s) | Self::Info(s) | Self::Debug(s) => Some(s),
            Self::Trace(_) => None,
        }
    }
}

/// 에이전트가 보내는 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentMessage {
    Log(LogMessage),

    /// Raw failure payload
    Trace(MarshalledError),

    TestEvents(TestEventBatch),

    /// Completion sentinel
    Done,
}

impl AgentMessage {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<LogMessage> for AgentMessage {
    fn from(log: LogMessage) -> Self {
        Self::Log(log)
    }
}

impl From<TestEventBatch> for AgentMessage {
    fn from(batch: TestEventBatch) -> Self {
        Self::TestEvents(batch)
    }
}
