//! Remote Logger - 프레임워크 로그를 오케스트레이터로 전달
//!
//! Each call becomes exactly one [`LogMessage`] on the channel. There is no
//! level filtering and no batching; the orchestrator decides what to show.

use crate::wire::MessageSender;
use forkrun_foundation::{marshal, AgentMessage, LogMessage, MarshalledError, Result};

/// Logger handed to every loaded framework.
#[derive(Clone)]
pub struct RemoteLogger {
    sender: MessageSender,
    ansi_codes_supported: bool,
}

impl RemoteLogger {
    pub fn new(sender: MessageSender, ansi_codes_supported: bool) -> Self {
        Self {
            sender,
            ansi_codes_supported,
        }
    }

    /// Whether the orchestrator's terminal renders ANSI escapes.
    pub fn ansi_codes_supported(&self) -> bool {
        self.ansi_codes_supported
    }

    pub async fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogMessage::Error(message.into())).await
    }

    pub async fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogMessage::Warn(message.into())).await
    }

    pub async fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogMessage::Info(message.into())).await
    }

    pub async fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogMessage::Debug(message.into())).await
    }

    pub async fn trace(&self, error: MarshalledError) -> Result<()> {
        self.log(LogMessage::Trace(error)).await
    }

    /// Marshal a native failure and send it as a trace.
    pub async fn trace_error(&self, error: &anyhow::Error) -> Result<()> {
        self.trace(marshal(error)).await
    }

    async fn log(&self, message: LogMessage) -> Result<()> {
        self.sender.send_message(AgentMessage::Log(message)).await
    }
}
