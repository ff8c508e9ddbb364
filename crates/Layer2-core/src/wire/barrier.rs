//! Completion barrier
//!
//! After the last result the agent sends the completion sentinel and then
//! waits for the orchestrator to acknowledge it. The agent process must not
//! exit before that rendezvous: the orchestrator may still be draining the
//! stream.

use super::channel::{MessageSender, WireReceiver};
use forkrun_foundation::{AgentMessage, Error, Result};
use std::io::ErrorKind;
use tracing::debug;

/// How the barrier was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The peer sent a value (its content is ignored)
    Received,
    /// The peer closed the stream
    PeerClosed,
}

/// One-shot rendezvous with the orchestrator.
pub struct CompletionBarrier {
    sender: MessageSender,
}

impl CompletionBarrier {
    pub fn new(sender: MessageSender) -> Self {
        Self { sender }
    }

    /// Send the sentinel, then block until the peer answers or hangs up.
    ///
    /// Only the send can fail. Once the sentinel is out, whatever the read
    /// returns releases the barrier.
    pub async fn rendezvous(self, receiver: &mut WireReceiver) -> Result<Acknowledgement> {
        self.sender.send_message(AgentMessage::Done).await?;

        let ack = match receiver.receive_or_eof::<serde_json::Value>().await {
            Ok(Some(_)) => Acknowledgement::Received,
            Ok(None) => Acknowledgement::PeerClosed,
            Err(e) => release_on_error(&e),
        };
        debug!("Completion acknowledged: {:?}", ack);
        Ok(ack)
    }
}

/// 내용은 보지 않는다: a line arrived, however garbled, or the peer is gone.
fn release_on_error(e: &Error) -> Acknowledgement {
    let ack = match e {
        Error::Protocol(_) => Acknowledgement::Received,
        Error::Io(io) if io.kind() == ErrorKind::InvalidData => Acknowledgement::Received,
        _ => Acknowledgement::PeerClosed,
    };
    debug!("Acknowledgement read failed ({}); released as {:?}", e, ack);
    ack
}
