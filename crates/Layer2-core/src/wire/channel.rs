//! Wire Channel - 프레임 단위 양방향 전송
//!
//! One JSON document per line over an established byte stream. Every send
//! is flushed before it returns so the orchestrator sees each message as
//! soon as it is produced.

use forkrun_foundation::{AgentMessage, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, error};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

// ============================================================================
// Sender
// ============================================================================

/// Write half. Poisoned after the first failed send.
struct WireSender {
    writer: BoxedWriter,
    poisoned: bool,
}

impl WireSender {
    async fn send_line(&mut self, line: &[u8]) -> Result<()> {
        if self.poisoned {
            return Err(Error::RunAborted(
                "an earlier send on this channel failed".to_string(),
            ));
        }

        let written = async {
            self.writer.write_all(line).await?;
            self.writer.flush().await
        }
        .await;

        if let Err(e) = written {
            error!("Channel send failed: {}", e);
            self.poisoned = true;
            return Err(Error::ChannelSend(e));
        }
        Ok(())
    }
}

/// Cloneable handle on the write half.
///
/// The driver and every [`RemoteLogger`](crate::RemoteLogger) share one
/// sender, so messages keep the order in which they were produced.
#[derive(Clone)]
pub struct MessageSender {
    inner: Arc<Mutex<WireSender>>,
}

impl MessageSender {
    fn new(writer: BoxedWriter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WireSender {
                writer,
                poisoned: false,
            })),
        }
    }

    /// Serialize `value` as one line, write it, flush.
    pub async fn send<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let mut sender = self.inner.lock().await;
        sender.send_line(&line).await
    }

    pub async fn send_message(&self, message: AgentMessage) -> Result<()> {
        debug!("-> {}", message_kind(&message));
        self.send(&message).await
    }

    /// Whether a send has already failed.
    pub async fn is_poisoned(&self) -> bool {
        self.inner.lock().await.poisoned
    }
}

fn message_kind(message: &AgentMessage) -> String {
    match message {
        AgentMessage::Log(log) => format!("log ({})", log.level()),
        AgentMessage::Trace(_) => "trace".to_string(),
        AgentMessage::TestEvents(batch) => {
            format!("events for {} ({})", batch.test_name, batch.events.len())
        }
        AgentMessage::Done => "done".to_string(),
    }
}

// ============================================================================
// Receiver
// ============================================================================

/// Read half.
pub struct WireReceiver {
    reader: BufReader<BoxedReader>,
    line: String,
}

impl WireReceiver {
    fn new(reader: BoxedReader) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Next value; end of stream is [`Error::ChannelClosed`].
    pub async fn receive<T: DeserializeOwned>(&mut self) -> Result<T> {
        match self.receive_or_eof().await? {
            Some(value) => Ok(value),
            None => Err(Error::ChannelClosed(
                "peer closed the connection".to_string(),
            )),
        }
    }

    /// Next value, or `None` on a clean end of stream. A final line without
    /// its newline is a truncated message, not a value.
    pub async fn receive_or_eof<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Ok(None);
            }

            let complete = self.line.ends_with('\n');
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                if complete {
                    continue;
                }
                return Ok(None);
            }
            if !complete {
                return Err(Error::ChannelClosed(
                    "stream ended in the middle of a message".to_string(),
                ));
            }

            return serde_json::from_str(trimmed).map(Some).map_err(|e| {
                Error::protocol(format!(
                    "expected {}: {}",
                    std::any::type_name::<T>(),
                    e
                ))
            });
        }
    }
}

// ============================================================================
// Channel
// ============================================================================

/// Duplex channel over an established connection.
pub struct WireChannel {
    sender: MessageSender,
    receiver: WireReceiver,
}

impl WireChannel {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            sender: MessageSender::new(Box::new(writer)),
            receiver: WireReceiver::new(Box::new(reader)),
        }
    }

    pub fn from_tcp(stream: TcpStream) -> Self {
        // Small frames must not wait on Nagle
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {}", e);
        }
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }

    /// Any duplex stream (e.g. `tokio::io::duplex` in tests).
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }

    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    pub fn receiver(&mut self) -> &mut WireReceiver {
        &mut self.receiver
    }

    pub async fn send<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        self.sender.send(value).await
    }

    pub async fn receive<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.receiver.receive().await
    }

    pub fn split(self) -> (MessageSender, WireReceiver) {
        (self.sender, self.receiver)
    }
}
