//! Error Marshaller
//!
//! Framework code fails with native errors (`anyhow::Error` or any
//! `std::error::Error`). Those values can hold live state and cannot cross
//! the process boundary, so before a failure leaves the agent it is
//! flattened into a [`MarshalledError`]: the message, a snapshot of the
//! stack frames, and the cause chain, recursively, as plain strings.

use serde::{Deserialize, Serialize};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

/// One frame of a captured stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Symbol name, or `<unknown>` when unresolved
    pub function: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl StackFrame {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
            column: None,
        }
    }

}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        if let Some(file) = &self.file {
            write!(f, " at {}", file)?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
            }
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// Transport-safe snapshot of a failure and its cause chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarshalledError {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub stack_frames: Vec<StackFrame>,

    #[serde(default)]
    pub cause: Option<Box<MarshalledError>>,
}

impl MarshalledError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            stack_frames: Vec::new(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: MarshalledError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack_frames = frames;
        self
    }

    /// Marshal an `anyhow::Error`.
    ///
    /// Every link of `chain()` becomes one level of the cause chain. anyhow
    /// keeps a single backtrace per error, so frames land on the outermost
    /// level only. When the error carries none (`RUST_BACKTRACE` unset), the
    /// stack at the marshalling site is taken instead.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let mut marshalled = Self::from_chain(err.chain());
        marshalled.stack_frames = match err.backtrace().status() {
            BacktraceStatus::Captured => frames_from_backtrace(err.backtrace()),
            _ => frames_from_backtrace(&Backtrace::force_capture()),
        };
        marshalled
    }

    /// Marshal any `std::error::Error`, following `source()`.
    pub fn from_std(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::from_chain(std::iter::successors(Some(err), |e| e.source()))
    }

    fn from_chain<'a>(chain: impl Iterator<Item = &'a (dyn std::error::Error + 'static)>) -> Self {
        let levels: Vec<Option<String>> = chain.map(|e| non_empty(e.to_string())).collect();

        // 가장 안쪽 cause부터 감싸 올라간다
        let mut current: Option<MarshalledError> = None;
        for message in levels.into_iter().rev() {
            current = Some(MarshalledError {
                message,
                stack_frames: Vec::new(),
                cause: current.map(Box::new),
            });
        }

        current.unwrap_or(MarshalledError {
            message: None,
            stack_frames: Vec::new(),
            cause: None,
        })
    }

    /// Number of levels, this one included.
    pub fn depth(&self) -> usize {
        self.causes().count()
    }

    /// This error followed by each nested cause.
    pub fn causes(&self) -> impl Iterator<Item = &MarshalledError> {
        std::iter::successors(Some(self), |e| e.cause.as_deref())
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("<no message>")
    }
}

impl fmt::Display for MarshalledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_or_default())
    }
}

impl std::error::Error for MarshalledError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Shorthand for [`MarshalledError::from_anyhow`].
pub fn marshal(err: &anyhow::Error) -> MarshalledError {
    MarshalledError::from_anyhow(err)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Snapshot frames from a captured backtrace.
///
/// `Backtrace` exposes its frames only through `Display`, one
/// `N: symbol` line per frame optionally followed by an `at file:line:col`
/// line.
pub fn frames_from_backtrace(backtrace: &Backtrace) -> Vec<StackFrame> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    parse_backtrace(&backtrace.to_string())
}

fn parse_backtrace(rendered: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for raw in rendered.lines() {
        let line = raw.trim();

        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line_no, column) = split_location(location);
                frame.file = Some(file);
                frame.line = line_no;
                frame.column = column;
            }
            continue;
        }

        if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(StackFrame::new(symbol.trim()));
                continue;
            }
        }

        if let Some(index) = line.strip_suffix(':') {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(StackFrame::new("<unknown>"));
            }
        }
    }

    frames
}

fn split_location(location: &str) -> (String, Option<u32>, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle, last) {
        (Some(file), Some(line), Some(column)) => match (line.parse(), column.parse()) {
            (Ok(line), Ok(column)) => (file.to_string(), Some(line), Some(column)),
            _ => (location.to_string(), None, None),
        },
        _ => (location.to_string(), None, None),
    }
}
