//! Error types for forkrun
//!
//! 에이전트 전역 에러를 한 곳에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// forkrun 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Channel / Protocol
    // ========================================================================
    /// The peer closed the stream, or an earlier send already failed.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// A send could not be completed. Fatal for the current run.
    #[error("Channel send failed")]
    ChannelSend(#[source] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // ========================================================================
    // Framework 관련
    // ========================================================================
    #[error("Framework implementation '{0}' not present.")]
    FrameworkNotFound(String),

    #[error("Framework error: {name} - {message}")]
    Framework { name: String, message: String },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    /// The run loop cannot continue (the channel is gone).
    #[error("Run aborted: {0}")]
    RunAborted(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Send-side failures: the run cannot report anything more over the
    /// channel and must terminate.
    pub fn is_channel_failure(&self) -> bool {
        matches!(
            self,
            Error::ChannelClosed(_) | Error::ChannelSend(_) | Error::RunAborted(_)
        )
    }

    /// Framework 에러 생성 헬퍼
    pub fn framework(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Framework {
            name: name.into(),
            message: message.into(),
        }
    }

    /// 프로토콜 에러 생성 헬퍼
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }
}
