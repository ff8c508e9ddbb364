//! # forkrun-foundation
//!
//! Foundation layer for the forkrun test agent:
//! - Error: 에이전트 전역 에러 타입
//! - Config: AgentConfig (파일, 환경 변수)
//! - Model: 오케스트레이터와 주고받는 값 (Fingerprint, TestDefinition, Event ...)
//! - Marshal: 네이티브 에러를 전송 가능한 형태로 변환
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  orchestrator                                            │
//! │     │  bool, [TestDefinition], N, N × FrameworkDescriptor│
//! │     ▼                                                    │
//! │  forkrun agent ── AgentMessage (Log / Trace /            │
//! │                    TestEvents / Done) ──▶ orchestrator   │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod marshal;
pub mod model;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::AgentConfig;

// ============================================================================
// Model (전송 값)
// ============================================================================
pub use model::{
    AgentMessage, Event, Fingerprint, FingerprintKind, FrameworkDescriptor, LogMessage,
    TestDefinition, TestEventBatch, TestResult,
};

// ============================================================================
// Marshal (에러 변환)
// ============================================================================
pub use marshal::{frames_from_backtrace, marshal, MarshalledError, StackFrame};
