//! forkrun-core: Test worker runtime
//!
//! Layer2 - 오케스트레이터가 fork한 워커 프로세스의 실행 레이어
//!
//! # 주요 모듈
//!
//! - `wire`: newline-delimited JSON 채널 및 완료 신호
//! - `logger`: 원격 로거 (로그 레벨별 메시지 전송)
//! - `framework`: 테스트 프레임워크 플러그인, fingerprint 매칭, 레지스트리
//! - `driver`: 테스트 실행 드라이버
//!
//! # 사용 예시
//!
//! ```ignore
//! use forkrun_core::{FrameworkRegistry, TestDriver, WireChannel};
//!
//! let stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await?;
//! let driver = TestDriver::new(FrameworkRegistry::with_builtins());
//! let outcome = driver.run(WireChannel::from_tcp(stream)).await;
//! ```

pub mod driver;
pub mod framework;
pub mod logger;
pub mod wire;

mod unwind;

pub(crate) use unwind::CaughtPanic;

// Re-exports: Driver
pub use driver::{RunOutcome, RunRequest, RunSummary, TestDriver};

// Re-exports: Framework
pub use framework::{
    builtin, matches, select_targets, EventSink, Framework, FrameworkFactory, FrameworkRegistry,
    LoadError, Runner, TestEvent, TestRunner, TestTask,
};

// Re-exports: Wire
pub use logger::RemoteLogger;
pub use wire::{Acknowledgement, CompletionBarrier, MessageSender, WireChannel, WireReceiver};
