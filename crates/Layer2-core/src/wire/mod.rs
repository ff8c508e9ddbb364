//! # Wire
//!
//! 오케스트레이터와의 전송 계층
//!
//! - `channel`: newline-delimited JSON 프레임, 전송마다 flush
//! - `barrier`: 완료 신호 전송 후 오케스트레이터 응답 대기

mod barrier;
mod channel;

pub use barrier::{Acknowledgement, CompletionBarrier};
pub use channel::{MessageSender, WireChannel, WireReceiver};
