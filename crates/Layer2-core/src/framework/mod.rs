//! # Framework System
//!
//! 테스트 프레임워크 플러그인 시스템
//!
//! ## 구성
//!
//! ```text
//! FrameworkRegistry ──load(name)──▶ Framework
//!                                     │ fingerprints()
//!                                     ▼
//!                    matcher::select_targets(declared, requested)
//!                                     │
//!                                     ▼
//!                   Runner::{Direct, Compat} ──run──▶ EventSink
//! ```

pub mod builtin;
pub mod matcher;
mod registry;
mod traits;

pub use matcher::{matches, select_targets};
pub use registry::{FrameworkFactory, FrameworkRegistry, LoadError};
pub use traits::{EventSink, Framework, Runner, TestEvent, TestRunner, TestTask};
