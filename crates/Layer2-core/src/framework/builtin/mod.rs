//! Builtin Frameworks - 내장 테스트 프레임워크
//!
//! ## 목록
//! - `forkrun.process` - 명령줄을 테스트로 실행 (종료 코드로 판정)

pub mod process;

pub use process::{process_fingerprint, ProcessFramework, PROCESS_FRAMEWORK};

use super::registry::FrameworkRegistry;

/// 모든 builtin 프레임워크 등록
pub fn register_all(registry: &mut FrameworkRegistry) {
    registry.register_default::<ProcessFramework>(PROCESS_FRAMEWORK);
}
