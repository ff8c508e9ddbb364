//! Config - 에이전트 설정 관리
//!
//! - `agent.rs` - AgentConfig (파일 + 환경 변수 + CLI)

mod agent;

pub use agent::{
    AgentConfig, ENV_CONFIG, ENV_CONNECT_TIMEOUT, ENV_HOST, ENV_LOG_LEVEL, ENV_PORT,
};
