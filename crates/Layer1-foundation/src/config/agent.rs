//! Agent Config - 에이전트 설정
//!
//! 우선순위 (뒤가 이김):
//! 1. 기본값
//! 2. JSON 설정 파일 (`--config` 또는 `FORKRUN_CONFIG`)
//! 3. 환경 변수 (`FORKRUN_*`)
//! 4. 명령줄 인자 (CLI에서 적용)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 설정 파일 경로 환경 변수
pub const ENV_CONFIG: &str = "FORKRUN_CONFIG";
pub const ENV_HOST: &str = "FORKRUN_HOST";
pub const ENV_PORT: &str = "FORKRUN_PORT";
pub const ENV_CONNECT_TIMEOUT: &str = "FORKRUN_CONNECT_TIMEOUT_SECS";
pub const ENV_LOG_LEVEL: &str = "FORKRUN_LOG_LEVEL";

/// 에이전트 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Orchestrator host (loopback by default)
    pub host: String,

    /// Orchestrator port; 0 means "not provided yet"
    pub port: u16,

    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,

    /// Local tracing filter
    pub log_level: String,

    /// Echo internal errors to stderr
    pub diagnostics: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            connect_timeout_secs: 10,
            log_level: "info".to_string(),
            diagnostics: true,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// JSON 파일에서 로드 (없는 필드는 기본값)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))?;

        debug!("Loaded agent config from {}", path.display());
        Ok(config)
    }

    /// 기본값 → 파일 → 환경 변수
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG).ok();
        let path = path.or_else(|| env_path.as_deref().map(Path::new));

        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `FORKRUN_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(secs) = lookup(ENV_CONNECT_TIMEOUT) {
            self.connect_timeout_secs = parse_env(ENV_CONNECT_TIMEOUT, &secs)?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config(
                "orchestrator port is required (first argument or FORKRUN_PORT)".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: '{}'", key, value)))
}
