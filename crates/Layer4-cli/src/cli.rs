//! Command-line arguments

use clap::Parser;
use forkrun_foundation::AgentConfig;
use std::path::PathBuf;

/// forkrun agent - runs tests for the orchestrator that spawned it
#[derive(Parser, Debug)]
#[command(name = "forkrun-agent")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Orchestrator port on the loopback interface
    pub port: Option<u16>,

    /// Orchestrator host
    #[arg(long)]
    pub host: Option<String>,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds to wait for the connection
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Don't echo internal errors to stderr
    #[arg(long)]
    pub no_diagnostics: bool,
}

impl Args {
    /// 기본값 → 파일 → 환경 변수 → 인자
    pub fn resolve_config(&self) -> anyhow::Result<AgentConfig> {
        let mut config = AgentConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut AgentConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = secs;
        }
        if self.debug {
            config.log_level = "debug".to_string();
        }
        if self.no_diagnostics {
            config.diagnostics = false;
        }
    }
}
