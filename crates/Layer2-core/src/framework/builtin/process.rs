//! Process framework - 외부 명령을 테스트로 실행
//!
//! The test name is a shell-style command line. Exit status 0 is a
//! success, anything else a failure. Framework args of the form
//! `timeout=<secs>` set the per-test timeout; all other args are appended
//! to every command.

use crate::framework::{EventSink, Framework, Runner, TestEvent, TestRunner, TestTask};
use crate::logger::RemoteLogger;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use forkrun_foundation::{Error, Fingerprint, TestResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Registered implementation name
pub const PROCESS_FRAMEWORK: &str = "forkrun.process";

/// 기본 타임아웃 (2분)
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Marker the orchestrator puts on command tests
pub fn process_fingerprint() -> Fingerprint {
    Fingerprint::annotated(false, PROCESS_FRAMEWORK)
}

/// 프로세스 실행 프레임워크
#[derive(Debug, Default)]
pub struct ProcessFramework;

impl ProcessFramework {
    pub fn new() -> Self {
        Self
    }
}

impl Framework for ProcessFramework {
    fn name(&self) -> &str {
        PROCESS_FRAMEWORK
    }

    fn fingerprints(&self) -> Vec<Fingerprint> {
        vec![process_fingerprint()]
    }

    fn runner(&self, logger: RemoteLogger, args: &[String]) -> anyhow::Result<Runner> {
        let options = ProcessOptions::parse(args)?;
        Ok(Runner::direct(ProcessRunner { logger, options }))
    }
}

/// Parsed framework args
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProcessOptions {
    timeout: Duration,
    extra_args: Vec<String>,
}

impl ProcessOptions {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        let mut extra_args = Vec::new();

        for arg in args {
            match arg.strip_prefix("timeout=") {
                Some(secs) => {
                    let secs: u64 = secs.parse().map_err(|e| {
                        Error::framework(
                            PROCESS_FRAMEWORK,
                            format!("invalid timeout argument '{}': {}", arg, e),
                        )
                    })?;
                    timeout = Duration::from_secs(secs);
                }
                None => extra_args.push(arg.clone()),
            }
        }

        Ok(Self {
            timeout,
            extra_args,
        })
    }
}

struct ProcessRunner {
    logger: RemoteLogger,
    options: ProcessOptions,
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn run(&mut self, task: TestTask<'_>, sink: &mut EventSink) -> anyhow::Result<()> {
        let mut argv = shlex::split(task.name)
            .ok_or_else(|| anyhow!("unbalanced quoting in command '{}'", task.name))?;
        if argv.is_empty() {
            bail!("empty command");
        }
        argv.extend(self.options.extra_args.iter().cloned());

        let program = argv.remove(0);
        debug!("Running process test: {} {:?}", program, argv);

        let mut child = Command::new(&program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", program))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let output = async {
            let (out, err) = tokio::join!(collect_lines(stdout), collect_lines(stderr));
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, out, err))
        };

        let (status, out, err) = tokio::time::timeout(self.options.timeout, output)
            .await
            .map_err(|_| {
                anyhow!(
                    "'{}' did not finish within {}s",
                    task.name,
                    self.options.timeout.as_secs()
                )
            })?
            .with_context(|| format!("failed to wait for '{}'", program))?;

        for line in out.iter().chain(err.iter()) {
            self.logger.debug(line.clone()).await?;
        }

        let event = if status.success() {
            TestEvent::new(task.name, "exited with status 0", TestResult::Success)
        } else {
            let description = match status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            };
            TestEvent::new(task.name, description, TestResult::Failure)
        };
        sink.handle(event);
        Ok(())
    }
}

/// Drain a pipe to EOF. Output need not be UTF-8; the pipe must stay open
/// until the child is done or it dies of SIGPIPE.
async fn collect_lines<R>(reader: Option<R>) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let Some(reader) = reader else {
        return collected;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                collected.push(line.trim_end_matches(&['\n', '\r'][..]).to_string());
            }
            Err(e) => {
                debug!("Stopped reading process output: {}", e);
                break;
            }
        }
    }
    collected
}
