//! # Test Execution Driver
//!
//! 에이전트의 실행 루프
//!
//! ```text
//! handshake: ansi flag, [TestDefinition], N
//! for each of N FrameworkDescriptor (in order):
//!     load ─ not present? ─▶ error log, next descriptor
//!     declared fingerprints × requested tests ─▶ targets
//!     one runner per framework
//!     for each target: run isolated ─▶ TestEvents batch
//! "done" ─▶ wait for acknowledgement
//! ```
//!
//! Failures are handled at the narrowest scope that lets the run continue:
//! a failing test becomes one Error event, a missing framework one error
//! log line. Only a broken channel, or a failure outside any test, ends the
//! run early.

mod outcome;

pub use outcome::{RunOutcome, RunSummary};

use crate::framework::{
    select_targets, EventSink, Framework, FrameworkRegistry, Runner, TestTask,
};
use crate::logger::RemoteLogger;
use crate::{unwind, CaughtPanic};
use crate::wire::{Acknowledgement, CompletionBarrier, MessageSender, WireChannel, WireReceiver};
use forkrun_foundation::{
    marshal, AgentMessage, Event, FrameworkDescriptor, LogMessage, TestDefinition,
    TestEventBatch,
};
use futures::FutureExt;
use outcome::RunFailure;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Values read once at the start of a run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub ansi_codes_supported: bool,
    pub tests: Vec<TestDefinition>,
    pub framework_count: u32,
}

impl RunRequest {
    /// Read the handshake. Descriptors follow and are read one at a time.
    pub async fn read(receiver: &mut WireReceiver) -> forkrun_foundation::Result<Self> {
        let ansi_codes_supported = receiver.receive::<bool>().await?;
        let tests = receiver.receive::<Vec<TestDefinition>>().await?;
        let framework_count = receiver.receive::<u32>().await?;
        Ok(Self {
            ansi_codes_supported,
            tests,
            framework_count,
        })
    }
}

/// 테스트 실행 드라이버
pub struct TestDriver {
    registry: Arc<FrameworkRegistry>,
    diagnostics: bool,
}

impl TestDriver {
    pub fn new(registry: FrameworkRegistry) -> Self {
        unwind::install_hook();
        Self {
            registry: Arc::new(registry),
            diagnostics: true,
        }
    }

    /// Echo internal errors to stderr (default on)
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn registry(&self) -> &FrameworkRegistry {
        &self.registry
    }

    /// Run to completion over `channel`.
    ///
    /// Never fails: the orchestrator gets either the completion sentinel or
    /// one fatal-error report, and anything that cannot be reported goes to
    /// stderr.
    pub async fn run(&self, channel: WireChannel) -> RunOutcome {
        let (sender, mut receiver) = channel.split();

        let result = AssertUnwindSafe(self.run_tests(&sender, &mut receiver))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(RunFailure::Uncaught(
                    CaughtPanic::from_payload(payload).failure(),
                ))
            });

        match result {
            Ok((summary, ack)) => {
                info!("Run completed: {:?}", summary);
                RunOutcome::Completed { summary, ack }
            }
            Err(RunFailure::Aborted(e)) => {
                self.internal_error(&e);
                RunOutcome::Aborted {
                    failure: e.to_string(),
                }
            }
            Err(RunFailure::Uncaught(e)) => self.report_fatal(&sender, e).await,
        }
    }

    async fn run_tests(
        &self,
        sender: &MessageSender,
        receiver: &mut WireReceiver,
    ) -> Result<(RunSummary, Acknowledgement), RunFailure> {
        let request = RunRequest::read(receiver).await?;
        info!(
            "Received {} test(s), {} framework(s), ansi={}",
            request.tests.len(),
            request.framework_count,
            request.ansi_codes_supported
        );

        let logger = RemoteLogger::new(sender.clone(), request.ansi_codes_supported);
        let mut summary = RunSummary {
            requested: request.tests.len(),
            ..Default::default()
        };

        for _ in 0..request.framework_count {
            let descriptor: FrameworkDescriptor = receiver.receive().await?;
            summary.frameworks += 1;
            self.run_framework(&descriptor, &request.tests, &logger, sender, &mut summary)
                .await?;
        }

        let ack = CompletionBarrier::new(sender.clone())
            .rendezvous(receiver)
            .await?;
        Ok((summary, ack))
    }

    async fn run_framework(
        &self,
        descriptor: &FrameworkDescriptor,
        tests: &[TestDefinition],
        logger: &RemoteLogger,
        sender: &MessageSender,
        summary: &mut RunSummary,
    ) -> Result<(), RunFailure> {
        let framework = match self.registry.load(&descriptor.impl_name) {
            Ok(framework) => framework,
            Err(e) if e.is_not_found() => {
                warn!("{}", e);
                summary.missing_frameworks += 1;
                logger.error(e.to_string()).await?;
                return Ok(());
            }
            Err(e) => return Err(RunFailure::Uncaught(e.into_failure())),
        };

        let declared = guard(|| Ok(framework.fingerprints()))?;
        let targets = select_targets(&declared, tests);
        debug!(
            "{}: {} declared fingerprint(s), {} target(s)",
            descriptor.impl_name,
            declared.len(),
            targets.len()
        );

        let mut runner = guard(|| framework.runner(logger.clone(), &descriptor.args))?;
        debug!("{}: {} runner", descriptor.impl_name, runner.shape());

        for test in targets {
            let events = self
                .run_test_safe(
                    test,
                    &mut runner,
                    framework.as_ref(),
                    &descriptor.args,
                    logger,
                    sender,
                )
                .await?;

            summary.executed += 1;
            let batch = TestEventBatch::new(test.name.clone(), events);
            if batch.has_errors() {
                summary.errored += 1;
            }
            sender.send_message(AgentMessage::TestEvents(batch)).await?;
        }

        Ok(())
    }

    /// Run one target; any failure becomes exactly one Error event.
    async fn run_test_safe(
        &self,
        test: &TestDefinition,
        runner: &mut Runner,
        framework: &dyn Framework,
        args: &[String],
        logger: &RemoteLogger,
        sender: &MessageSender,
    ) -> Result<Vec<Event>, RunFailure> {
        let outcome = AssertUnwindSafe(run_test(test, runner, framework, args, logger))
            .catch_unwind()
            .await;

        let (failure, panic_frames) = match outcome {
            Ok(Ok(events)) => return Ok(events),
            Ok(Err(e)) => (e, None),
            Err(payload) => {
                let caught = CaughtPanic::from_payload(payload);
                (caught.failure(), caught.frames())
            }
        };

        let message = format!("Uncaught exception when running {}: {:#}", test.name, failure);
        warn!("{}", message);

        let mut marshalled = marshal(&failure);
        if let Some(frames) = panic_frames {
            marshalled.stack_frames = frames;
        }
        logger.error(message.clone()).await?;
        sender
            .send_message(AgentMessage::Trace(marshalled.clone()))
            .await?;

        Ok(vec![Event::error(test.name.clone(), message, Some(marshalled))])
    }

    /// Report a failure that escaped the run loop, once.
    async fn report_fatal(&self, sender: &MessageSender, failure: anyhow::Error) -> RunOutcome {
        let message = format!("Uncaught exception when running tests: {:#}", failure);
        error!("{}", message);

        let reported = async {
            sender
                .send_message(AgentMessage::Log(LogMessage::Error(message.clone())))
                .await?;
            sender
                .send_message(AgentMessage::Trace(marshal(&failure)))
                .await
        }
        .await;

        match reported {
            Ok(()) => RunOutcome::Reported {
                failure: format!("{:#}", failure),
            },
            Err(e) => {
                self.internal_error(&e);
                RunOutcome::Aborted {
                    failure: e.to_string(),
                }
            }
        }
    }

    /// Local diagnostic stream; never the channel.
    fn internal_error(&self, e: &dyn std::fmt::Display) {
        error!("Internal error when running tests: {}", e);
        if self.diagnostics {
            eprintln!("Internal error when running tests: {}", e);
        }
    }
}

async fn run_test(
    test: &TestDefinition,
    runner: &mut Runner,
    framework: &dyn Framework,
    args: &[String],
    logger: &RemoteLogger,
) -> anyhow::Result<Vec<Event>> {
    let mut sink = EventSink::new();

    if runner.supports(&test.fingerprint) {
        let task = TestTask {
            name: &test.name,
            fingerprint: &test.fingerprint,
            args,
        };
        runner.runner_mut().run(task, &mut sink).await?;
    } else {
        let message = format!(
            "Framework '{}' does not support test '{}'",
            framework.name(),
            test.name
        );
        logger.error(message.clone()).await?;
        sink.push(Event::error(test.name.clone(), message, None));
    }

    Ok(sink.into_events())
}

/// Call into framework code, turning a panic into a failure.
fn guard<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, RunFailure> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(CaughtPanic::from_payload(payload).failure()))
        .map_err(RunFailure::from)
}
