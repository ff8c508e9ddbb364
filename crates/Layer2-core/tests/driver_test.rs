//! 드라이버 통합 테스트 - 오케스트레이터 역할을 하며 전체 프로토콜 검증
//!
//! `cargo test -p forkrun-core --test driver_test`

use anyhow::anyhow;
use async_trait::async_trait;
use forkrun_core::{
    builtin, EventSink, Framework, FrameworkRegistry, RemoteLogger, RunOutcome, Runner, TestDriver,
    TestEvent, TestRunner, TestTask, WireChannel,
};
use forkrun_foundation::{
    AgentMessage, Fingerprint, FrameworkDescriptor, LogMessage, TestDefinition, TestEventBatch,
    TestResult,
};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

// ============================================================================
// Test frameworks
// ============================================================================

/// Runner whose behavior is picked by test name
struct ScriptedRunner {
    logger: RemoteLogger,
}

#[async_trait]
impl TestRunner for ScriptedRunner {
    async fn run(&mut self, task: TestTask<'_>, sink: &mut EventSink) -> anyhow::Result<()> {
        match task.name {
            "Panics" => panic!("kaboom"),
            "Fails" => return Err(anyhow!("assertion failed").context("in Fails")),
            "Logs" => {
                let ansi = self.logger.ansi_codes_supported();
                self.logger.info(format!("ansi={}", ansi)).await?;
            }
            _ => {}
        }
        sink.handle(TestEvent::new(task.name, "passed", TestResult::Success));
        Ok(())
    }
}

struct Scripted {
    name: &'static str,
    declared: Vec<Fingerprint>,
    compat: bool,
}

impl Framework for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn fingerprints(&self) -> Vec<Fingerprint> {
        self.declared.clone()
    }

    fn runner(&self, logger: RemoteLogger, _args: &[String]) -> anyhow::Result<Runner> {
        let runner = ScriptedRunner { logger };
        Ok(if self.compat {
            Runner::compat(runner)
        } else {
            Runner::direct(runner)
        })
    }
}

fn scripted(name: &'static str, declared: Vec<Fingerprint>, compat: bool) -> Box<dyn Framework> {
    Box::new(Scripted {
        name,
        declared,
        compat,
    })
}

fn suite() -> Fingerprint {
    Fingerprint::subclass(false, "Suite")
}

fn marked() -> Fingerprint {
    Fingerprint::annotated(false, "Test")
}

fn registry() -> FrameworkRegistry {
    let mut registry = FrameworkRegistry::new();
    registry.register("org.example.Spec", || {
        Ok(scripted("spec", vec![suite()], false))
    });
    registry.register("org.example.Other", || {
        Ok(scripted("other", vec![suite()], false))
    });
    registry.register("org.example.Marked", || {
        Ok(scripted("marked", vec![marked()], false))
    });
    registry.register("org.example.Legacy", || {
        Ok(scripted("legacy", vec![marked()], true))
    });
    registry.register("org.example.Broken", || Err(anyhow!("native library missing")));
    registry
}

// ============================================================================
// Orchestrator side
// ============================================================================

/// Drive one full run and collect everything the agent sent.
async fn run_agent(
    registry: FrameworkRegistry,
    ansi: bool,
    tests: Vec<TestDefinition>,
    descriptors: Vec<FrameworkDescriptor>,
) -> (RunOutcome, Vec<AgentMessage>) {
    let (agent_io, orchestrator_io) = tokio::io::duplex(256 * 1024);
    let driver = TestDriver::new(registry).with_diagnostics(false);

    let orchestrator = async move {
        let mut channel = WireChannel::from_stream(orchestrator_io);
        channel.send(&ansi).await.unwrap();
        channel.send(&tests).await.unwrap();
        channel.send(&(descriptors.len() as u32)).await.unwrap();
        for descriptor in &descriptors {
            channel.send(descriptor).await.unwrap();
        }

        let mut received = Vec::new();
        while let Some(message) = channel
            .receiver()
            .receive_or_eof::<AgentMessage>()
            .await
            .unwrap()
        {
            let done = message.is_done();
            received.push(message);
            if done {
                channel.send(&"ack").await.unwrap();
                break;
            }
        }
        received
    };

    tokio::join!(driver.run(WireChannel::from_stream(agent_io)), orchestrator)
}

/// The request the orchestrator sends, as bytes on the wire
fn request_bytes(tests: &[TestDefinition], descriptors: &[FrameworkDescriptor]) -> Vec<u8> {
    let mut lines = vec![
        serde_json::to_string(&false).unwrap(),
        serde_json::to_string(tests).unwrap(),
        serde_json::to_string(&descriptors.len()).unwrap(),
    ];
    lines.extend(descriptors.iter().map(|d| serde_json::to_string(d).unwrap()));
    lines.iter().map(|l| format!("{}\n", l)).collect::<String>().into_bytes()
}

/// Connection that accepts `allowed` writes, then fails like a reset socket
struct CutoffWriter {
    allowed: usize,
    written: Arc<Mutex<Vec<u8>>>,
}

impl CutoffWriter {
    fn new(allowed: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = Self {
            allowed,
            written: written.clone(),
        };
        (writer, written)
    }
}

impl AsyncWrite for CutoffWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        if self.allowed == 0 {
            return Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()));
        }
        self.allowed -= 1;
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn decode_lines(bytes: &[u8]) -> Vec<AgentMessage> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn batches(messages: &[AgentMessage]) -> Vec<&TestEventBatch> {
    messages
        .iter()
        .filter_map(|m| match m {
            AgentMessage::TestEvents(batch) => Some(batch),
            _ => None,
        })
        .collect()
}

fn error_logs(messages: &[AgentMessage]) -> Vec<&str> {
    messages
        .iter()
        .filter_map(|m| match m {
            AgentMessage::Log(LogMessage::Error(text)) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_missing_framework_logs_and_completes() {
    let tests = vec![TestDefinition::new("A", suite())];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Missing")];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    assert_eq!(
        messages,
        vec![
            AgentMessage::Log(LogMessage::Error(
                "Framework implementation 'org.example.Missing' not present.".to_string()
            )),
            AgentMessage::Done,
        ]
    );
    let summary = outcome.summary().unwrap();
    assert_eq!(summary.missing_frameworks, 1);
    assert_eq!(summary.executed, 0);
}

#[tokio::test]
async fn test_single_match_one_batch() {
    let tests = vec![
        TestDefinition::new("A", suite()),
        TestDefinition::new("B", marked()),
    ];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Spec")];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    assert!(outcome.is_completed(), "{}", outcome);
    let batches = batches(&messages);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].test_name, "A");
    assert_eq!(batches[0].events.len(), 1);
    assert_eq!(batches[0].events[0].result, TestResult::Success);
    assert_eq!(messages.last(), Some(&AgentMessage::Done));
}

#[tokio::test]
async fn test_failing_tests_are_isolated() {
    let tests = vec![
        TestDefinition::new("Panics", suite()),
        TestDefinition::new("Fails", suite()),
        TestDefinition::new("After", suite()),
    ];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Spec")];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    let batches = batches(&messages);
    let names: Vec<&str> = batches.iter().map(|b| b.test_name.as_str()).collect();
    assert_eq!(names, vec!["Panics", "Fails", "After"]);

    let panicked = &batches[0].events;
    assert_eq!(panicked.len(), 1);
    assert_eq!(panicked[0].result, TestResult::Error);
    assert_eq!(
        panicked[0].description,
        "Uncaught exception when running Panics: kaboom"
    );
    // Frames come from the panic site, with no RUST_BACKTRACE needed
    let panic_error = panicked[0].error.as_ref().unwrap();
    assert_eq!(panic_error.message.as_deref(), Some("kaboom"));
    assert!(!panic_error.stack_frames.is_empty());

    let failed = &batches[1].events;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].result, TestResult::Error);
    let error = failed[0].error.as_ref().unwrap();
    assert_eq!(error.message.as_deref(), Some("in Fails"));
    assert_eq!(
        error.cause.as_ref().unwrap().message.as_deref(),
        Some("assertion failed")
    );

    assert_eq!(batches[2].events[0].result, TestResult::Success);

    // Each failure: error log, then raw payload, then the batch
    assert_eq!(
        error_logs(&messages),
        vec![
            "Uncaught exception when running Panics: kaboom",
            "Uncaught exception when running Fails: in Fails: assertion failed",
        ]
    );
    assert!(matches!(messages[1], AgentMessage::Trace(_)));
    assert!(matches!(messages[2], AgentMessage::TestEvents(_)));

    let summary = outcome.summary().unwrap();
    assert_eq!(summary.executed, 3);
    assert_eq!(summary.errored, 2);
}

#[tokio::test]
async fn test_two_frameworks_two_batches() {
    let tests = vec![
        TestDefinition::new("A", suite()),
        TestDefinition::new("B", marked()),
    ];
    let descriptors = vec![
        FrameworkDescriptor::new("org.example.Spec"),
        FrameworkDescriptor::new("org.example.Marked"),
    ];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    let names: Vec<&str> = batches(&messages)
        .iter()
        .map(|b| b.test_name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(outcome.summary().unwrap().frameworks, 2);

    // Sentinel exactly once, after the last batch
    let done: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_done())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(done, vec![messages.len() - 1]);
}

#[tokio::test]
async fn test_same_test_claimed_by_two_frameworks() {
    let tests = vec![TestDefinition::new("A", suite())];
    let descriptors = vec![
        FrameworkDescriptor::new("org.example.Spec"),
        FrameworkDescriptor::new("org.example.Other"),
    ];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    // Not deduplicated: one batch per claiming framework
    let names: Vec<&str> = batches(&messages)
        .iter()
        .map(|b| b.test_name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "A"]);
    assert_eq!(outcome.summary().unwrap().executed, 2);
}

#[tokio::test]
async fn test_no_match_contributes_nothing() {
    let tests = vec![TestDefinition::new("A", Fingerprint::subclass(true, "Suite"))];
    let descriptors = vec![
        FrameworkDescriptor::new("org.example.Spec"),
        FrameworkDescriptor::new("org.example.Marked"),
    ];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    assert_eq!(messages, vec![AgentMessage::Done]);
    assert_eq!(outcome.summary().unwrap().executed, 0);
}

#[tokio::test]
async fn test_compat_runner_rejects_annotated() {
    let tests = vec![TestDefinition::new("B", marked())];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Legacy")];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    let expected = "Framework 'legacy' does not support test 'B'";
    assert_eq!(error_logs(&messages), vec![expected]);

    let batches = batches(&messages);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].events.len(), 1);
    assert_eq!(batches[0].events[0].result, TestResult::Error);
    assert_eq!(batches[0].events[0].description, expected);
    assert!(batches[0].events[0].error.is_none());
    assert!(outcome.is_completed());
}

#[tokio::test]
async fn test_ansi_flag_reaches_logger() {
    let tests = vec![TestDefinition::new("Logs", suite())];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Spec")];

    let (_, messages) = run_agent(registry(), true, tests, descriptors).await;

    assert_eq!(
        messages[0],
        AgentMessage::Log(LogMessage::Info("ansi=true".to_string()))
    );
}

#[tokio::test]
async fn test_no_frameworks_sends_only_sentinel() {
    let tests = vec![TestDefinition::new("A", suite())];
    let (outcome, messages) = run_agent(registry(), false, tests, Vec::new()).await;

    assert_eq!(messages, vec![AgentMessage::Done]);
    assert!(outcome.is_completed());
}

#[tokio::test]
async fn test_construction_failure_is_fatal() {
    let tests = vec![TestDefinition::new("A", suite())];
    let descriptors = vec![
        FrameworkDescriptor::new("org.example.Broken"),
        FrameworkDescriptor::new("org.example.Spec"),
    ];

    let (outcome, messages) = run_agent(registry(), false, tests, descriptors).await;

    assert!(matches!(outcome, RunOutcome::Reported { .. }), "{}", outcome);
    assert_eq!(messages.len(), 2, "{:?}", messages);
    assert_eq!(
        error_logs(&messages),
        vec![
            "Uncaught exception when running tests: \
             Failed to construct framework 'org.example.Broken': native library missing"
        ]
    );
    match &messages[1] {
        AgentMessage::Trace(error) => {
            assert_eq!(
                error.message.as_deref(),
                Some("Failed to construct framework 'org.example.Broken'")
            );
            assert_eq!(error.depth(), 2);
        }
        other => panic!("expected trace, got {:?}", other),
    }
    assert!(!messages.iter().any(|m| m.is_done()));
}

#[tokio::test]
async fn test_orchestrator_hangup_aborts() {
    let (agent_io, orchestrator_io) = tokio::io::duplex(1024);
    let driver = TestDriver::new(registry()).with_diagnostics(false);

    let orchestrator = async move {
        let channel = WireChannel::from_stream(orchestrator_io);
        channel.send(&false).await.unwrap();
        // dropped: agent sees EOF while reading the test list
    };

    let (outcome, ()) = tokio::join!(driver.run(WireChannel::from_stream(agent_io)), orchestrator);
    assert!(matches!(outcome, RunOutcome::Aborted { .. }), "{}", outcome);
}

#[tokio::test]
async fn test_orchestrator_gone_before_results_aborts() {
    let (agent_io, orchestrator_io) = tokio::io::duplex(64 * 1024);
    let driver = TestDriver::new(registry()).with_diagnostics(false);
    let tests = vec![TestDefinition::new("A", suite())];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Spec")];

    let orchestrator = async move {
        let channel = WireChannel::from_stream(orchestrator_io);
        channel.send(&false).await.unwrap();
        channel.send(&tests).await.unwrap();
        channel.send(&1u32).await.unwrap();
        channel.send(&descriptors[0]).await.unwrap();
        // dropped: the request is buffered, the first result cannot be sent
    };

    let (outcome, ()) = tokio::join!(driver.run(WireChannel::from_stream(agent_io)), orchestrator);
    match outcome {
        RunOutcome::Aborted { failure } => assert_eq!(failure, "Channel send failed"),
        other => panic!("expected abort, got {}", other),
    }
}

#[tokio::test]
async fn test_send_failure_mid_run_stops_sending() {
    let tests = vec![
        TestDefinition::new("A", suite()),
        TestDefinition::new("B", suite()),
        TestDefinition::new("C", suite()),
    ];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Spec")];
    let reader = std::io::Cursor::new(request_bytes(&tests, &descriptors));
    let (writer, written) = CutoffWriter::new(1);

    let driver = TestDriver::new(registry()).with_diagnostics(false);
    let outcome = driver.run(WireChannel::new(reader, writer)).await;

    assert!(matches!(outcome, RunOutcome::Aborted { .. }), "{}", outcome);

    // Only A's batch made it; no report, no sentinel after the failure
    let sent = decode_lines(&written.lock().unwrap());
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        AgentMessage::TestEvents(batch) => assert_eq!(batch.test_name, "A"),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreportable_fatal_failure_aborts() {
    let tests = vec![TestDefinition::new("A", suite())];
    let descriptors = vec![FrameworkDescriptor::new("org.example.Broken")];
    let reader = std::io::Cursor::new(request_bytes(&tests, &descriptors));
    let (writer, written) = CutoffWriter::new(0);

    let driver = TestDriver::new(registry()).with_diagnostics(true);
    let outcome = driver.run(WireChannel::new(reader, writer)).await;

    // Reporting failed, so the failure went to stderr instead
    match outcome {
        RunOutcome::Aborted { failure } => assert_eq!(failure, "Channel send failed"),
        other => panic!("expected abort, got {}", other),
    }
    assert!(written.lock().unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_framework_end_to_end() {
    let tests = vec![
        TestDefinition::new("true", builtin::process_fingerprint()),
        TestDefinition::new("false", builtin::process_fingerprint()),
        TestDefinition::new("Spec", suite()),
    ];
    let descriptors = vec![FrameworkDescriptor::new(builtin::PROCESS_FRAMEWORK)];

    let (outcome, messages) =
        run_agent(FrameworkRegistry::with_builtins(), false, tests, descriptors).await;

    let batches = batches(&messages);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].events[0].result, TestResult::Success);
    assert_eq!(batches[1].events[0].result, TestResult::Failure);
    assert_eq!(batches[1].events[0].description, "exited with status 1");
    assert!(outcome.is_completed());
}
