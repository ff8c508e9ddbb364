//! Framework traits - 테스트 프레임워크 플러그인 인터페이스

use crate::logger::RemoteLogger;
use async_trait::async_trait;
use forkrun_foundation::{marshal, Event, Fingerprint, FingerprintKind, TestResult};

// ============================================================================
// Events
// ============================================================================

/// Event as produced by framework code, before marshalling
#[derive(Debug)]
pub struct TestEvent {
    pub test_name: String,
    pub description: String,
    pub result: TestResult,
    pub error: Option<anyhow::Error>,
}

impl TestEvent {
    pub fn new(
        test_name: impl Into<String>,
        description: impl Into<String>,
        result: TestResult,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            description: description.into(),
            result,
            error: None,
        }
    }

    pub fn with_error(mut self, error: anyhow::Error) -> Self {
        self.error = Some(error);
        self
    }
}

/// Collects the events of one executed target.
///
/// Native errors are marshalled as they arrive, so nothing that holds
/// framework state outlives the call.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<Event>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: TestEvent) {
        let mut wire = Event::new(event.test_name, event.description, event.result);
        if let Some(error) = &event.error {
            wire = wire.with_error(marshal(error));
        }
        self.events.push(wire);
    }

    /// Record an event the agent synthesized itself.
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

// ============================================================================
// Runner
// ============================================================================

/// One target handed to a runner
#[derive(Debug, Clone, Copy)]
pub struct TestTask<'a> {
    pub name: &'a str,
    pub fingerprint: &'a Fingerprint,
    pub args: &'a [String],
}

/// 테스트 실행기
#[async_trait]
pub trait TestRunner: Send {
    /// Run one named test, reporting outcomes into `sink`.
    ///
    /// An `Err` (or a panic) is turned into a single Error event by the
    /// driver; it never ends the run.
    async fn run(&mut self, task: TestTask<'_>, sink: &mut EventSink) -> anyhow::Result<()>;

    /// Fingerprint kinds a compatibility runner accepts. The legacy runner
    /// contract only understood subclass fingerprints.
    fn supports(&self, kind: FingerprintKind) -> bool {
        kind == FingerprintKind::Subclass
    }
}

/// Runner capability shape
pub enum Runner {
    /// Accepts every fingerprint kind
    Direct(Box<dyn TestRunner>),

    /// Must be checked with [`TestRunner::supports`] first
    Compat(Box<dyn TestRunner>),
}

impl Runner {
    pub fn direct(runner: impl TestRunner + 'static) -> Self {
        Self::Direct(Box::new(runner))
    }

    pub fn compat(runner: impl TestRunner + 'static) -> Self {
        Self::Compat(Box::new(runner))
    }

    pub fn supports(&self, fingerprint: &Fingerprint) -> bool {
        match self {
            Self::Direct(_) => true,
            Self::Compat(runner) => runner.supports(fingerprint.kind()),
        }
    }

    pub fn runner_mut(&mut self) -> &mut (dyn TestRunner + 'static) {
        match self {
            Self::Direct(runner) | Self::Compat(runner) => runner.as_mut(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Compat(_) => "compat",
        }
    }
}

// ============================================================================
// Framework
// ============================================================================

/// 테스트 프레임워크 트레이트
///
/// Everything the agent needs from a test framework: the fingerprints it
/// recognizes and a way to build a runner.
pub trait Framework: Send + Sync {
    /// Display name used in diagnostics
    fn name(&self) -> &str;

    /// Declared fingerprints
    fn fingerprints(&self) -> Vec<Fingerprint>;

    /// Build the runner used for every matched target of this run.
    fn runner(&self, logger: RemoteLogger, args: &[String]) -> anyhow::Result<Runner>;
}
