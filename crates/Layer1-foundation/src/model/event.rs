//! Test Events - 테스트 실행 결과

use crate::marshal::MarshalledError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 테스트 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestResult {
    Success,
    Error,
    Failure,
    Skipped,
}

impl TestResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported outcome for an executed test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub test_name: String,
    pub description: String,
    pub result: TestResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MarshalledError>,
}

impl Event {
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

    /// Error-result event, as synthesized by the agent itself.
    pub fn error(
        test_name: impl Into<String>,
        description: impl Into<String>,
        error: Option<MarshalledError>,
    ) -> Self {
        Self {
            error,
            ..Self::new(test_name, description, TestResult::Error)
        }
    }

    pub fn with_error(mut self, error: MarshalledError) -> Self {
        self.error = Some(error);
        self
    }
}

/// All events produced by one executed target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEventBatch {
    pub test_name: String,
    pub events: Vec<Event>,
}

impl TestEventBatch {
    pub fn new(test_name: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            test_name: test_name.into(),
            events,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.events.iter().any(|e| e.result == TestResult::Error)
    }
}
