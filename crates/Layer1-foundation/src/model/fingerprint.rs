//! Fingerprint - 테스트 단위 식별 방식
//!
//! A fingerprint describes how a test unit is recognized: by the base type
//! it extends, or by a marker applied to it. Both variants carry only plain
//! data, so the value that a framework declares and the value that the
//! orchestrator requests can be compared and sent over the wire directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 테스트 식별 방식
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Fingerprint {
    /// Base-type membership
    #[serde(rename_all = "camelCase")]
    Subclass {
        is_module: bool,
        super_class_name: String,
    },

    /// Marker applied to the test unit
    #[serde(rename_all = "camelCase")]
    Annotated {
        is_module: bool,
        annotation_name: String,
    },
}

/// Fingerprint variant without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintKind {
    Subclass,
    Annotated,
}

impl Fingerprint {
    pub fn subclass(is_module: bool, super_class_name: impl Into<String>) -> Self {
        Self::Subclass {
            is_module,
            super_class_name: super_class_name.into(),
        }
    }

    pub fn annotated(is_module: bool, annotation_name: impl Into<String>) -> Self {
        Self::Annotated {
            is_module,
            annotation_name: annotation_name.into(),
        }
    }

    pub fn kind(&self) -> FingerprintKind {
        match self {
            Self::Subclass { .. } => FingerprintKind::Subclass,
            Self::Annotated { .. } => FingerprintKind::Annotated,
        }
    }

    pub fn is_module(&self) -> bool {
        match self {
            Self::Subclass { is_module, .. } | Self::Annotated { is_module, .. } => *is_module,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = if self.is_module() { " (module)" } else { "" };
        match self {
            Self::Subclass {
                super_class_name, ..
            } => write!(f, "subclass of {}{}", super_class_name, module),
            Self::Annotated {
                annotation_name, ..
            } => write!(f, "annotated with @{}{}", annotation_name, module),
        }
    }
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subclass => write!(f, "subclass"),
            Self::Annotated => write!(f, "annotated"),
        }
    }
}
