//! Framework Registry - 프레임워크 등록 및 로드
//!
//! Frameworks are resolved by implementation name at run time. The host
//! registers a factory per name; the driver only ever asks for a name and
//! either gets a fresh instance or learns that nothing is registered.
//!
//! ```ignore
//! let mut registry = FrameworkRegistry::with_builtins();
//! registry.register("org.example.SpecFramework", || Ok(Box::new(SpecFramework::new())));
//!
//! match registry.load("org.example.SpecFramework") {
//!     Ok(framework) => { /* ... */ }
//!     Err(LoadError::NotFound(name)) => { /* logged, skipped */ }
//!     Err(e) => { /* fatal for the run */ }
//! }
//! ```

use super::builtin;
use super::traits::Framework;
use crate::CaughtPanic;
use forkrun_foundation::Error;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds one framework instance
pub type FrameworkFactory = Arc<dyn Fn() -> anyhow::Result<Box<dyn Framework>> + Send + Sync>;

/// 프레임워크 로드 실패
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Nothing registered under the name. Recoverable.
    #[error("Framework implementation '{0}' not present.")]
    NotFound(String),

    /// The factory failed or panicked. Fatal for the run.
    #[error("Failed to construct framework '{name}': {cause:#}")]
    Construction { name: String, cause: anyhow::Error },
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Native failure carrying the whole cause chain.
    pub fn into_failure(self) -> anyhow::Error {
        match self {
            Self::NotFound(name) => Error::FrameworkNotFound(name).into(),
            Self::Construction { name, cause } => {
                cause.context(format!("Failed to construct framework '{}'", name))
            }
        }
    }
}

/// 프레임워크 레지스트리
pub struct FrameworkRegistry {
    factories: HashMap<String, FrameworkFactory>,
}

impl FrameworkRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Builtin 프레임워크를 포함한 레지스트리 생성
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// 프레임워크 팩토리 등록 (같은 이름은 덮어씀)
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Box<dyn Framework>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registered framework factory: {}", name);
        self.factories.insert(name, Arc::new(factory));
    }

    /// Register a framework type constructed with `Default`.
    pub fn register_default<T>(&mut self, name: impl Into<String>)
    where
        T: Framework + Default + 'static,
    {
        self.register(name, || Ok(Box::new(T::default()) as Box<dyn Framework>));
    }

    /// 이름으로 팩토리 조회
    pub fn resolve(&self, name: &str) -> Option<FrameworkFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 등록된 이름 목록 (정렬됨)
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Resolve `name` and construct one instance.
    pub fn load(&self, name: &str) -> Result<Box<dyn Framework>, LoadError> {
        let factory = self
            .resolve(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;

        let built = catch_unwind(AssertUnwindSafe(|| factory()))
            .unwrap_or_else(|payload| Err(CaughtPanic::from_payload(payload).failure()));

        match built {
            Ok(framework) => {
                info!("Loaded framework: {} ({})", name, framework.name());
                Ok(framework)
            }
            Err(cause) => Err(LoadError::Construction {
                name: name.to_string(),
                cause,
            }),
        }
    }
}

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
