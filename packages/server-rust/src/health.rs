//! Health aggregator: liveness, readiness and build metadata.
//!
//! Readiness polls a fixed set of dependencies registered at construction.
//! It never triggers a probe itself; each dependency reports the flag its
//! own background loop maintains.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::notify::Notifier;
use crate::repository::UserRepository;

/// A dependency whose readiness feeds the aggregate readiness answer.
pub trait Readiness: Send + Sync {
    fn name(&self) -> &str;

    /// Must not block: reads the last probed state.
    fn is_ready(&self) -> bool;
}

/// Named adapter over a repository or notifier readiness flag.
#[derive(Clone)]
pub struct Dependency {
    name: &'static str,
    check: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Dependency {
    #[must_use]
    pub fn new(name: &'static str, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            check: Arc::new(check),
        }
    }

    #[must_use]
    pub fn repository(repo: Arc<dyn UserRepository>) -> Self {
        Self::new("repository", move || repo.is_ready())
    }

    #[must_use]
    pub fn notifier(notifier: Arc<dyn Notifier>) -> Self {
        Self::new("notifier", move || notifier.is_ready())
    }
}

impl Readiness for Dependency {
    fn name(&self) -> &str {
        self.name
    }

    fn is_ready(&self) -> bool {
        (self.check)()
    }
}

/// Readiness failed on the named dependency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency {dependency} is not ready")]
pub struct NotReady {
    pub dependency: String,
}

/// Process-wide build metadata, fixed at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub build_time: &'static str,
    pub version: &'static str,
    pub commit: &'static str,
}

impl BuildInfo {
    #[must_use]
    pub const fn current() -> Self {
        Self {
            build_time: match option_env!("ROSTER_BUILD_TIME") {
                Some(value) => value,
                None => "unknown",
            },
            version: env!("CARGO_PKG_VERSION"),
            commit: match option_env!("ROSTER_COMMIT") {
                Some(value) => value,
                None => "unknown",
            },
        }
    }
}

pub struct HealthService {
    deps: Vec<Arc<dyn Readiness>>,
    build: BuildInfo,
}

impl HealthService {
    #[must_use]
    pub fn new(deps: Vec<Arc<dyn Readiness>>) -> Self {
        Self {
            deps,
            build: BuildInfo::current(),
        }
    }

    /// Always succeeds: answering at all proves the process is alive.
    pub fn liveness(&self) {}

    /// Succeeds only when every dependency is ready.
    ///
    /// # Errors
    ///
    /// Returns [`NotReady`] for the first dependency reporting false; later
    /// dependencies are not consulted.
    pub fn readiness(&self) -> Result<(), NotReady> {
        match self.deps.iter().find(|dep| !dep.is_ready()) {
            Some(dep) => {
                warn!(dependency = dep.name(), "readiness check failed");
                Err(NotReady {
                    dependency: dep.name().to_string(),
                })
            }
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn version(&self) -> &BuildInfo {
        &self.build
    }
}
