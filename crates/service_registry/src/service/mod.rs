//! Service Lifecycle
//!
//! This module defines the capability set every managed subsystem implements
//! and the registry that orchestrates them.
//!
//! # Lifecycle
//!
//! Services expose three hooks:
//! - `start`: Begins the service's main activity (spawned, never awaited by the registry)
//! - `stop`: Terminates everything the service owns, resolving once it has
//! - `status`: Reports whether the service is healthy

mod registry;

pub use registry::*;

use std::fmt;

use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Service Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by a service from `stop` or `status`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Service not running: {0}")]
    NotRunning(String),

    #[error("Service degraded: {0}")]
    Degraded(String),

    #[error("Shutdown timeout")]
    ShutdownTimeout,

    #[error("Dependency unavailable: {0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ─────────────────────────────────────────────────────────────────────────────
// Service Kind
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier for one concrete service implementation
///
/// Kinds are declared by the implementation itself (see [`Discoverable::KIND`])
/// and are the registry's lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKind(&'static str);

impl ServiceKind {
    /// Create a kind from a static name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The kind's name
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Traits
// ─────────────────────────────────────────────────────────────────────────────

/// The capability set every registered subsystem implements
///
/// Methods take `&self`: the registry hands the same instance to every
/// dependent, so services keep their own state behind interior mutability.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Run the service's main activity
    ///
    /// Spawned as its own task by [`ServiceRegistry::start_all`]. There is no
    /// error channel; a service that fails to come up reports it via `status`.
    async fn start(&self);

    /// Terminate all activity owned by the service
    ///
    /// Must not resolve until that activity has actually ended. Implementations
    /// are responsible for bounding how long this takes.
    async fn stop(&self) -> ServiceResult<()>;

    /// Health check
    async fn status(&self) -> ServiceResult<()>;
}

/// A service that can be registered and looked up by its declared kind
pub trait Discoverable: Service + Sized {
    /// Kind under which instances of this type are registered
    const KIND: ServiceKind;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
