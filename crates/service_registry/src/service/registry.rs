//! Service Registry
//!
//! Holds one instance per service kind, starts them concurrently in
//! registration order and stops them one by one in reverse order.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Discoverable, Service, ServiceError, ServiceKind, ServiceResult};

// ─────────────────────────────────────────────────────────────────────────────
// Registry Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Service already registered: {0}")]
    DuplicateService(ServiceKind),

    #[error("Invalid argument: cannot fetch {requested} as service '{kind}' (registered as {registered})")]
    InvalidArgument {
        requested: &'static str,
        kind: ServiceKind,
        registered: &'static str,
    },

    #[error("Unknown service: {0}")]
    UnknownService(ServiceKind),

    #[error("Could not stop service '{kind}': {source}")]
    ServiceStop {
        kind: ServiceKind,
        #[source]
        source: ServiceError,
    },
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

// ─────────────────────────────────────────────────────────────────────────────
// Registered Service
// ─────────────────────────────────────────────────────────────────────────────

/// Internal representation of a registered service
///
/// `service` and `instance` point at the same allocation; the second one is
/// only used to hand typed references back out.
struct RegisteredService {
    service: Arc<dyn Service>,
    instance: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Map and order are kept under one lock so they never disagree.
#[derive(Default)]
struct RegistryInner {
    services: HashMap<ServiceKind, RegisteredService>,
    order: Vec<ServiceKind>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Composition-root registry of long-running services
///
/// The registry is responsible for:
/// - Holding exactly one instance per [`ServiceKind`]
/// - Starting every service concurrently, in registration order
/// - Stopping every service sequentially, in reverse registration order
/// - Handing dependents the same instance that was registered
///
/// # Example
///
/// ```rust,ignore
/// let registry = Arc::new(ServiceRegistry::new());
/// registry.register(Arc::new(Database::connect(&config)?))?;
///
/// // Dependents receive the registered instance, not a copy
/// let db = registry.fetch::<Database>()?;
/// registry.register(Arc::new(HttpServer::new(db)))?;
///
/// registry.start_all();
/// // ...
/// registry.stop_all().await?;
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    inner: RwLock<RegistryInner>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry wrapped in an Arc
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a service under its declared kind
    ///
    /// Fails with [`RegistryError::DuplicateService`] if that kind is already
    /// present, in which case the registry is left unchanged. No service
    /// method is called.
    pub fn register<S: Discoverable>(&self, service: Arc<S>) -> RegistryResult<()> {
        let kind = S::KIND;
        let mut inner = self.inner.write();

        if inner.services.contains_key(&kind) {
            return Err(RegistryError::DuplicateService(kind));
        }

        let instance: Arc<dyn Any + Send + Sync> = service.clone();
        inner.services.insert(
            kind,
            RegisteredService {
                service,
                instance,
                type_name: type_name::<S>(),
            },
        );
        inner.order.push(kind);

        tracing::debug!(%kind, position = inner.order.len(), "Registered service");
        Ok(())
    }

    /// Fetch the registered instance of `S`
    ///
    /// The requested type selects the kind to look up. Returns the same
    /// allocation that was registered, so every dependent shares one instance.
    pub fn fetch<S: Discoverable>(&self) -> RegistryResult<Arc<S>> {
        let inner = self.inner.read();
        let entry = inner
            .services
            .get(&S::KIND)
            .ok_or(RegistryError::UnknownService(S::KIND))?;

        Arc::clone(&entry.instance)
            .downcast::<S>()
            .map_err(|_| RegistryError::InvalidArgument {
                requested: type_name::<S>(),
                kind: S::KIND,
                registered: entry.type_name,
            })
    }

    /// Fetch the registered instance of `S` into a caller-owned slot
    ///
    /// The slot is only written on success.
    pub fn fetch_into<S: Discoverable>(&self, slot: &mut Option<Arc<S>>) -> RegistryResult<()> {
        *slot = Some(self.fetch::<S>()?);
        Ok(())
    }

    /// Start every service, in registration order, without waiting
    ///
    /// Each `start` runs in its own task and is never joined. Returning from
    /// here says nothing about whether any service is ready. Calling this
    /// twice starts every service twice.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_all(&self) {
        let services = self.snapshot();
        let kinds: Vec<_> = services.iter().map(|(kind, _)| kind.name()).collect();

        tracing::info!(?kinds, "Starting {} services", services.len());

        for (kind, service) in services {
            tracing::info!(%kind, "Starting service");
            tokio::spawn(async move {
                service.start().await;
                tracing::debug!(%kind, "Service start returned");
            });
        }
    }

    /// Stop every service, in reverse registration order
    ///
    /// Each `stop` is awaited before the next one is issued. The first failure
    /// halts the sequence: it is returned as [`RegistryError::ServiceStop`] and
    /// services registered before the failing one are left running.
    pub async fn stop_all(&self) -> RegistryResult<()> {
        let services = self.snapshot();

        tracing::info!("Stopping {} services", services.len());

        for (kind, service) in services.into_iter().rev() {
            tracing::info!(%kind, "Stopping service");

            if let Err(source) = service.stop().await {
                tracing::error!(%kind, error = %source, "Service failed to stop");
                return Err(RegistryError::ServiceStop { kind, source });
            }

            tracing::debug!(%kind, "Service stopped");
        }

        Ok(())
    }

    /// Query every service's health, in registration order
    pub async fn status_all(&self) -> Vec<(ServiceKind, ServiceResult<()>)> {
        let services = self.snapshot();
        let mut result = Vec::with_capacity(services.len());

        for (kind, service) in services {
            let status = service.status().await;
            if let Err(e) = &status {
                tracing::debug!(%kind, error = %e, "Service unhealthy");
            }
            result.push((kind, status));
        }

        result
    }

    /// Registered kinds, in registration order
    pub fn kinds(&self) -> Vec<ServiceKind> {
        self.inner.read().order.clone()
    }

    /// Check if a kind is registered
    pub fn contains(&self, kind: ServiceKind) -> bool {
        self.inner.read().services.contains_key(&kind)
    }

    /// Get the number of registered services
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    /// Check if there are no registered services
    pub fn is_empty(&self) -> bool {
        self.inner.read().order.is_empty()
    }

    /// Clone out the services in registration order so no lock is held
    /// while their methods run.
    fn snapshot(&self) -> Vec<(ServiceKind, Arc<dyn Service>)> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|kind| {
                inner
                    .services
                    .get(kind)
                    .map(|entry| (*kind, Arc::clone(&entry.service)))
            })
            .collect()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("order", &self.kinds())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
