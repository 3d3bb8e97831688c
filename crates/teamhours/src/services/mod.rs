//! Team-hours services and their wiring into the registry

mod report;
mod roster;

pub use report::*;
pub use roster::*;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::info;

use service_registry::{ServiceKind, ServiceRegistry, ServiceResult};

use crate::config::AppConfig;

/// Build a registry holding every team-hours service
///
/// Services are registered in dependency order: the roster first, then the
/// services that look it up. Stopping therefore tears dependents down first.
pub fn compose(config: &AppConfig) -> Result<Arc<ServiceRegistry>> {
    let registry = ServiceRegistry::new_shared();

    registry
        .register(Arc::new(RosterService::new(&config.roster)))
        .context("Failed to register roster service")?;

    let report = ReportService::new(&registry, &config.report)
        .context("Failed to create report service")?;
    registry
        .register(Arc::new(report))
        .context("Failed to register report service")?;

    info!(services = registry.len(), "Registry composed");
    Ok(registry)
}

/// Poll `status_all` until every service is healthy or `timeout` elapses
///
/// Returns the last sweep. `start_all` gives no readiness signal, so a single
/// sweep right after it can see services that simply have not started yet.
pub async fn await_healthy(
    registry: &ServiceRegistry,
    timeout: Duration,
) -> Vec<(ServiceKind, ServiceResult<()>)> {
    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    let deadline = Instant::now() + timeout;
    loop {
        let statuses = registry.status_all().await;
        if statuses.iter().all(|(_, status)| status.is_ok()) || Instant::now() >= deadline {
            return statuses;
        }
        tokio::time::sleep_until((Instant::now() + POLL_INTERVAL).min(deadline)).await;
    }
}
