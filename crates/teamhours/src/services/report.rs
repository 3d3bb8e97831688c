//! Report Service
//!
//! Periodically logs a summary of the roster. Depends on [`RosterService`],
//! which it obtains from the registry when constructed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use service_registry::{
    Discoverable, Service, ServiceError, ServiceKind, ServiceRegistry, ServiceResult,
};

use crate::config::ReportConfig;

use super::RosterService;

/// Periodic team-hours summary
pub struct ReportService {
    roster: Arc<RosterService>,
    interval: Duration,
    stop_timeout: Duration,
    /// Set to true to ask the report loop to exit
    shutdown: watch::Sender<bool>,
    /// True while the report loop is running
    running: watch::Sender<bool>,
    reports: AtomicU64,
}

impl ReportService {
    /// Create the service, resolving the roster from the registry
    ///
    /// The roster must already be registered.
    pub fn new(registry: &ServiceRegistry, config: &ReportConfig) -> ServiceResult<Self> {
        let roster = registry
            .fetch::<RosterService>()
            .map_err(|e| ServiceError::Dependency(e.to_string()))?;

        Ok(Self::with_roster(roster, config.interval(), config.stop_timeout()))
    }

    /// Create the service around an existing roster
    pub fn with_roster(roster: Arc<RosterService>, interval: Duration, stop_timeout: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (running, _) = watch::channel(false);

        Self {
            roster,
            interval,
            stop_timeout,
            shutdown,
            running,
            reports: AtomicU64::new(0),
        }
    }

    /// Number of reports published so far
    pub fn report_count(&self) -> u64 {
        self.reports.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    fn publish_report(&self) {
        let members = self.roster.members();
        let total: u64 = members.iter().map(|m| u64::from(m.hours)).sum();
        let idle = members.iter().filter(|m| m.hours == 0).count();

        info!(
            month = %self.roster.month(),
            members = members.len(),
            total_hours = total,
            idle,
            "Team hours report"
        );
        self.reports.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Service for ReportService {
    async fn start(&self) {
        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow_and_update() {
            debug!("Report service stopped before it started");
            return;
        }

        self.running.send_replace(true);
        info!(interval = ?self.interval, "Report loop started");

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => self.publish_report(),
            }
        }

        self.running.send_replace(false);
        debug!("Report loop exited");
    }

    async fn stop(&self) -> ServiceResult<()> {
        self.shutdown.send_replace(true);

        let mut running_rx = self.running.subscribe();
        let exited = tokio::time::timeout(self.stop_timeout, async {
            while *running_rx.borrow_and_update() {
                if running_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;

        match exited {
            Ok(()) => {
                info!(reports = self.report_count(), "Report service stopped");
                Ok(())
            }
            Err(_) => {
                warn!(timeout = ?self.stop_timeout, "Report loop did not exit in time");
                Err(ServiceError::ShutdownTimeout)
            }
        }
    }

    async fn status(&self) -> ServiceResult<()> {
        if !self.is_running() {
            return Err(ServiceError::NotRunning(Self::KIND.to_string()));
        }

        self.roster
            .status()
            .await
            .map_err(|e| ServiceError::Degraded(format!("roster unavailable: {}", e)))
    }
}

impl Discoverable for ReportService {
    const KIND: ServiceKind = ServiceKind::new("report");
}
