//! Roster Service
//!
//! Owns the team-hours records for the tracked month. Other services reach it
//! through the registry rather than a global.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use service_registry::{Discoverable, Service, ServiceError, ServiceKind, ServiceResult};

use crate::config::RosterConfig;

/// A team member and the hours logged this month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub hours: u32,
    pub month: String,
}

/// Errors from roster operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("Roster is closed")]
    Closed,

    #[error("Unknown member: {0}")]
    UnknownMember(String),
}

/// In-memory team roster
pub struct RosterService {
    month: String,
    members: RwLock<Vec<Member>>,
    open: AtomicBool,
}

impl RosterService {
    /// Create a roster seeded from configuration
    pub fn new(config: &RosterConfig) -> Self {
        let members = config
            .members
            .iter()
            .map(|m| Member {
                member_id: m.member_id.clone(),
                first_name: m.first_name.clone(),
                last_name: m.last_name.clone(),
                hours: m.hours,
                month: config.month.clone(),
            })
            .collect();

        Self {
            month: config.month.clone(),
            members: RwLock::new(members),
            open: AtomicBool::new(false),
        }
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    /// Snapshot of all members
    pub fn members(&self) -> Vec<Member> {
        self.members.read().clone()
    }

    /// Look up a member by ID
    pub fn member(&self, member_id: &str) -> Option<Member> {
        self.members
            .read()
            .iter()
            .find(|m| m.member_id == member_id)
            .cloned()
    }

    /// Add hours to a member, returning their new total
    pub fn record_hours(&self, member_id: &str, hours: u32) -> Result<u32, RosterError> {
        if !self.is_open() {
            return Err(RosterError::Closed);
        }

        let mut members = self.members.write();
        let member = members
            .iter_mut()
            .find(|m| m.member_id == member_id)
            .ok_or_else(|| RosterError::UnknownMember(member_id.to_string()))?;

        member.hours = member.hours.saturating_add(hours);
        Ok(member.hours)
    }

    /// Sum of hours across the team
    pub fn total_hours(&self) -> u64 {
        self.members.read().iter().map(|m| u64::from(m.hours)).sum()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Hold the member list exclusively, stalling every reader until dropped
    #[cfg(test)]
    pub(crate) fn lock_members(&self) -> parking_lot::RwLockWriteGuard<'_, Vec<Member>> {
        self.members.write()
    }
}

#[async_trait]
impl Service for RosterService {
    async fn start(&self) {
        self.open.store(true, Ordering::SeqCst);
        info!(
            month = %self.month,
            members = self.members.read().len(),
            "Roster open"
        );
    }

    async fn stop(&self) -> ServiceResult<()> {
        self.open.store(false, Ordering::SeqCst);
        info!(month = %self.month, total_hours = self.total_hours(), "Roster closed");
        Ok(())
    }

    async fn status(&self) -> ServiceResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ServiceError::NotRunning(Self::KIND.to_string()))
        }
    }
}

impl Discoverable for RosterService {
    const KIND: ServiceKind = ServiceKind::new("roster");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemberConfig;

    fn seeded() -> RosterService {
        RosterService::new(&RosterConfig {
            month: "Aug 2019".to_string(),
            members: vec![
                MemberConfig {
                    member_id: "1".to_string(),
                    first_name: "Boris".to_string(),
                    last_name: "Yakimov".to_string(),
                    hours: 108,
                },
                MemberConfig {
                    member_id: "2".to_string(),
                    first_name: "Vname2".to_string(),
                    last_name: "name2".to_string(),
                    hours: 157,
                },
            ],
        })
    }

    #[test]
    fn test_seeded_from_config() {
        let roster = seeded();

        assert_eq!(roster.month(), "Aug 2019");
        assert_eq!(roster.members().len(), 2);
        assert_eq!(roster.total_hours(), 265);

        let boris = roster.member("1").unwrap();
        assert_eq!(boris.first_name, "Boris");
        assert_eq!(boris.month, "Aug 2019");
        assert!(roster.member("99").is_none());
    }

    #[tokio::test]
    async fn test_record_hours_requires_open_roster() {
        let roster = seeded();

        assert_eq!(roster.record_hours("1", 2), Err(RosterError::Closed));
        assert!(roster.status().await.is_err());

        roster.start().await;
        assert_eq!(roster.record_hours("1", 2), Ok(110));
        assert_eq!(
            roster.record_hours("42", 1),
            Err(RosterError::UnknownMember("42".to_string()))
        );
        assert_eq!(roster.total_hours(), 267);
        assert!(roster.status().await.is_ok());

        roster.stop().await.unwrap();
        assert_eq!(roster.record_hours("1", 2), Err(RosterError::Closed));
        assert_eq!(
            roster.status().await,
            Err(ServiceError::NotRunning("roster".to_string()))
        );
    }
}
