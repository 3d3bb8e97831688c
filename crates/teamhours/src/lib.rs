//! Teamhours - Team hours tracker runtime
//!
//! This crate wires the team-hours services into a
//! [`service_registry::ServiceRegistry`]:
//! - Configuration loading (`teamhours.toml` plus environment overrides)
//! - The roster service owning the team's records
//! - A periodic report service that depends on the roster

pub use service_registry;

// Configuration
pub mod config;

// Registered services
pub mod services;
