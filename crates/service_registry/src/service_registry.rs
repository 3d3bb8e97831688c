//! Service Registry - Lifecycle management for in-process services
//!
//! This crate contains the `Service` capability set and the registry that
//! starts, stops and hands out registered services.

pub mod service;

pub use service::{
    Discoverable, RegistryError, RegistryResult, Service, ServiceError, ServiceKind,
    ServiceRegistry, ServiceResult,
};
