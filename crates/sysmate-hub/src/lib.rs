//! # sysmate Hub
//!
//! Collaborator implementations for the sysmate core: model providers,
//! the OS system probe, the report store, and the tool catalog wiring
//! them into a registry.

pub mod probe;
pub mod providers;
pub mod report;
pub mod tools;
