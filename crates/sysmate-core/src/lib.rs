//! # sysmate Core
//!
//! Types, traits, and the tool-calling orchestration loop for sysmate.
//! The hub and CLI crates build on top of this one.

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod tool;
