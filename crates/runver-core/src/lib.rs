//! Core types and configuration for runver.
//!
//! This crate defines resource naming and validation ([`names`]), the hook
//! slots users fill to customise generated artifacts ([`hooks`]), the
//! `runver.toml` schema ([`RunverConfig`]), and shared error types.

pub mod config;
pub mod error;
pub mod hooks;
pub mod names;

pub use config::{DeployConfig, HookSpec, HooksConfig, ProjectConfig, RunverConfig};
pub use error::{Error, Result};
pub use hooks::{HookContext, HookError, Hooks, RuntimeConfig};
pub use names::ResourceNames;
