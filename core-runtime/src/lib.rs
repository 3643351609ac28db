//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playlist sync core:
//! - Logging and tracing infrastructure
//! - Configuration management (builder and environment loading)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the engine and service
//! crates depend on. It establishes the logging conventions and the single
//! settings object every other crate reads its tunables from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ReconcileStrategy, SyncSettings, SyncSettingsBuilder, WeeklySettings};
pub use error::{Error, Result};
