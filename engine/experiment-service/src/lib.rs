//! Carbon Market Experiment Service Library
//!
//! Configuration loading, logging setup and the round driver used by the
//! `carbon-market` binary.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod script;
pub mod service;

pub use config::{LoggingConfig, ServiceConfig, ServiceSettings};
pub use logging::initialize_logging;
pub use script::{ReplayScript, ScriptEvent, ScriptError, Stage};
pub use service::{ExperimentService, ParticipantResult, RoundReport};

/// Load configuration from an optional file and the environment
pub fn load_configuration(path: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(path).context("Failed to load service configuration")
}
