//! Core domain models for provisioning
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, run results and the environment they run against.

pub mod config;
pub mod connection;
pub mod env;
pub mod mask;
pub mod pipeline;
pub mod step;
pub mod state;

pub use env::{ConfigError, EnvironmentConfig};
pub use mask::SecretMasker;
pub use pipeline::*;
pub use step::*;
pub use state::*;
