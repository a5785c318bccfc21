//! Pipewright - release pipeline tooling for the Unity mobile build.
//!
//! Hexagonal Architecture:
//! - domain/: Pure logic (platforms, destinations, sync plans, encoder settings,
//!   Podfile and EDM4U documents, check reports)
//! - ports/: Trait definitions for everything that touches the outside world
//! - adapters/: Concrete implementations (AWS SDK, local filesystem, processes, HTTP)
//! - application/: One service per command-line utility
//! - config: Environment configuration
//!
//! Each binary under `src/bin/` is an independent utility; they share this
//! library but no runtime state.

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod ports;
pub mod telemetry;

pub use error::{BoxError, ConfigError, PipelineError};
