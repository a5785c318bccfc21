//! Adapters - Concrete implementations of ports.

pub mod aws;
pub mod local;
