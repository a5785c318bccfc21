//! Application layer - one service per utility, generic over the ports.

pub mod cocoapods;
pub mod datasync;
pub mod edm4u;
pub mod mirror;
pub mod publisher;
pub mod reencoder;
pub mod runner_setup;
