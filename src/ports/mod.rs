//! Ports - Trait definitions for everything that leaves the process.

pub mod cdn;
pub mod command;
pub mod http;
pub mod identity;
pub mod media;
pub mod storage;
