//! Domain layer - Pure logic, no I/O beyond reading local files handed in by callers.

pub mod checks;
pub mod destination;
pub mod edm4u;
pub mod media;
pub mod platform;
pub mod podfile;
pub mod runner;
pub mod sheets;
pub mod sync_plan;
