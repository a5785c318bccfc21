//! Local adapters: filesystem mirror target, processes, HTTP and media probing.

pub mod fetch;
pub mod fs;
pub mod probe;
pub mod process;

pub use fetch::ReqwestFetcher;
pub use fs::FsStore;
pub use probe::FfprobeProbe;
pub use process::SystemRunner;
