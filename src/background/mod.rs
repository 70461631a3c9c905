pub mod monitor;
pub mod service;

pub use monitor::{LoadStatus, NavigationMonitor, TabUpdate, Verdict};
pub use service::BackgroundService;
