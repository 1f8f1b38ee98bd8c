//! Shared data models for the monitor.

pub mod activity;
pub mod process;
pub mod target;
pub mod view;

// Re-export commonly used types
pub use activity::LogEntry;
pub use process::{Process, ProcessSnapshot};
pub use target::{Target, MYSQL_PORT};
pub use view::{RenderFrame, StatusView};
