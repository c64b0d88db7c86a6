//! Sandbox-backed tools exposed to the code agent.

pub mod files;
pub mod registry;
pub mod terminal;

pub use files::{CreateOrUpdateFilesTool, ReadFilesTool};
pub use registry::ToolRegistry;
pub use terminal::TerminalTool;
