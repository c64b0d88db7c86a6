//! Shared trait definitions and core abstractions for Apploom.

pub mod error;
pub mod provider;
pub mod tool;

pub use error::{Result, ToolError};
pub use provider::{AgentPurpose, ProviderId};
pub use tool::{Tool, ToolOutput, ToolSchema};
