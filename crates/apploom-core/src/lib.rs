//! Apploom Core - the orchestrator daemon.
//!
//! Wires storage, the credential vault, the sandbox gateway and the LLM
//! provider registry into durable code-agent workflows, exposed over an
//! HTTP event surface.

pub mod config;
pub mod health;
pub mod prompts;
pub mod server;
pub mod workflow;

pub use config::CoreConfig;
pub use workflow::{CodeAgentEvent, EventDispatcher, WorkflowContext};
