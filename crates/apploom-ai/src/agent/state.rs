//! Shared generation state mutated by the code agent's tools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State shared between the agent loop and its tools during one generation.
///
/// `files` maps sandbox-relative paths to full file contents; `summary` is
/// filled in once the agent emits its completion marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationState {
    pub summary: String,
    pub files: BTreeMap<String, String>,
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }

    /// A generation failed when it produced no summary or wrote no files.
    pub fn is_failure(&self) -> bool {
        !self.has_summary() || self.files.is_empty()
    }
}

/// Generation state behind an async lock, shared with the tools.
pub type SharedState = Arc<Mutex<GenerationState>>;

pub fn shared_state() -> SharedState {
    Arc::new(Mutex::new(GenerationState::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_requires_both_summary_and_files() {
        let mut state = GenerationState::new();
        assert!(state.is_failure());

        state.summary = "built a page".to_string();
        assert!(state.is_failure());

        state
            .files
            .insert("app/page.tsx".to_string(), "export default ...".to_string());
        assert!(!state.is_failure());

        state.summary = "   ".to_string();
        assert!(state.is_failure());
    }
}
