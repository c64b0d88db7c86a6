//! Daemon configuration from environment variables, with defaults suitable
//! for local development.

use std::env;
use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs_or(key: &str, default_secs: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(default_secs))
}

/// Runtime configuration for the orchestrator daemon.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// redb database file path.
    pub db_path: String,
    /// Address the HTTP event listener binds to.
    pub bind_addr: String,
    /// Sandbox control-plane base URL.
    pub sandbox_api_url: String,
    /// Sandbox control-plane API key.
    pub sandbox_api_key: String,
    /// Template the generation sandbox is created from.
    pub sandbox_template: String,
    /// Idle timeout applied at sandbox creation.
    pub sandbox_idle_timeout: Duration,
    /// Per-command execution timeout inside the sandbox.
    pub command_timeout: Duration,
    /// Port the generated app serves on inside the sandbox.
    pub app_port: u16,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: "apploom.db".to_string(),
            bind_addr: "127.0.0.1:8080".to_string(),
            sandbox_api_url: "http://localhost:4000".to_string(),
            sandbox_api_key: String::new(),
            sandbox_template: "zyro-nextjs-riaz37".to_string(),
            sandbox_idle_timeout: Duration::from_secs(600),
            command_timeout: Duration::from_secs(60),
            app_port: 3000,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env_or("APPLOOM_DB_PATH", &defaults.db_path),
            bind_addr: env_or("APPLOOM_BIND_ADDR", &defaults.bind_addr),
            sandbox_api_url: env_or("APPLOOM_SANDBOX_API_URL", &defaults.sandbox_api_url),
            sandbox_api_key: env_or("APPLOOM_SANDBOX_API_KEY", ""),
            sandbox_template: env_or("APPLOOM_SANDBOX_TEMPLATE", &defaults.sandbox_template),
            sandbox_idle_timeout: env_secs_or("APPLOOM_SANDBOX_IDLE_TIMEOUT_SECS", 600),
            command_timeout: env_secs_or("APPLOOM_COMMAND_TIMEOUT_SECS", 60),
            app_port: env::var("APPLOOM_APP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.app_port),
        }
    }
}
