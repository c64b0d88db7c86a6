//! Sandbox liveness probing, best-effort dev-server start, and diagnostic
//! log post-processing for status checks.

use std::sync::Arc;
use std::time::Duration;

use apploom_sandbox::SandboxHandle;
use tracing::{info, warn};

/// Probe the app port; prints the HTTP status code, or "000" when the
/// connection itself fails.
pub const HEALTH_PROBE_COMMAND: &str =
    "curl -s -o /dev/null -w '%{http_code}' http://localhost:3000 || echo '000'";

/// Start the dev server in the background; `|| true` keeps the command from
/// failing the step when a server is already running.
pub const DEV_SERVER_START_COMMAND: &str =
    "cd /home/user && (npm run dev > /tmp/nextjs.log 2>&1 &) || true";

/// Where the dev server writes its output inside the sandbox.
pub const DEV_SERVER_LOG_PATH: &str = "/tmp/nextjs.log";

/// Trailing window of log text returned to callers.
pub const LOG_TAIL_CHARS: usize = 2000;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const START_TIMEOUT: Duration = Duration::from_secs(15);
const STARTUP_GRACE: Duration = Duration::from_secs(3);

const HYDRATION_SIGNATURE: &str = "Hydration failed";
const CLIENT_BOUNDARY_SIGNATURE: &str = "only works in a Client Component";

const HYDRATION_ADVICE: &str = "\n\nHint: a hydration mismatch usually means server-rendered \
HTML differs from the first client render. Check for Date.now(), Math.random() or \
locale-dependent formatting rendered outside a useEffect.";

const CLIENT_BOUNDARY_ADVICE: &str = "\n\nHint: a hook or browser API is being used in a server \
component. Add \"use client\" at the top of the file that uses it.";

pub fn probe_is_healthy(stdout: &str) -> bool {
    stdout.trim() == "200"
}

/// Run the liveness probe once. Any execution failure counts as unhealthy.
pub async fn probe(sandbox: &Arc<dyn SandboxHandle>) -> bool {
    match sandbox.run_command(HEALTH_PROBE_COMMAND, PROBE_TIMEOUT).await {
        Ok(output) => probe_is_healthy(&output.stdout),
        Err(e) => {
            warn!(error = %e, "Liveness probe failed to execute");
            false
        }
    }
}

/// Verify the app is serving; if not, best-effort start the dev server and
/// wait a short fixed grace period. The public URL is returned either way —
/// a failed probe is tolerated, not fatal.
pub async fn ensure_app_serving(sandbox: &Arc<dyn SandboxHandle>, port: u16) -> String {
    let url = sandbox.public_url(port);

    if probe(sandbox).await {
        return url;
    }

    info!(sandbox_id = sandbox.id(), "App not serving, attempting dev-server start");
    if let Err(e) = sandbox
        .run_command(DEV_SERVER_START_COMMAND, START_TIMEOUT)
        .await
    {
        warn!(error = %e, "Dev-server start command failed");
    }

    // Fixed grace instead of polling, to bound the step's execution time.
    tokio::time::sleep(STARTUP_GRACE).await;
    url
}

/// Truncate to the trailing window, then append advice for known error
/// signatures found anywhere in the full log.
pub fn prepare_log_for_display(log: &str) -> String {
    let mut display = tail(log, LOG_TAIL_CHARS);

    if log.contains(HYDRATION_SIGNATURE) {
        display.push_str(HYDRATION_ADVICE);
    }
    if log.contains(CLIENT_BOUNDARY_SIGNATURE) {
        display.push_str(CLIENT_BOUNDARY_ADVICE);
    }
    display
}

fn tail(log: &str, max_chars: usize) -> String {
    let total = log.chars().count();
    if total <= max_chars {
        return log.to_string();
    }
    let tail: String = log.chars().skip(total - max_chars).collect();
    format!("…{tail}")
}
