//! RunningHub workflow client: submit a job, wait for it, collect its text output.
//!
//! # Architecture
//!
//! - [`transport`] - [`Transport`] trait and the reqwest-backed [`HttpTransport`]
//! - [`api`] - the create / status / outputs / download calls
//! - [`envelope`] - `{code, msg, data}` decoding and status normalization
//! - [`runner`] - [`WorkflowRunner`], the create → poll → collect lifecycle
//! - [`aggregate`] - text artifact selection, download and joining
//!
//! # Lifecycle
//!
//! ```text
//! create ──► poll status every interval ──► outputs ──► download text artifacts
//!               │            │
//!               │            └─ FAILED ─────────► RunError::JobFailed
//!               └─ deadline / cancel ───────────► RunError::Interrupted
//! ```
//!
//! # Connection reuse
//!
//! Build one client with [`build_http_client`], wrap it in an [`HttpTransport`],
//! and share that transport (behind an `Arc`) across runners. Nothing in this
//! crate holds a process-wide client.

pub mod aggregate;
pub mod api;
pub mod envelope;
pub mod error;
pub mod runner;
pub mod transport;


use std::time::Duration;

pub use error::{EnvelopeError, InterruptCause, RunError, RunErrorKind, Stage, TransportError};
pub use hubrun_types;
pub use runner::{RunnerSettings, WorkflowRunner, deadline_after};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpTransport, RawResponse, Transport, TransportFut};

/// Public RunningHub endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.runninghub.ai";

/// Wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Run budget when the caller supplies no deadline.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// Per-request timeout for every HTTP call, downloads included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_PAYLOAD_SNIPPET_BYTES: usize = 32 * 1024;

/// Build the shared HTTP client.
///
/// `request_timeout` caps each individual request; the run deadline is enforced
/// separately by the runner.
pub fn build_http_client(request_timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .user_agent(concat!("hubrun/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Lossy text of a response body, truncated for error messages and logs.
pub(crate) fn payload_snippet(body: &[u8]) -> String {
    if body.len() > MAX_PAYLOAD_SNIPPET_BYTES {
        let text = String::from_utf8_lossy(&body[..MAX_PAYLOAD_SNIPPET_BYTES]);
        return format!("{text}...(truncated)");
    }
    String::from_utf8_lossy(body).into_owned()
}
