//! Bounded agent calls shared by every driver.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::invoker::{AgentInput, AgentInvoker};
use super::role::AgentRole;
use crate::error::AgentCallError;

/// Invokes `invoker` for `role` until it answers, `timeout` elapses or
/// `cancel` fires, whichever comes first.
///
/// Returns the trimmed reply. A blank reply counts as malformed.
pub async fn call_bounded(
    invoker: &dyn AgentInvoker,
    role: AgentRole,
    memory_id: &str,
    input: &AgentInput,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, AgentCallError> {
    let started = Instant::now();

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentCallError::Cancelled),
        result = tokio::time::timeout(timeout, invoker.invoke(role, memory_id, input)) => {
            match result {
                Ok(reply) => reply,
                Err(_) => Err(AgentCallError::Timeout(timeout)),
            }
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(reply) => {
            let text = reply.text.trim();
            if text.is_empty() {
                tracing::warn!(target: "sparr::agent", role = %role, "Agent returned an empty reply");
                return Err(AgentCallError::Malformed("empty reply".into()));
            }
            tracing::info!(
                target: "sparr::agent",
                role = %role,
                purpose = ?input.purpose,
                elapsed_ms,
                reply_len = text.len(),
                "Agent replied"
            );
            Ok(text.to_string())
        }
        Err(err) => {
            tracing::warn!(target: "sparr::agent", role = %role, elapsed_ms, error = %err, "Agent call failed");
            Err(err)
        }
    }
}
