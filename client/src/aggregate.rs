//! Turning a finished task's output list into one block of text.
//!
//! Every selected artifact must download cleanly; the first failure aborts the
//! whole assembly and nothing partial is returned.

use hubrun_types::OutputItem;

use crate::api;
use crate::error::RunError;
use crate::transport::Transport;

/// Separator placed between consecutive artifacts (one blank line).
pub const ARTIFACT_SEPARATOR: &str = "\n\n";

/// Items worth downloading, in list order.
#[must_use]
pub fn select_text_outputs(items: &[OutputItem]) -> Vec<&OutputItem> {
    items.iter().filter(|item| item.is_text()).collect()
}

/// Download the text artifacts in `items` and join their trimmed bodies.
pub async fn assemble_text(
    transport: &dyn Transport,
    items: &[OutputItem],
) -> Result<String, RunError> {
    let selected = select_text_outputs(items);
    if selected.is_empty() {
        tracing::warn!(total = items.len(), "No text artifacts among task outputs");
        return Err(RunError::NoTextOutput { total: items.len() });
    }

    let mut parts = Vec::with_capacity(selected.len());
    for item in selected {
        let url = item.file_url.as_str();
        let response = api::download(transport, url).await.map_err(|e| {
            tracing::warn!(%url, error = %e, "Artifact download failed");
            RunError::ArtifactDownload {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !response.is_ok() {
            tracing::warn!(%url, status = response.status, "Artifact download rejected");
            return Err(RunError::ArtifactDownload {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }
        tracing::debug!(%url, node_id = %item.node_id, bytes = response.body.len(), "Artifact downloaded");
        parts.push(String::from_utf8_lossy(&response.body).trim().to_string());
    }

    Ok(parts.join(ARTIFACT_SEPARATOR))
}
