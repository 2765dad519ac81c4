//! Decoding of the `{code, msg, data}` envelope every job-control call returns.
//!
//! Only two things are errors here: bytes that are not an envelope at all, and
//! an envelope with a non-zero `code`. The status field is decoded leniently:
//! the service has been seen returning `data` both as a bare string
//! (`"RUNNING"`) and as an object (`{"taskStatus": "RUNNING", ...}`).

use hubrun_types::{JobStatus, OutputItem, TaskId};
use serde::Deserialize;
use serde_json::Value;

use crate::error::EnvelopeError;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default, deserialize_with = "hubrun_types::null_as_default")]
    pub msg: String,
    #[serde(default)]
    pub data: Value,
}

/// Parse an envelope and reject non-zero `code`.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    if envelope.code != 0 {
        return Err(EnvelopeError::Rejected {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    Ok(envelope)
}

/// Shapes the status `data` field may take, tried in declaration order.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusData {
    Bare(String),
    Object(serde_json::Map<String, Value>),
}

/// Normalize the status carried in `data`. Never fails; undecodable is `Unknown`.
#[must_use]
pub fn status_from_data(data: &Value) -> JobStatus {
    match StatusData::deserialize(data) {
        Ok(StatusData::Bare(status)) => JobStatus::from_wire(&status),
        Ok(StatusData::Object(fields)) => fields
            .get("taskStatus")
            .and_then(Value::as_str)
            .map_or(JobStatus::Unknown, JobStatus::from_wire),
        Err(_) => JobStatus::Unknown,
    }
}

/// Decode a status response body into a normalized status.
pub fn decode_status(bytes: &[u8]) -> Result<JobStatus, EnvelopeError> {
    let envelope = decode_envelope(bytes)?;
    Ok(status_from_data(&envelope.data))
}

/// Task id nested at `data.taskId` of a create response, if present and non-empty.
#[must_use]
pub fn task_id_from_data(data: &Value) -> Option<TaskId> {
    let task_id = data.as_object()?.get("taskId")?.as_str()?;
    TaskId::new(task_id).ok()
}

/// Output descriptors from an outputs response. `null` data yields an empty list.
pub fn outputs_from_data(data: &Value) -> Result<Vec<OutputItem>, serde_json::Error> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    Vec::<OutputItem>::deserialize(data)
}
