use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote task identifier, handed out once by the create call.
///
/// Every status and outputs request for a run is keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task id must not be empty")]
pub struct EmptyTaskIdError;

impl TaskId {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyTaskIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyTaskIdError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskId {
    type Error = EmptyTaskIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
