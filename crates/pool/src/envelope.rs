use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Kind of an envelope carrying a [`TaskDefinition`](fanout_core::TaskDefinition).
pub const TASK_DEFINITION: &str = "task.definition";

/// Kind of an envelope carrying a [`TaskOutcome`](crate::TaskOutcome).
pub const TASK_OUTCOME: &str = "task.outcome";

/// Wire-format envelope for everything that crosses into or out of a unit.
///
/// Payloads are MessagePack-encoded. A unit only ever sees the bytes of an
/// envelope, never the caller's objects, which is what keeps units isolated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// What the payload is (`task.definition`, `task.outcome`).
    pub kind: String,

    /// MessagePack-encoded payload bytes.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    pub timestamp: DateTime<Utc>,

    /// Ties an outcome back to the definition that produced it.
    pub correlation_id: Uuid,

    /// Schema version for forward-compatible evolution.
    #[serde(default = "default_version")]
    pub version: u16,
}

/// Default version for envelopes that omit the field.
fn default_version() -> u16 {
    1
}

impl TaskEnvelope {
    /// Create a new envelope, serializing the payload with MessagePack.
    pub fn new<T: Serialize>(kind: impl Into<String>, payload: &T) -> Result<Self, TaskError> {
        Self::with_correlation(kind, payload, Uuid::new_v4())
    }

    /// Create an envelope with an explicit correlation id (for replies).
    pub fn with_correlation<T: Serialize>(
        kind: impl Into<String>,
        payload: &T,
        correlation_id: Uuid,
    ) -> Result<Self, TaskError> {
        Ok(Self {
            kind: kind.into(),
            payload: rmp_serde::to_vec_named(payload)?,
            timestamp: Utc::now(),
            correlation_id,
            version: 1,
        })
    }

    /// Deserialize the payload, checking it is of the expected kind.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self, kind: &str) -> Result<T, TaskError> {
        if self.kind != kind {
            return Err(TaskError::Decoding(format!(
                "expected a {kind} envelope, got {}",
                self.kind
            )));
        }
        Ok(rmp_serde::from_slice(&self.payload)?)
    }

    /// Serialize this entire envelope to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TaskError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize an envelope from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TaskError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}
