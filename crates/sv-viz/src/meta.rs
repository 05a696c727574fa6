//! Provenance metadata shared by every artifact.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sv_core::{Error, Result};

/// Provenance block carried by every artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactMeta {
    /// Producing tool.
    pub tool: String,
    /// Tool version.
    pub tool_version: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_unix_ms: u128,
}

impl ArtifactMeta {
    /// Metadata stamped with the current time.
    pub fn now() -> Result<Self> {
        Ok(Self {
            tool: "survstat".to_string(),
            tool_version: sv_core::VERSION.to_string(),
            created_unix_ms: now_unix_ms()?,
        })
    }
}

fn now_unix_ms() -> Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Computation(format!("system time error: {}", e)))?;
    Ok(d.as_millis())
}
