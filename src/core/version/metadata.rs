use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::LauncherResult;

use super::descriptor::VersionDescriptor;

/// Resolved vanilla version metadata, as returned by the asset worker.
///
/// Kept as raw JSON so the protocol does not depend on the descriptor
/// layout; the launch builder parses it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionMetadata(Value);

/// Resolved mod-loader metadata (`forgeData` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModLoaderMetadata(Value);

impl VersionMetadata {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn descriptor(&self) -> LauncherResult<VersionDescriptor> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

impl ModLoaderMetadata {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn descriptor(&self) -> LauncherResult<VersionDescriptor> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}
