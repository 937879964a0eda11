//! PATCH operation data model (RFC 7644 §3.5.2, spec.md §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One operation in a PATCH request body's `Operations` array.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatchOperation {
    /// `add`, `remove`, or `replace`; matched case-insensitively on input.
    pub op: PatchOp,
    /// Target attribute path. Absent or empty targets the resource root.
    #[serde(default)]
    pub path: Option<String>,
    /// The value to add or replace with. Absent for `remove`.
    #[serde(default)]
    pub value: Option<Value>,
}

/// The PATCH operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

impl<'de> Deserialize<'de> for PatchOp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "add" => Ok(PatchOp::Add),
            "remove" => Ok(PatchOp::Remove),
            "replace" => Ok(PatchOp::Replace),
            other => Err(serde::de::Error::custom(format!(
                "unknown PATCH op '{other}'"
            ))),
        }
    }
}

/// The full `PatchOp` request body: a SCIM schema URI plus the operation
/// list. The schema URI is accepted and ignored beyond presence.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchRequest {
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}
