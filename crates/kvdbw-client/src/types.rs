//! Wire types for the backend REST protocol.

use serde::{Deserialize, Serialize};

/// A logical partition of keys on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    /// Namespace name.
    pub name: String,
    /// Number of keys, as reported by the backend.
    #[serde(default)]
    pub size: u64,
    /// Access flag reported by the backend.
    #[serde(default)]
    pub access: bool,
}

/// A key and its value inside one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Key name.
    pub key: String,
    /// Arbitrary string value; may span several lines.
    #[serde(default)]
    pub value: String,
    /// Owning namespace. Not sent by the backend; filled in by the client.
    #[serde(default, skip_serializing)]
    pub namespace: String,
}

// --- Internal request/response bodies ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UpdateType {
    String,
    Roll,
    Generate,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateBody<'a> {
    #[serde(rename = "type")]
    pub kind: UpdateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NamespaceBody<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HealthBody {
    pub status: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn update_body_serializes_type_and_optional_value() {
        let set = UpdateBody {
            kind: UpdateType::String,
            value: Some("v"),
        };
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!({"type": "string", "value": "v"})
        );

        let roll = UpdateBody {
            kind: UpdateType::Roll,
            value: None,
        };
        assert_eq!(
            serde_json::to_value(&roll).unwrap(),
            serde_json::json!({"type": "roll"})
        );
    }

    #[test]
    fn namespace_tolerates_missing_counters() {
        let ns: Namespace = serde_json::from_str(r#"{"name":"app"}"#).unwrap();
        assert_eq!(ns.size, 0);
        assert!(!ns.access);
    }
}
