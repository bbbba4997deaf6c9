//! Shared API types
//!
//! Status codes, readiness values and the request/response bodies exchanged
//! with platform clients. Status values travel as bare integers on the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ========================================
// Status Codes
// ========================================

/// Outcome code carried in every client-facing response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OpStatus {
    /// Operation succeeded
    Ok = 0,
    /// Bad launch-parameter signature or unknown/expired token
    AuthError = 1,
    /// Unexpected failure inside the service
    InternalError = 2,
    /// Group exists but its models are not ready yet
    NotReady = 3,
    /// A generation backend failed, timed out or is unknown
    MicroserviceError = 4,
    /// Persistent store unreachable or query failed
    StoreError = 5,
}

impl OpStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<OpStatus> for u8 {
    fn from(status: OpStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for OpStatus {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OpStatus::Ok),
            1 => Ok(OpStatus::AuthError),
            2 => Ok(OpStatus::InternalError),
            3 => Ok(OpStatus::NotReady),
            4 => Ok(OpStatus::MicroserviceError),
            5 => Ok(OpStatus::StoreError),
            other => Err(UnknownCode(other)),
        }
    }
}

/// Readiness of a group's models across all backends
///
/// Only `Ready` and `NotReady` are ever stored. `Unknown` is synthesized for
/// lookups of groups that have no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum GroupStatus {
    Ready = 0,
    NotReady = 1,
    Unknown = 2,
}

impl GroupStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a stored `status_id` column
    ///
    /// Stored rows only ever hold 0 or 1; anything else is reported as
    /// `Unknown` rather than failing the read.
    pub fn from_stored(status_id: i64) -> Self {
        match status_id {
            0 => GroupStatus::Ready,
            1 => GroupStatus::NotReady,
            _ => GroupStatus::Unknown,
        }
    }

    pub fn from_readiness(ready: bool) -> Self {
        if ready {
            GroupStatus::Ready
        } else {
            GroupStatus::NotReady
        }
    }
}

impl From<GroupStatus> for u8 {
    fn from(status: GroupStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for GroupStatus {
    type Error = UnknownCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(GroupStatus::Ready),
            1 => Ok(GroupStatus::NotReady),
            2 => Ok(GroupStatus::Unknown),
            other => Err(UnknownCode(other)),
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupStatus::Ready => write!(f, "READY"),
            GroupStatus::NotReady => write!(f, "NOT_READY"),
            GroupStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Integer outside the known code range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCode(pub u8);

impl fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status code {}", self.0)
    }
}

// ========================================
// Launch Parameters
// ========================================

/// Single (non-array) launch parameter value
///
/// Signed values are rendered the way the platform's reference signer
/// stringifies them: `true`/`false` as `True`/`False` and `null` as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamScalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl ParamScalar {
    /// Text that goes into the signed query string
    pub fn signed_text(&self) -> String {
        match self {
            ParamScalar::Null => "None".to_string(),
            ParamScalar::Bool(true) => "True".to_string(),
            ParamScalar::Bool(false) => "False".to_string(),
            ParamScalar::Number(n) => n.to_string(),
            ParamScalar::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for ParamScalar {
    fn from(value: &str) -> Self {
        ParamScalar::Text(value.to_string())
    }
}

/// Value of a single launch parameter
///
/// The platform delivers launch parameters as a query string, so most values
/// are strings. Clients that decode the query string first may send numbers,
/// booleans or nulls, and repeated keys arrive as arrays of scalars. Nested
/// arrays are not accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<ParamScalar>),
}

impl ParamValue {
    /// Values in encoding order (one per repeated key)
    pub fn encoded_values(&self) -> Vec<String> {
        match self {
            ParamValue::Null => vec![ParamScalar::Null.signed_text()],
            ParamValue::Bool(b) => vec![ParamScalar::Bool(*b).signed_text()],
            ParamValue::Number(n) => vec![n.to_string()],
            ParamValue::Text(s) => vec![s.clone()],
            ParamValue::List(items) => items.iter().map(ParamScalar::signed_text).collect(),
        }
    }

    /// Single value as text, `None` for nulls and arrays
    pub fn as_text(&self) -> Option<String> {
        match self {
            ParamValue::Null | ParamValue::List(_) => None,
            ParamValue::Bool(b) => Some(ParamScalar::Bool(*b).signed_text()),
            ParamValue::Number(n) => Some(n.to_string()),
            ParamValue::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// Launch parameters keyed by name (kept sorted)
pub type LaunchParams = BTreeMap<String, ParamValue>;

// ========================================
// Requests
// ========================================

/// Register a token after checking the launch-parameter signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub request: LaunchParams,
    pub token: String,
}

/// Replace an existing token with a new one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewRequest {
    pub old_token: String,
    pub new_token: String,
}

/// Start tracking a group and ship its posts to every backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddGroupRequest {
    pub auth: LaunchParams,
    pub token: String,
    pub group_id: i64,
    pub texts: Vec<String>,
}

/// Query one group's status, or page through the caller's groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetGroupsRequest {
    pub auth: LaunchParams,
    pub token: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// Generate content from an explicitly named backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub auth: LaunchParams,
    pub token: String,
    pub service_name: String,
    pub group_id: i64,
    pub hint: String,
}

/// Generate content from a backend fixed by the route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedGenerateRequest {
    pub auth: LaunchParams,
    pub token: String,
    pub group_id: i64,
    pub hint: String,
}

// ========================================
// Responses
// ========================================

/// Bare status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: OpStatus,
}

/// Group identifier paired with its readiness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAndStatus {
    pub group_id: i64,
    pub group_status: GroupStatus,
}

/// Page of groups; `count` is the total before slicing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupList {
    pub status: OpStatus,
    pub data: Vec<GroupAndStatus>,
    pub count: usize,
}

/// Status plus a generated string (text or a link to an image)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataString {
    pub status: OpStatus,
    pub data: String,
}

/// Response bodies that can carry a failure status on their own
pub trait StatusBody: Serialize {
    fn with_status(status: OpStatus) -> Self;
}

impl StatusBody for OperationResult {
    fn with_status(status: OpStatus) -> Self {
        Self { status }
    }
}

impl StatusBody for GroupList {
    fn with_status(status: OpStatus) -> Self {
        Self {
            status,
            data: Vec::new(),
            count: 0,
        }
    }
}

impl StatusBody for DataString {
    fn with_status(status: OpStatus) -> Self {
        Self {
            status,
            data: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_codes_serialize_as_integers() {
        let body = GroupList {
            status: OpStatus::Ok,
            data: vec![GroupAndStatus {
                group_id: 7,
                group_status: GroupStatus::Unknown,
            }],
            count: 1,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"status": 0, "data": [{"group_id": 7, "group_status": 2}], "count": 1})
        );
    }

    #[test]
    fn test_unknown_status_code_rejected() {
        let result: Result<OperationResult, _> = serde_json::from_value(json!({"status": 9}));
        assert!(result.is_err());
    }

    #[test]
    fn test_stored_status_decoding() {
        assert_eq!(GroupStatus::from_stored(0), GroupStatus::Ready);
        assert_eq!(GroupStatus::from_stored(1), GroupStatus::NotReady);
        assert_eq!(GroupStatus::from_stored(3), GroupStatus::Unknown);
    }

    #[test]
    fn test_param_values_accept_strings_numbers_and_arrays() {
        let params: LaunchParams = serde_json::from_value(json!({
            "vk_user_id": 494075,
            "vk_language": "ru",
            "vk_tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(params["vk_user_id"].encoded_values(), vec!["494075"]);
        assert_eq!(params["vk_language"].as_text().as_deref(), Some("ru"));
        assert_eq!(params["vk_tags"].encoded_values(), vec!["a", "b"]);
        assert_eq!(params["vk_tags"].as_text(), None);
    }

    #[test]
    fn test_param_values_accept_bools_nulls_and_mixed_arrays() {
        let params: LaunchParams = serde_json::from_value(json!({
            "vk_flag": true,
            "vk_none": null,
            "vk_z": [1, 2],
            "vk_mix": ["a", false, 3.5, null]
        }))
        .unwrap();

        assert_eq!(params["vk_flag"].encoded_values(), vec!["True"]);
        assert_eq!(params["vk_none"].encoded_values(), vec!["None"]);
        assert_eq!(params["vk_none"].as_text(), None);
        assert_eq!(params["vk_z"].encoded_values(), vec!["1", "2"]);
        assert_eq!(
            params["vk_mix"].encoded_values(),
            vec!["a", "False", "3.5", "None"]
        );
    }

    #[test]
    fn test_nested_arrays_rejected() {
        let result: Result<LaunchParams, _> =
            serde_json::from_value(json!({ "vk_z": [[1, 2]] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_get_groups_optional_fields_default() {
        let req: GetGroupsRequest =
            serde_json::from_value(json!({"auth": {}, "token": "t"})).unwrap();
        assert!(req.group_id.is_none());
        assert!(req.offset.is_none());
        assert!(req.count.is_none());
    }
}
