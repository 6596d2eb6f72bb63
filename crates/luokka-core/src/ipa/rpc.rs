//! FreeIPA JSON-RPC wire format

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::directory::{DirectoryError, DirectoryResult, Lookup, MemberAdd, StudentRecord};

/// `NotFound`
pub const NOT_FOUND: i64 = 4001;

/// A JSON-RPC request body
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub method: &'a str,
    pub params: (Vec<Value>, Map<String, Value>),
    pub id: u32,
}

/// A JSON-RPC response body
#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// Error object of a failed command
#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub name: String,
}

impl From<RpcError> for DirectoryError {
    fn from(err: RpcError) -> Self {
        Self::Rejected {
            name: err.name,
            code: err.code,
            message: err.message,
        }
    }
}

/// One command inside a `batch` call
#[derive(Debug, Serialize)]
pub struct BatchCall {
    pub method: &'static str,
    pub params: (Vec<Value>, Map<String, Value>),
}

impl BatchCall {
    pub fn new(method: &'static str, args: Vec<Value>, options: Map<String, Value>) -> Self {
        Self {
            method,
            params: (args, options),
        }
    }
}

/// Per-command results of a `batch` call
pub fn batch_results(result: Value, expected: usize) -> DirectoryResult<Vec<Value>> {
    let results = match result {
        Value::Object(mut obj) => obj.remove("results"),
        _ => None,
    };
    let Some(Value::Array(results)) = results else {
        return Err(DirectoryError::Protocol(
            "batch response without results".to_string(),
        ));
    };
    if results.len() != expected {
        return Err(DirectoryError::Protocol(format!(
            "batch returned {} results for {expected} commands",
            results.len()
        )));
    }
    Ok(results)
}

/// Error code and message of a batch entry, if it failed
fn entry_error(entry: &Value) -> Option<(Option<i64>, String)> {
    let error = entry.get("error")?;
    if error.is_null() {
        return None;
    }
    let message = match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    };
    let code = entry
        .get("error_code")
        .and_then(Value::as_i64)
        .or_else(|| error.get("code").and_then(Value::as_i64));
    Some((code, message))
}

/// Interpret a `user_show` batch entry
pub fn lookup_outcome(entry: &Value) -> Lookup {
    match entry_error(entry) {
        None => Lookup::Found,
        Some((Some(NOT_FOUND), _)) => Lookup::Missing,
        Some((_, message)) => Lookup::Failed(message),
    }
}

/// Interpret a `group_add_member` batch entry for a single user
///
/// The command itself succeeds when a user is already a member; the refusal
/// shows up under `failed.member.user`.
pub fn member_add_outcome(entry: &Value) -> MemberAdd {
    if let Some((_, message)) = entry_error(entry) {
        return MemberAdd::Failed(message);
    }

    let failed = entry
        .pointer("/failed/member/user")
        .and_then(Value::as_array)
        .and_then(|users| users.first());
    if let Some(failure) = failed {
        let reason = match failure {
            Value::Array(pair) => pair.get(1).and_then(Value::as_str).unwrap_or_default(),
            _ => "",
        };
        return if reason.contains("already a member") || reason.is_empty() {
            MemberAdd::AlreadyMember
        } else {
            MemberAdd::Failed(reason.to_string())
        };
    }

    match entry.get("completed").and_then(Value::as_u64) {
        Some(0) => MemberAdd::AlreadyMember,
        _ => MemberAdd::Added,
    }
}

/// First value of a multi-valued LDAP attribute
pub fn first_str<'a>(entry: &'a Value, attr: &str) -> Option<&'a str> {
    match entry.get(attr)? {
        Value::Array(values) => values.first().and_then(Value::as_str),
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// All values of a multi-valued attribute
pub fn all_str(entry: &Value, attr: &str) -> Vec<String> {
    match entry.get(attr) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// A `user_find` result entry
pub fn student_record(entry: &Value) -> Option<StudentRecord> {
    Some(StudentRecord {
        uid: first_str(entry, "uid")?.to_string(),
        given_name: first_str(entry, "givenname").unwrap_or_default().to_string(),
        surname: first_str(entry, "sn").unwrap_or_default().to_string(),
    })
}
