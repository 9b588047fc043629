//! output formatting utilities for scriptable CLI output
//!
//! uses JSON-RPC 2.0 format for machine-readable output:
//! - success: {"jsonrpc": "2.0", "result": {...}, "id": null}
//! - error: {"jsonrpc": "2.0", "error": {"code": N, "message": "...", "data": {...}}, "id": null}
//!
//! also provides format string templating for `fields --format`

use serde::Serialize;
use std::io::IsTerminal;

use crate::fields::{FieldOption, FieldRegistry};
use crate::tree::Value;
use crate::validate::ValidationReport;

/// JSON-RPC version constant
const JSONRPC_VERSION: &str = "2.0";

/// output mode determines how results are formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// human-readable text output
    Text,
    /// machine-readable JSON-RPC 2.0 output
    Json,
    /// no output on success (errors still go to stderr)
    Quiet,
    /// one field id per line
    Names,
    /// custom format string with {field} placeholders
    Format,
}

impl OutputMode {
    /// determine output mode from CLI flags and environment
    ///
    /// priority: quiet > names > format > json > no_json > auto-detect
    pub fn from_flags(json: bool, no_json: bool, quiet: bool, names: bool, format: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        if names {
            return Self::Names;
        }
        if format {
            return Self::Format;
        }
        if json {
            return Self::Json;
        }
        if no_json {
            return Self::Text;
        }
        // auto-detect: JSON when stdout is not a TTY (piped)
        if !std::io::stdout().is_terminal() {
            Self::Json
        } else {
            Self::Text
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self, Self::Quiet)
    }
}

/// JSON-RPC 2.0 success response
#[derive(Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub result: T,
    /// null for CLI responses (no request id)
    pub id: Option<String>,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result,
            id: None,
        }
    }
}

/// JSON-RPC 2.0 error response
#[derive(Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: &'static str,
    pub error: RpcError,
    pub id: Option<String>,
}

/// JSON-RPC 2.0 error object
#[derive(Serialize)]
pub struct RpcError {
    /// error code (qtree exit code, offset by -32000 for app-specific errors)
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrorData>,
}

/// additional error data
#[derive(Serialize, Default)]
pub struct ErrorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    /// individual problems, e.g. from `verify`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// validation report of a rejected query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ValidationReport>,
}

impl JsonRpcError {
    /// create error with standard JSON-RPC error code range
    /// qtree uses -32000 to -32099 for application errors (per JSON-RPC spec)
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            error: RpcError {
                code: to_jsonrpc_code(code),
                message: message.into(),
                data: None,
            },
            id: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: ErrorData) -> Self {
        let mut error = Self::new(code, message);
        let empty = data.suggestions.is_none() && data.errors.is_none() && data.report.is_none();
        error.error.data = (!empty).then_some(data);
        error
    }

    pub fn with_suggestions(
        code: i32,
        message: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self::with_data(
            code,
            message,
            ErrorData {
                suggestions: (!suggestions.is_empty()).then_some(suggestions),
                ..Default::default()
            },
        )
    }
}

/// convert qtree exit code to JSON-RPC error code
/// JSON-RPC reserves -32000 to -32099 for server/application errors
fn to_jsonrpc_code(code: i32) -> i32 {
    -32000 - code
}

// ============================================================================
// Result data structures for different commands
// ============================================================================

/// one field as listed by `fields`
#[derive(Serialize)]
pub struct FieldData {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub operators: Vec<String>,
    pub default_operator: Option<String>,
    pub default_value: Value,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

impl FieldData {
    /// describe a registered field; `None` when the id is unknown
    pub fn from_registry(registry: &FieldRegistry, id: &str) -> Option<Self> {
        let field = registry.describe(id).ok()?;
        Some(Self {
            id: id.to_string(),
            name: field.name.clone(),
            field_type: field.field_type.to_string(),
            operators: registry.operators_for(id).ok()?,
            default_operator: registry.default_operator_for(id).ok()?,
            default_value: registry.default_value_for(id).ok()?,
            nullable: field.nullable,
            entity: field.entity.clone(),
            options: field.options.clone(),
        })
    }
}

/// result data for check command
#[derive(Serialize)]
pub struct CheckData {
    pub valid: bool,
    /// rule count across all nesting levels
    pub rules: usize,
}

/// result data for coerce command
#[derive(Serialize)]
pub struct CoerceData {
    pub field: String,
    pub operator: String,
    pub arity: String,
    pub input: Value,
    pub value: Value,
}

/// result data for verify command
#[derive(Serialize)]
pub struct VerifyData {
    pub path: String,
    pub valid: bool,
    pub fields: usize,
}

// ============================================================================
// Format string templating
// ============================================================================

/// format a string template with data from a serializable struct
///
/// placeholders use {field} syntax, e.g., "{id}: {type}"
///
/// # Example
/// ```ignore
/// let result = format_template("{id} ({type})", &data);
/// assert_eq!(result, "age (number)");
/// ```
pub fn format_template<T: Serialize>(template: &str, data: &T) -> String {
    let value = match serde_json::to_value(data) {
        Ok(v) => v,
        Err(_) => return template.to_string(),
    };

    let mut result = template.to_string();

    if let serde_json::Value::Object(map) = value {
        for (key, val) in map {
            let placeholder = format!("{{{}}}", key);
            let replacement = match val {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Array(arr) => {
                    // join array elements with comma
                    arr.iter()
                        .map(|v| match v {
                            serde_json::Value::String(s) => s.clone(),
                            _ => v.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                }
                serde_json::Value::Object(_) => val.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }
    }

    result
}

/// print JSON-RPC success response to stdout
pub fn print_json<T: Serialize>(data: &T) {
    let response = JsonRpcResponse::new(data);
    if let Ok(json) = serde_json::to_string(&response) {
        println!("{}", json);
    }
}

/// print JSON-RPC error with extra data
pub fn print_json_error_with_data(code: i32, message: &str, data: ErrorData) {
    let error = JsonRpcError::with_data(code, message, data);
    if let Ok(json) = serde_json::to_string(&error) {
        println!("{}", json);
    }
}
