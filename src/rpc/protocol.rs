//! Wire types for the line-delimited JSON protocol.
//!
//! Every message in either direction is one JSON object followed by `\n`.
//!
//! # Requests
//!
//! ```json
//! {"method": "add", "params": [1, 2], "id": 7}
//! ```
//!
//! `params` may be an array (positional) or an object (keyword) and defaults
//! to an empty object. `id` may be any JSON value and defaults to `null`; it
//! is echoed back untouched and never used for routing.
//!
//! # Responses
//!
//! - Success: `{"result": ..., "result_type": "int", "id": 7}`
//! - Error: `{"error": "...", "id": 7}`

use serde::Serialize;
use serde_json::{Map, Value};

/// Welcome text sent when no greeting is configured.
pub const DEFAULT_GREETING: &str =
    "サーバに接続しました。\nコマンドを入力してください（helpでコマンド一覧、exitで終了）";

/// Error text for a method name missing from the method table.
pub const METHOD_NOT_IMPLEMENTED: &str = "method not implemented";

/// A decoded request.
///
/// Fields are extracted leniently: a missing or non-string `method` becomes
/// `None` and is answered with [`METHOD_NOT_IMPLEMENTED`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Name of the method to invoke.
    pub method: Option<String>,
    /// Raw parameters, `None` when absent or `null`.
    pub params: Option<Value>,
    /// Client-chosen identifier, `null` when absent.
    pub id: Value,
}

impl Request {
    /// Returns the parameters, substituting an empty object when absent.
    #[must_use]
    pub fn params_or_default(&self) -> Value {
        self.params
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Parses one request line.
///
/// # Errors
///
/// Returns an error envelope with a `null` id if the line is not valid JSON
/// or is not a JSON object.
pub fn parse_request(line: &[u8]) -> Result<Request, ErrorEnvelope> {
    let value: Value =
        serde_json::from_slice(line).map_err(|e| ErrorEnvelope::new(e.to_string(), Value::Null))?;

    let Value::Object(mut obj) = value else {
        return Err(ErrorEnvelope::new(
            "request must be a JSON object",
            Value::Null,
        ));
    };

    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .map(str::to_string);
    let params = obj.remove("params").filter(|p| !p.is_null());
    let id = obj.remove("id").unwrap_or(Value::Null);

    Ok(Request { method, params, id })
}

/// Runtime kind of a result value, reported as `result_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Integral number.
    Int,
    /// Floating-point number.
    Float,
    /// String.
    Str,
    /// Boolean.
    Bool,
    /// Array.
    List,
    /// Object.
    Dict,
    /// `null`.
    Null,
}

impl ResultType {
    /// Classifies a JSON value.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) => {
                if n.is_f64() {
                    Self::Float
                } else {
                    Self::Int
                }
            }
            Value::String(_) => Self::Str,
            Value::Array(_) => Self::List,
            Value::Object(_) => Self::Dict,
        }
    }

    /// Returns the tag as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Null => "null",
        }
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessEnvelope {
    /// The method's return value.
    pub result: Value,
    /// Runtime kind of `result`.
    pub result_type: ResultType,
    /// Echo of the request id.
    pub id: Value,
}

/// An error response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    /// Human-readable failure description.
    pub error: String,
    /// Echo of the request id, `null` if it could not be recovered.
    pub id: Value,
}

impl ErrorEnvelope {
    /// Creates an error envelope.
    #[must_use]
    pub fn new(error: impl Into<String>, id: Value) -> Self {
        Self {
            error: error.into(),
            id,
        }
    }
}

/// Any message the server writes to a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    /// Success shape.
    Success(SuccessEnvelope),
    /// Error shape.
    Error(ErrorEnvelope),
}

impl Envelope {
    /// Wraps a result, tagging it with its runtime kind.
    #[must_use]
    pub fn success(result: Value, id: Value) -> Self {
        let result_type = ResultType::of(&result);
        Self::Success(SuccessEnvelope {
            result,
            result_type,
            id,
        })
    }

    /// Creates an error envelope.
    #[must_use]
    pub fn error(error: impl Into<String>, id: Value) -> Self {
        Self::Error(ErrorEnvelope::new(error, id))
    }

    /// The welcome message sent before any request is read.
    #[must_use]
    pub fn greeting(text: &str) -> Self {
        Self::success(Value::String(text.to_string()), Value::Null)
    }

    /// Returns the id this envelope echoes.
    #[must_use]
    pub const fn id(&self) -> &Value {
        match self {
            Self::Success(s) => &s.id,
            Self::Error(e) => &e.id,
        }
    }

    /// Returns `true` for the error shape.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Serialises the envelope as a single newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }
}

impl From<ErrorEnvelope> for Envelope {
    fn from(error: ErrorEnvelope) -> Self {
        Self::Error(error)
    }
}
