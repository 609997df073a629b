//! Tool-call envelope shared by agents and tool servers.

use crate::task::ErrorDetail;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const GENERATE_TEXT: &str = "generate_text";
pub const SEARCH_WEB: &str = "search_web";
pub const UPLOAD_FILE: &str = "upload_file";
pub const DOWNLOAD_FILE: &str = "download_file";
pub const DELETE_FILE: &str = "delete_file";

/// Error code used when typed parameter decoding fails.
pub const INVALID_PARAMETERS: &str = "INVALID_PARAMETERS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failure,
}

/// Structured tool failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<ToolError> for ErrorDetail {
    fn from(e: ToolError) -> Self {
        ErrorDetail::new(e.code, e.message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Response of a tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<ToolError>,
}

impl ToolResult {
    pub fn success(result: Map<String, Value>) -> Self {
        Self {
            status: ToolStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Failure,
            result: None,
            error: Some(ToolError::new(code, message)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Get a string field of a successful result.
    pub fn result_str(&self, key: &str) -> Option<&str> {
        self.result.as_ref()?.get(key)?.as_str()
    }

    /// Error detail suitable for a task result. Failures without an error
    /// body get a generic code.
    pub fn error_detail(&self) -> ErrorDetail {
        match &self.error {
            Some(e) => e.clone().into(),
            None => ErrorDetail::new("TOOL_FAILURE", "Tool reported failure without details"),
        }
    }
}

/// Request sent to a tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ToolCall {
    pub fn new(
        tool_name: impl Into<String>,
        parameters: Map<String, Value>,
        task_id: Option<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            task_id,
            parameters,
        }
    }

    pub fn from_parameters(parameters: ToolParameters, task_id: Option<String>) -> Self {
        let tool_name = parameters.tool_name().to_string();
        Self::new(tool_name, parameters.into_map(), task_id)
    }

    /// Decode the typed parameter view for this call.
    pub fn parameters(&self) -> Result<ToolParameters, ToolError> {
        ToolParameters::decode(&self.tool_name, &self.parameters)
    }
}

/// Parameters for `generate_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerateTextParams {
    /// Prompt sent to the model
    pub prompt: String,
    /// Model override; the server default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum tokens to generate (default 5000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (default 0.7)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerateTextParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(5000)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.7)
    }
}

/// Parameters for `search_web`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchWebParams {
    /// Search query
    pub query: String,
    /// Number of results to return (default 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
}

impl SearchWebParams {
    pub fn num_results(&self) -> u32 {
        self.num_results.unwrap_or(3)
    }
}

/// Parameters for `upload_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadFileParams {
    pub bucket_name: String,
    pub destination_blob_name: String,
    /// UTF-8 content to store
    pub source_file_content: String,
}

/// Parameters for `download_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DownloadFileParams {
    pub bucket_name: String,
    pub source_blob_name: String,
}

/// Parameters for `delete_file`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteFileParams {
    pub bucket_name: String,
    pub blob_name: String,
}

/// Typed view of [`ToolCall::parameters`], one arm per known tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolParameters {
    GenerateText(GenerateTextParams),
    SearchWeb(SearchWebParams),
    UploadFile(UploadFileParams),
    DownloadFile(DownloadFileParams),
    DeleteFile(DeleteFileParams),
    Other {
        tool_name: String,
        parameters: Map<String, Value>,
    },
}

impl ToolParameters {
    pub fn tool_name(&self) -> &str {
        match self {
            Self::GenerateText(_) => GENERATE_TEXT,
            Self::SearchWeb(_) => SEARCH_WEB,
            Self::UploadFile(_) => UPLOAD_FILE,
            Self::DownloadFile(_) => DOWNLOAD_FILE,
            Self::DeleteFile(_) => DELETE_FILE,
            Self::Other { tool_name, .. } => tool_name,
        }
    }

    /// Decode the wire parameters of `tool_name`.
    pub fn decode(tool_name: &str, parameters: &Map<String, Value>) -> Result<Self, ToolError> {
        match tool_name {
            GENERATE_TEXT => typed(tool_name, parameters).map(Self::GenerateText),
            SEARCH_WEB => typed(tool_name, parameters).map(Self::SearchWeb),
            UPLOAD_FILE => typed(tool_name, parameters).map(Self::UploadFile),
            DOWNLOAD_FILE => typed(tool_name, parameters).map(Self::DownloadFile),
            DELETE_FILE => typed(tool_name, parameters).map(Self::DeleteFile),
            other => Ok(Self::Other {
                tool_name: other.to_string(),
                parameters: parameters.clone(),
            }),
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        let value = match self {
            Self::GenerateText(p) => serde_json::to_value(p),
            Self::SearchWeb(p) => serde_json::to_value(p),
            Self::UploadFile(p) => serde_json::to_value(p),
            Self::DownloadFile(p) => serde_json::to_value(p),
            Self::DeleteFile(p) => serde_json::to_value(p),
            Self::Other { parameters, .. } => return parameters,
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn typed<T: DeserializeOwned>(tool_name: &str, parameters: &Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(parameters.clone())).map_err(|e| {
        ToolError::new(
            INVALID_PARAMETERS,
            format!("Invalid parameters for '{}': {}", tool_name, e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_result_nulls_roundtrip() {
        let ok = ToolResult::success(json!({"public_url": "https://x/b/a.md"}).as_object().cloned().unwrap());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json["error"].is_null());
        assert_eq!(serde_json::from_value::<ToolResult>(json).unwrap(), ok);

        // Absent optional fields decode the same as null
        let bare: ToolResult = serde_json::from_str(r#"{"status": "failure"}"#).unwrap();
        assert_eq!(bare.result, None);
        assert_eq!(bare.error, None);
        assert_eq!(bare.error_detail().code.as_deref(), Some("TOOL_FAILURE"));
    }

    #[test]
    fn test_failure_carries_code() {
        let failure = ToolResult::failure("BUCKET_NOT_FOUND", "Bucket 'x' does not exist");
        assert!(!failure.is_success());
        let detail = failure.error_detail();
        assert_eq!(detail.code.as_deref(), Some("BUCKET_NOT_FOUND"));
        assert_eq!(detail.message, "Bucket 'x' does not exist");
    }

    #[test]
    fn test_typed_parameters_decode() {
        let call = ToolCall::new(
            GENERATE_TEXT,
            json!({"prompt": "Write"}).as_object().cloned().unwrap(),
            Some("t-1".into()),
        );
        match call.parameters().unwrap() {
            ToolParameters::GenerateText(p) => {
                assert_eq!(p.prompt, "Write");
                assert_eq!(p.max_tokens(), 5000);
                assert!((p.temperature() - 0.7).abs() < f32::EPSILON);
            }
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let call = ToolCall::new(
            UPLOAD_FILE,
            json!({"bucket_name": "b"}).as_object().cloned().unwrap(),
            None,
        );
        let err = call.parameters().unwrap_err();
        assert_eq!(err.code, INVALID_PARAMETERS);
        assert!(err.message.contains("upload_file"));
    }

    #[test]
    fn test_unknown_tool_keeps_raw_map() {
        let params = json!({"x": 1}).as_object().cloned().unwrap();
        let decoded = ToolParameters::decode("resize_image", &params).unwrap();
        assert_eq!(decoded.tool_name(), "resize_image");
        assert_eq!(decoded.into_map(), params);
    }

    #[test]
    fn test_from_parameters_uses_tool_name() {
        let call = ToolCall::from_parameters(
            ToolParameters::SearchWeb(SearchWebParams {
                query: "rust".into(),
                num_results: None,
            }),
            None,
        );
        assert_eq!(call.tool_name, SEARCH_WEB);
        assert_eq!(call.parameters["query"], "rust");
        assert!(!call.parameters.contains_key("num_results"));
    }
}
