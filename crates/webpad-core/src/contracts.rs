//! Request and response shapes exchanged with the remote file store.

use crate::FileType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Uniform envelope every remote call resolves to, including transport
/// failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: None,
            message: Some(if message.trim().is_empty() {
                UNKNOWN_ERROR.to_string()
            } else {
                message
            }),
        }
    }

    /// Message to show for a failed call.
    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }

    /// Collapses the envelope into a result. A successful envelope without
    /// data yields `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error_message())
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileContent {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateFileRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    pub name: String,
    pub file_type: FileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_envelope_parses_without_data() {
        let response: ApiResponse<FileContent> =
            serde_json::from_value(json!({"success": false, "message": "File not found"}))
                .expect("envelope");
        assert_eq!(response.into_result(), Err("File not found".to_string()));
    }

    fn decode<T: serde::de::DeserializeOwned>(value: Value) -> ApiResponse<T> {
        serde_json::from_value(value).expect("envelope")
    }

    #[test]
    fn envelope_decodes_payloads_without_default() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Health {
            status: String,
        }

        let response: ApiResponse<Health> =
            decode(json!({"success": true, "data": {"status": "ok"}}));
        assert_eq!(
            response.into_result(),
            Ok(Some(Health {
                status: "ok".to_string()
            }))
        );

        let missing: ApiResponse<Health> = decode(json!({"success": true}));
        assert!(missing.data.is_none());
    }

    #[test]
    fn blank_failure_message_falls_back() {
        let response = ApiResponse::<Value>::failure("  ");
        assert_eq!(response.error_message(), UNKNOWN_ERROR);
    }

    #[test]
    fn create_file_request_omits_missing_parent() {
        let request = CreateFileRequest {
            name: "app.js".to_string(),
            file_type: FileType::Js,
            parent_id: None,
        };
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({"name": "app.js", "fileType": "js"})
        );
    }
}
