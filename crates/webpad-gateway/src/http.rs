use crate::{RemoteOperation, RemoteStore};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use webpad_core::{
    ApiResponse, CreateFileRequest, CreateFolderRequest, FileContent, TreeNode, UpdateFileRequest,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Remote store reached over the REST API.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, GatewayError> {
        let parsed = Url::parse(base_url.trim()).map_err(|err| GatewayError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Joins path segments onto the base url, percent-encoding each one so
    /// ids containing `/` or spaces stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: RemoteOperation,
        request: RequestBuilder,
    ) -> ApiResponse<T> {
        debug!(event = "api_request", operation = operation.as_str());
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    event = "api_request_failed",
                    operation = operation.as_str(),
                    error = %err
                );
                return ApiResponse::failure(err.to_string());
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    event = "api_request_failed",
                    operation = operation.as_str(),
                    status = status.as_u16(),
                    error = %err
                );
                return ApiResponse::failure(err.to_string());
            }
        };

        let envelope = decode_envelope(status, &body);
        if !envelope.success {
            warn!(
                event = "api_request_failed",
                operation = operation.as_str(),
                status = status.as_u16(),
                reason = %envelope.error_message()
            );
        }
        envelope
    }
}

fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ApiResponse<T> {
    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
        return ApiResponse::failure(message);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return ApiResponse::empty();
    }

    match serde_json::from_slice::<ApiResponse<T>>(body) {
        Ok(envelope) => envelope,
        Err(err) => ApiResponse::failure(format!("invalid response body: {err}")),
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get_file_tree(&self) -> ApiResponse<Vec<TreeNode>> {
        let url = self.endpoint(&["files"]);
        self.send(RemoteOperation::GetTree, self.client.get(url)).await
    }

    async fn get_file_content(&self, file_id: &str) -> ApiResponse<FileContent> {
        let url = self.endpoint(&["files", file_id, "content"]);
        self.send(RemoteOperation::GetFileContent, self.client.get(url)).await
    }

    async fn update_file_content(&self, file_id: &str, content: &str) -> ApiResponse<Value> {
        let url = self.endpoint(&["files", file_id, "content"]);
        let body = UpdateFileRequest {
            content: content.to_string(),
        };
        self.send(RemoteOperation::UpdateFileContent, self.client.put(url).json(&body)).await
    }

    async fn create_file(&self, request: &CreateFileRequest) -> ApiResponse<TreeNode> {
        let url = self.endpoint(&["files"]);
        self.send(RemoteOperation::CreateFile, self.client.post(url).json(request)).await
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResponse<TreeNode> {
        let url = self.endpoint(&["folders"]);
        self.send(RemoteOperation::CreateFolder, self.client.post(url).json(request)).await
    }

    async fn delete_item(&self, item_id: &str) -> ApiResponse<Value> {
        let url = self.endpoint(&["items", item_id]);
        self.send(RemoteOperation::DeleteItem, self.client.delete(url)).await
    }

    async fn toggle_folder(&self, folder_id: &str) -> ApiResponse<Value> {
        let url = self.endpoint(&["folders", folder_id, "toggle"]);
        self.send(RemoteOperation::ToggleFolder, self.client.put(url)).await
    }

    async fn reset_project(&self) -> ApiResponse<Value> {
        let url = self.endpoint(&["reset"]);
        self.send(RemoteOperation::ResetProject, self.client.post(url)).await
    }

    async fn health_check(&self) -> ApiResponse<Value> {
        let url = self.endpoint(&["health"]);
        self.send(RemoteOperation::HealthCheck, self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_ids_as_single_segments() {
        let store = HttpRemoteStore::new("http://localhost:3001/api/", None).expect("store");
        let url = store.endpoint(&["files", "src/a b.js", "content"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:3001/api/files/src%2Fa%20b.js/content"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            HttpRemoteStore::new("not a url", None),
            Err(GatewayError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            HttpRemoteStore::new("mailto:dev@example.com", None),
            Err(GatewayError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn error_status_prefers_server_message() {
        let envelope: ApiResponse<Value> = decode_envelope(
            StatusCode::NOT_FOUND,
            br#"{"success":false,"message":"File not found"}"#,
        );
        assert_eq!(envelope.into_result(), Err("File not found".to_string()));

        let envelope: ApiResponse<Value> =
            decode_envelope(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(
            envelope.error_message(),
            "Request failed with status code 502"
        );
    }

    #[test]
    fn empty_success_body_is_an_empty_envelope() {
        let envelope: ApiResponse<Value> = decode_envelope(StatusCode::NO_CONTENT, b"");
        assert!(envelope.success);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn undecodable_success_body_is_a_failure() {
        let envelope: ApiResponse<FileContent> = decode_envelope(StatusCode::OK, b"[1,2]");
        assert!(!envelope.success);
        assert!(envelope.error_message().starts_with("invalid response body"));
    }
}
