pub mod http;
pub mod protocol;

pub use http::HttpGateway;
pub use protocol::{DesignationPayload, DesignationReport, ValuesPayload, ValuesReport};

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Device answered with HTTP status {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Device rejected request: {0}")]
    Rejected(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Network operations against one device.
///
/// Implementations own the transport; callers only see the decoded resources.
/// Responses to pushes and the passthrough endpoints are returned uninterpreted.
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Host the gateway talks to, for logging
    fn host(&self) -> &str;

    async fn fetch_designation(&self) -> Result<DesignationReport>;

    async fn push_designation(&self, payload: &DesignationPayload) -> Result<Value>;

    async fn fetch_values(&self) -> Result<ValuesReport>;

    async fn push_values(&self, payload: &ValuesPayload) -> Result<Value>;

    /// Join a network temporarily (`POST /connect`)
    async fn connect_network(&self, request: &Value) -> Result<Value>;

    async fn list_networks(&self) -> Result<Value>;

    async fn save_network(&self, network: &Value) -> Result<Value>;

    async fn delete_network(&self, network: &Value) -> Result<Value>;

    async fn fetch_log(&self, limit: Option<u32>) -> Result<Value>;

    async fn fetch_device_info(&self) -> Result<Value>;

    /// Plain-text liveness answer of the device's web server
    async fn fetch_status(&self) -> Result<String>;
}

/// Firmware reports failures as `{"error": "..."}` with a success status
pub fn check_device_reply(reply: Value) -> Result<Value> {
    match reply.get("error").and_then(Value::as_str) {
        Some(message) => Err(GatewayError::Rejected(message.to_string())),
        None => Ok(reply),
    }
}

/// Identity of a device address, ignoring scheme, case and trailing slashes
pub fn device_key(host: &str) -> String {
    let host = host.trim();
    let lower = host.to_ascii_lowercase();
    let bare = lower
        .strip_prefix("http://")
        .or_else(|| lower.strip_prefix("https://"))
        .unwrap_or(&lower);
    bare.trim_end_matches('/').to_string()
}
