use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{
    check_device_reply, DesignationPayload, DesignationReport, DeviceGateway, GatewayError, Result,
    ValuesPayload, ValuesReport,
};

/// Gateway speaking the firmware's HTTP API
pub struct HttpGateway {
    client: Client,
    host: String,
    base_url: String,
}

impl HttpGateway {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let host = host.trim().trim_end_matches('/').to_string();
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.clone()
        } else {
            format!("http://{}", host)
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            host,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, method: Method, path: &str, body: Option<String>) -> Result<Response> {
        let url = self.url(path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            // The firmware reads the JSON document from a `body` form field.
            request = request.form(&[("body", body)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Http(e)
            }
        })?;

        if !response.status().is_success() {
            error!("{} {} failed with status: {}", method, path, response.status());
            return Err(GatewayError::Status(response.status().as_u16()));
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.send(Method::GET, path, None).await?;
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::Malformed(format!("{}: {}", path, e))
            }
        })
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get_json(path).await?;
        serde_json::from_value(value).map_err(|e| GatewayError::Malformed(format!("{}: {}", path, e)))
    }

    async fn send_json<T: Serialize + ?Sized>(&self, method: Method, path: &str, payload: &T) -> Result<Value> {
        let body = serde_json::to_string(payload)?;
        let response = self.send(method, path, Some(body)).await?;
        let reply: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(format!("{}: {}", path, e)))?;
        check_device_reply(reply)
    }
}

#[async_trait]
impl DeviceGateway for HttpGateway {
    fn host(&self) -> &str {
        &self.host
    }

    async fn fetch_designation(&self) -> Result<DesignationReport> {
        self.get_typed("/pinDesignation").await
    }

    async fn push_designation(&self, payload: &DesignationPayload) -> Result<Value> {
        self.send_json(Method::POST, "/pinDesignation", payload).await
    }

    async fn fetch_values(&self) -> Result<ValuesReport> {
        self.get_typed("/pinValues").await
    }

    async fn push_values(&self, payload: &ValuesPayload) -> Result<Value> {
        self.send_json(Method::POST, "/pinValues", payload).await
    }

    async fn connect_network(&self, request: &Value) -> Result<Value> {
        self.send_json(Method::POST, "/connect", request).await
    }

    async fn list_networks(&self) -> Result<Value> {
        self.get_json("/network").await
    }

    async fn save_network(&self, network: &Value) -> Result<Value> {
        self.send_json(Method::POST, "/network", network).await
    }

    async fn delete_network(&self, network: &Value) -> Result<Value> {
        self.send_json(Method::DELETE, "/network", network).await
    }

    async fn fetch_log(&self, limit: Option<u32>) -> Result<Value> {
        match limit {
            Some(limit) => self.get_json(&format!("/log?limit={}", limit)).await,
            None => self.get_json("/log").await,
        }
    }

    async fn fetch_device_info(&self) -> Result<Value> {
        self.get_json("/device").await
    }

    async fn fetch_status(&self) -> Result<String> {
        let response = self.send(Method::GET, "/test", None).await?;
        Ok(response.text().await?)
    }
}
