//! HTTP SMS gateway client.
//!
//! Forwards composed alerts to an SMS gateway that owns the carrier
//! connection. The client and its transport are only built with the
//! `gateway` feature; the configuration types are always available so the
//! config file parses the same either way.

use crate::alert::message::OutgoingAlert;
use crate::alert::status::DeliveryStatus;
use serde::{Deserialize, Serialize};

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL, e.g. `http://127.0.0.1:8088`
    pub url: String,
    /// Bearer authentication token
    pub token: String,
}

impl GatewayConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    fn base(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Endpoint accepting SMS send requests.
    pub fn sms_url(&self) -> String {
        format!("{}/v1/sms", self.base())
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base())
    }
}

/// Gateway client error types.
#[derive(Debug)]
pub enum GatewayError {
    Config(String),
    Network(String),
    /// Gateway answered with a non-success HTTP status
    Server { status: u16, message: String },
    Serialization(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Config(msg) => write!(f, "Gateway config error: {msg}"),
            GatewayError::Network(msg) => write!(f, "Gateway network error: {msg}"),
            GatewayError::Server { status, message } => {
                write!(f, "Gateway server error ({status}): {message}")
            }
            GatewayError::Serialization(msg) => write!(f, "Gateway serialization error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Body posted to the gateway for one alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsRequest {
    pub alert_id: String,
    pub to: String,
    pub parts: Vec<String>,
    pub device: String,
    pub source: String,
    pub version: String,
}

impl SmsRequest {
    pub fn from_alert(alert: &OutgoingAlert) -> Self {
        Self {
            alert_id: alert.id.to_string(),
            to: alert.number.clone(),
            parts: alert.parts.clone(),
            device: alert.device.clone(),
            source: crate::APP_NAME.to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Gateway answer for a send request.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsResponse {
    /// Carrier result code, platform convention (-1 = sent)
    pub result_code: i32,
    #[serde(default)]
    pub message: Option<String>,
}

impl SmsResponse {
    pub fn delivery_status(&self) -> DeliveryStatus {
        DeliveryStatus::from_result_code(self.result_code)
    }
}

/// Async gateway client.
#[cfg(feature = "gateway")]
pub struct GatewayClient {
    config: GatewayConfig,
    client: reqwest::Client,
}

#[cfg(feature = "gateway")]
impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        if config.url.trim().is_empty() {
            return Err(GatewayError::Config("Gateway URL is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub async fn test_connection(&self) -> Result<bool, GatewayError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    pub async fn send_sms(&self, request: &SmsRequest) -> Result<SmsResponse, GatewayError> {
        let response = self
            .client
            .post(self.config.sms_url())
            .header("Authorization", format!("Bearer {}", self.config.token))
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Serialization(e.to_string()))
    }
}

/// Blocking gateway client for use from the dispatcher thread.
#[cfg(feature = "gateway")]
pub struct BlockingGatewayClient {
    inner: GatewayClient,
    runtime: tokio::runtime::Runtime,
}

#[cfg(feature = "gateway")]
impl BlockingGatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: GatewayClient::new(config)?,
            runtime,
        })
    }

    pub fn test_connection(&self) -> Result<bool, GatewayError> {
        self.runtime.block_on(self.inner.test_connection())
    }

    pub fn send_sms(&self, request: &SmsRequest) -> Result<SmsResponse, GatewayError> {
        self.runtime.block_on(self.inner.send_sms(request))
    }
}

/// Alert transport backed by the SMS gateway.
#[cfg(feature = "gateway")]
pub struct SmsGatewayTransport {
    client: BlockingGatewayClient,
}

#[cfg(feature = "gateway")]
impl SmsGatewayTransport {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            client: BlockingGatewayClient::new(config)?,
        })
    }

    pub fn test_connection(&self) -> Result<bool, GatewayError> {
        self.client.test_connection()
    }
}

#[cfg(feature = "gateway")]
impl crate::alert::AlertTransport for SmsGatewayTransport {
    fn name(&self) -> &str {
        "sms-gateway"
    }

    fn send(&self, alert: &OutgoingAlert) -> Result<DeliveryStatus, crate::alert::AlertError> {
        let response = self
            .client
            .send_sms(&SmsRequest::from_alert(alert))
            .map_err(|e| crate::alert::AlertError::Transport(e.to_string()))?;
        if let Some(ref message) = response.message {
            tracing::debug!("gateway: {message}");
        }
        Ok(response.delivery_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_urls() {
        let config = GatewayConfig::new("http://127.0.0.1:8088/", "token");
        assert_eq!(config.sms_url(), "http://127.0.0.1:8088/v1/sms");
        assert_eq!(config.health_url(), "http://127.0.0.1:8088/health");
    }

    #[test]
    fn test_response_maps_result_code() {
        let response: SmsResponse = serde_json::from_str(r#"{"result_code":-1}"#).unwrap();
        assert_eq!(response.delivery_status(), DeliveryStatus::Sent);

        let response: SmsResponse =
            serde_json::from_str(r#"{"result_code":4,"message":"no service"}"#).unwrap();
        assert_eq!(response.delivery_status(), DeliveryStatus::NoService);
    }

    #[cfg(feature = "gateway")]
    #[test]
    fn test_client_rejects_empty_url() {
        assert!(GatewayClient::new(GatewayConfig::new("  ", "t")).is_err());
    }
}
