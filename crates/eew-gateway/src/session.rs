//! Socket session negotiation with the dmdata.jp API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::GatewayError;

/// Socket endpoint of the provider API.
pub const SOCKET_URL: &str = "https://api.dmdata.jp/v2/socket";

const CLASSIFICATION: &str = "eew.forecast";

/// Request body for opening a streaming session.
#[derive(Debug, Serialize)]
pub struct SocketRequest {
    classifications: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    types: Option<Vec<String>>,
    test: String,
    #[serde(rename = "appName", skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
}

impl Default for SocketRequest {
    fn default() -> Self {
        Self {
            classifications: vec![CLASSIFICATION.to_string()],
            types: None,
            test: "including".to_string(),
            app_name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SocketStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct SocketOk {
    websocket: WebsocketInfo,
}

/// Negotiated WebSocket parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct WebsocketInfo {
    pub id: i64,
    pub url: String,
    pub protocol: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SocketErrorResponse {
    error: SocketErrorBody,
}

#[derive(Debug, Deserialize)]
struct SocketErrorBody {
    message: String,
    code: i64,
}

/// Parse the provider's socket response, discriminated by `status`.
pub fn parse_socket_response(body: &str) -> Result<WebsocketInfo, GatewayError> {
    let status: SocketStatus = serde_json::from_str(body)?;
    match status.status.as_str() {
        "ok" => {
            let ok: SocketOk = serde_json::from_str(body)?;
            Ok(ok.websocket)
        }
        "error" => {
            let err: SocketErrorResponse = serde_json::from_str(body)?;
            Err(GatewayError::Upstream {
                code: err.error.code,
                message: err.error.message,
            })
        }
        other => Err(GatewayError::UnknownResponse {
            status: other.to_string(),
        }),
    }
}

/// Open a streaming session. The API key travels as a query parameter.
pub async fn open(http: &Client, api_key: &str) -> Result<WebsocketInfo, GatewayError> {
    let request = SocketRequest::default();
    info!(url = SOCKET_URL, "Requesting socket session");
    let response = http
        .post(SOCKET_URL)
        .query(&[("key", api_key)])
        .json(&request)
        .send()
        .await?;
    let body = response.text().await?;
    let websocket = parse_socket_response(&body)?;
    info!(id = websocket.id, url = %websocket.url, "Socket session granted");
    Ok(websocket)
}

/// Release a session. Runs on every exit path, so failures are only logged.
pub async fn close(http: &Client, id: i64) {
    let url = format!("{}/{}", SOCKET_URL, id);
    match http.delete(&url).send().await {
        Ok(_) => info!(%url, "Socket session closed"),
        Err(err) => error!(%url, error = %err, "Failed to close socket session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_response() {
        let body = r#"{
            "responseId": "abc",
            "status": "ok",
            "ticket": "t",
            "websocket": {
                "id": 404,
                "url": "wss://ws.example.test/socket",
                "protocol": ["dmdata.v2"],
                "expiration": 300
            }
        }"#;
        let websocket = parse_socket_response(body).unwrap();
        assert_eq!(websocket.id, 404);
        assert_eq!(websocket.url, "wss://ws.example.test/socket");
        assert_eq!(websocket.protocol, vec!["dmdata.v2".to_string()]);
    }

    #[test]
    fn error_response_carries_code_and_message() {
        let body = r#"{
            "status": "error",
            "error": {"message": "Unauthorized", "code": 401}
        }"#;
        let err = parse_socket_response(body).unwrap_err();
        assert_eq!(err.to_string(), "Error code:401 message:Unauthorized");
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = parse_socket_response(r#"{"status": "maybe"}"#).unwrap_err();
        assert!(matches!(err, GatewayError::UnknownResponse { .. }));
    }

    #[test]
    fn request_body_has_forecast_classification() {
        let json = serde_json::to_value(SocketRequest::default()).unwrap();
        assert_eq!(json["classifications"][0], "eew.forecast");
        assert_eq!(json["test"], "including");
        assert!(json.get("types").is_none());
    }
}
