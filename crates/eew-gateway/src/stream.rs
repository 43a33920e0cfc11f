//! The streaming session: WebSocket read loop, frame decode, bus fan-out.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use eew_bus::Publisher;
use flate2::read::GzDecoder;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, ORIGIN, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{DecodeError, GatewayError};
use crate::session;

/// How a streaming session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Transport hiccup; the caller should negotiate a fresh session.
    Retry,
    /// The provider asked us to close, or we were cancelled.
    Closed,
}

/// Negotiate one session and pump it until it ends.
///
/// The DELETE teardown runs regardless of how the stream loop finished.
pub async fn run(
    api_key: &str,
    publisher: &mut Publisher,
    cancel: &CancellationToken,
) -> Result<SessionEnd, GatewayError> {
    if api_key.is_empty() {
        return Err(GatewayError::NoApiKey);
    }

    let http = Client::new();
    let websocket = session::open(&http, api_key).await?;
    let result = stream(&websocket, publisher, cancel).await;
    session::close(&http, websocket.id).await;
    result
}

async fn stream(
    websocket: &session::WebsocketInfo,
    publisher: &mut Publisher,
    cancel: &CancellationToken,
) -> Result<SessionEnd, GatewayError> {
    let protocol = websocket
        .protocol
        .first()
        .ok_or(GatewayError::MissingProtocol)?;

    let mut request = websocket.url.as_str().into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_str(protocol)?);
    request
        .headers_mut()
        .insert(ORIGIN, HeaderValue::from_static("http://localhost"));

    info!(url = %websocket.url, %protocol, "Connecting websocket");
    let (mut ws, _) = connect_async(request).await?;
    info!("Websocket connected");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close(None).await;
                return Ok(SessionEnd::Closed);
            }
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match handle_text_frame(&text) {
                        FrameAction::Continue => {}
                        FrameAction::Reply(reply) => {
                            if let Err(err) = ws.send(Message::Text(reply)).await {
                                error!(error = %err, "Failed to send pong");
                            }
                        }
                        FrameAction::Publish { topic, payload } => {
                            publisher.publish(&topic, payload).await?;
                            info!(%topic, "Published telegram to bus");
                        }
                        FrameAction::Close => return Ok(SessionEnd::Closed),
                    }
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    warn!("Websocket closed by remote");
                    return Ok(SessionEnd::Retry);
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    error!(error = %err, "Failed to receive websocket message");
                    return Ok(SessionEnd::Retry);
                }
            },
        }
    }
}

/// What to do after one text frame.
#[derive(Debug, PartialEq, Eq)]
enum FrameAction {
    Continue,
    Reply(String),
    Publish { topic: String, payload: Vec<u8> },
    Close,
}

fn handle_text_frame(text: &str) -> FrameAction {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            error!(error = %err, received = %text, "Failed to parse websocket frame");
            return FrameAction::Continue;
        }
    };
    let frame_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // Pings arrive constantly and are only worth debug noise.
    if frame_type != "ping" {
        info!(received = %text, "Received websocket message");
    }

    match frame_type.as_str() {
        "start" => {
            info!("Websocket session started");
            FrameAction::Continue
        }
        "ping" => match make_pong(value) {
            Some(pong) => {
                debug!("Answering ping");
                FrameAction::Reply(pong)
            }
            None => FrameAction::Continue,
        },
        "data" => match decode_data(value) {
            Ok((topic, payload)) => FrameAction::Publish { topic, payload },
            Err(err) => {
                warn!(error = %err, "Dropping undecodable data frame");
                FrameAction::Continue
            }
        },
        "error" => {
            let close = value
                .get("close")
                .and_then(Value::as_bool)
                .unwrap_or_default();
            warn!(received = %text, "Received error message");
            if close {
                FrameAction::Close
            } else {
                FrameAction::Continue
            }
        }
        other => {
            warn!(frame_type = %other, "Unknown frame type");
            FrameAction::Continue
        }
    }
}

/// Echo the ping object back with `type` rewritten, keeping every other
/// field (the provider matches on `pingId`).
fn make_pong(mut value: Value) -> Option<String> {
    let object = value.as_object_mut()?;
    object.insert("type".to_string(), Value::String("pong".to_string()));
    Some(value.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataFrame {
    head: DataHead,
    compression: Option<String>,
    encoding: Option<String>,
    body: String,
}

#[derive(Debug, Deserialize)]
struct DataHead {
    #[serde(rename = "type")]
    schema: String,
}

/// Materialise the telegram carried by a `data` frame.
fn decode_data(value: Value) -> Result<(String, Vec<u8>), DecodeError> {
    let frame: DataFrame = serde_json::from_value(value)?;

    let decoded = match frame.encoding.as_deref() {
        Some("base64") => STANDARD.decode(frame.body.as_bytes())?,
        Some("utf-8") | None => frame.body.into_bytes(),
        Some(other) => return Err(DecodeError::UnknownEncoding(other.to_string())),
    };

    let payload = match frame.compression.as_deref() {
        Some("gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(decoded.as_slice()).read_to_end(&mut out)?;
            out
        }
        Some(other) => return Err(DecodeError::UnsupportedCompression(other.to_string())),
        None => decoded,
    };

    Ok((frame.head.schema, payload))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;

    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn ping_is_answered_with_matching_pong() {
        let action = handle_text_frame(r#"{"type":"ping","pingId":"abc"}"#);
        match action {
            FrameAction::Reply(reply) => {
                let value: Value = serde_json::from_str(&reply).unwrap();
                assert_eq!(value["type"], "pong");
                assert_eq!(value["pingId"], "abc");
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn start_and_unknown_frames_are_ignored() {
        assert_eq!(
            handle_text_frame(r#"{"type":"start","socketId":1}"#),
            FrameAction::Continue
        );
        assert_eq!(
            handle_text_frame(r#"{"type":"mystery"}"#),
            FrameAction::Continue
        );
        assert_eq!(handle_text_frame("not json"), FrameAction::Continue);
    }

    #[test]
    fn error_frame_with_close_ends_the_session() {
        assert_eq!(
            handle_text_frame(r#"{"type":"error","error":"too slow","code":4808,"close":true}"#),
            FrameAction::Close
        );
        assert_eq!(
            handle_text_frame(r#"{"type":"error","error":"transient","code":4000,"close":false}"#),
            FrameAction::Continue
        );
    }

    #[test]
    fn decodes_base64_gzip_body() {
        let xml = b"<Report><Head><EventID>1</EventID></Head></Report>";
        let body = STANDARD.encode(gzip(xml));
        let frame = json!({
            "type": "data",
            "head": {"type": "VXSE45"},
            "encoding": "base64",
            "compression": "gzip",
            "body": body,
        });
        let (topic, payload) = decode_data(frame).unwrap();
        assert_eq!(topic, "VXSE45");
        assert_eq!(payload, xml);
    }

    #[test]
    fn decodes_plain_utf8_body() {
        let frame = json!({
            "type": "data",
            "head": {"type": "VXSE45"},
            "encoding": "utf-8",
            "body": "<Report/>",
        });
        let (topic, payload) = decode_data(frame).unwrap();
        assert_eq!(topic, "VXSE45");
        assert_eq!(payload, b"<Report/>");
    }

    #[test]
    fn zip_compression_is_rejected() {
        let frame = json!({
            "type": "data",
            "head": {"type": "VXSE45"},
            "encoding": "utf-8",
            "compression": "zip",
            "body": "ignored",
        });
        assert!(matches!(
            decode_data(frame),
            Err(DecodeError::UnsupportedCompression(_))
        ));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let frame = json!({
            "type": "data",
            "head": {"type": "VXSE45"},
            "encoding": "utf-16",
            "body": "ignored",
        });
        assert!(matches!(
            decode_data(frame),
            Err(DecodeError::UnknownEncoding(_))
        ));
    }
}
