//! Internal pub/sub bus used between the gateway and the dispatchers.
//!
//! A thin wrapper around ZeroMQ PUB/SUB sockets. Every message has two
//! frames: the topic (the telegram schema tag) and the raw payload. The
//! subscriber side reconnects automatically and buffers a small number of
//! messages between the socket and the consumer.

mod error;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use zeromq::{PubSocket, Socket, SocketRecv, SocketSend, SubSocket, ZmqMessage};

pub use error::BusError;

/// How many decoded messages may sit between the socket reader and the
/// consumer before the reader stops pulling from the socket.
const SUBSCRIBER_BUFFER: usize = 10;

/// Delay before a subscriber reconnect attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// One message received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    fn from_zmq(msg: ZmqMessage) -> Option<Self> {
        if msg.len() != 2 {
            return None;
        }
        let topic = String::from_utf8_lossy(msg.get(0)?).into_owned();
        let payload = msg.get(1)?.to_vec();
        Some(Self { topic, payload })
    }
}

/// Publishing half of the bus. Binds the endpoint and fans out to all
/// connected subscribers.
pub struct Publisher {
    socket: PubSocket,
}

impl Publisher {
    /// Bind a PUB socket on the given endpoint.
    pub async fn bind(endpoint: &str) -> Result<Self, BusError> {
        let mut socket = PubSocket::new();
        socket.bind(endpoint).await?;
        info!(%endpoint, "Bus publisher bound");
        Ok(Self { socket })
    }

    /// Publish one two-frame message.
    pub async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let mut msg = ZmqMessage::from(topic.as_bytes().to_vec());
        msg.push_back(Bytes::from(payload));
        self.socket.send(msg).await?;
        Ok(())
    }
}

/// Subscribing half of the bus.
///
/// `connect` spawns a reader task that owns the socket, filters by topic
/// prefix and feeds a bounded channel. On a socket error the reader drops
/// the socket and reconnects; the consumer never sees transport hiccups.
pub struct Subscriber {
    rx: mpsc::Receiver<BusMessage>,
}

impl Subscriber {
    /// Connect to the endpoint and subscribe to the topic prefix.
    pub fn connect(endpoint: impl Into<String>, topic: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        tokio::spawn(reader_task(endpoint.into(), topic.into(), tx));
        Self { rx }
    }

    /// Receive the next message, in publish order.
    ///
    /// Returns `None` only when the reader task has stopped, which happens
    /// once the runtime is shutting down.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}

async fn reader_task(endpoint: String, topic: String, tx: mpsc::Sender<BusMessage>) {
    loop {
        if tx.is_closed() {
            return;
        }

        let mut socket = SubSocket::new();
        if let Err(err) = socket.connect(&endpoint).await {
            warn!(%endpoint, error = %err, "Failed to connect to bus, retrying");
            sleep(RECONNECT_DELAY).await;
            continue;
        }
        if let Err(err) = socket.subscribe(&topic).await {
            warn!(%topic, error = %err, "Failed to subscribe, retrying");
            sleep(RECONNECT_DELAY).await;
            continue;
        }
        info!(%endpoint, %topic, "Subscribed to bus");

        loop {
            match socket.recv().await {
                Ok(msg) => match BusMessage::from_zmq(msg) {
                    Some(message) => {
                        if tx.send(message).await.is_err() {
                            return;
                        }
                    }
                    None => warn!("Received message with unexpected frame count"),
                },
                Err(err) => {
                    error!(error = %err, "Bus receive failed, reconnecting");
                    break;
                }
            }
        }

        sleep(RECONNECT_DELAY).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_frame(topic: &str, payload: &[u8]) -> ZmqMessage {
        let mut msg = ZmqMessage::from(topic.as_bytes().to_vec());
        msg.push_back(Bytes::copy_from_slice(payload));
        msg
    }

    #[test]
    fn decodes_two_frame_messages() {
        let msg = BusMessage::from_zmq(two_frame("VXSE45", b"<Report/>")).unwrap();
        assert_eq!(msg.topic, "VXSE45");
        assert_eq!(msg.payload, b"<Report/>");
    }

    #[test]
    fn rejects_single_frame_messages() {
        let msg = ZmqMessage::from(b"VXSE45".to_vec());
        assert_eq!(BusMessage::from_zmq(msg), None);
    }

    // End-to-end socket round-trip; needs a free TCP port, so it is opt-in.
    #[tokio::test]
    async fn loopback_round_trip() {
        if std::env::var("EEW_BUS_LOOPBACK_TEST").is_err() {
            return;
        }
        let endpoint = "tcp://127.0.0.1:5599";
        let mut publisher = Publisher::bind(endpoint).await.unwrap();
        let mut subscriber = Subscriber::connect(endpoint, "VXSE45");

        // PUB drops messages sent before the subscription is in place.
        tokio::time::sleep(Duration::from_millis(500)).await;
        publisher.publish("VXSE45", b"payload".to_vec()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.topic, "VXSE45");
        assert_eq!(received.payload, b"payload");
    }
}
