//! Channel transports.
//!
//! [`Transport`] dispatches between the production NATS connection and an
//! in-process [`MemoryHub`] used for tests and replays. Both are cheap to
//! clone, so one connection can back several [`ChannelClient`]s.
//!
//! [`ChannelClient`]: crate::client::ChannelClient

use std::sync::Arc;

use colitrack_types::ConnectionState;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::ChannelError;

/// A message travelling through a [`MemoryHub`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubMessage {
    /// Subject the message was published on.
    pub subject: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

/// In-process publish/subscribe hub with subject-exact delivery.
#[derive(Debug, Clone)]
pub struct MemoryHub {
    tx: broadcast::Sender<HubMessage>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl MemoryHub {
    /// A connected hub buffering up to `capacity` messages per receiver.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Connected);
        Self {
            tx,
            state: Arc::new(state),
        }
    }

    /// Publish `payload` on `subject`. Returns the number of receivers
    /// that saw it (before subject filtering).
    pub fn publish(&self, subject: impl Into<String>, payload: Vec<u8>) -> usize {
        let message = HubMessage {
            subject: subject.into(),
            payload,
        };
        self.tx.send(message).unwrap_or(0)
    }

    /// Receive every message published from now on, on any subject.
    pub fn subscribe_all(&self) -> broadcast::Receiver<HubMessage> {
        self.tx.subscribe()
    }

    /// Simulate a connection change.
    pub fn set_connection(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Connection state signal.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new(256)
    }
}

/// A NATS connection with its connection-state signal.
#[derive(Clone)]
pub struct NatsTransport {
    client: async_nats::Client,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl NatsTransport {
    /// Connect to a NATS server. Connection drops and reconnects are
    /// reflected in [`NatsTransport::connection`]; reconnection itself is
    /// handled by the client.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Nats`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        info!(url = url, "connecting to NATS server");
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state);
        let callback_state = Arc::clone(&state);
        let client = async_nats::ConnectOptions::new()
            .event_callback(move |event| {
                let state = Arc::clone(&callback_state);
                async move {
                    match event {
                        async_nats::Event::Connected => {
                            info!("NATS connection established");
                            state.send_replace(ConnectionState::Connected);
                        }
                        async_nats::Event::Disconnected => {
                            warn!("NATS connection lost");
                            state.send_replace(ConnectionState::Disconnected);
                        }
                        other => debug!(event = ?other, "NATS event"),
                    }
                }
            })
            .connect(url)
            .await
            .map_err(|e| ChannelError::Nats(format!("failed to connect to {url}: {e}")))?;
        state.send_replace(ConnectionState::Connected);
        Ok(Self { client, state })
    }

    /// The underlying client.
    pub const fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Connection state signal.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for NatsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsTransport")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Transport backing a channel client.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Production NATS connection.
    Nats(NatsTransport),
    /// In-process hub.
    Memory(MemoryHub),
}

impl Transport {
    /// Connect to NATS at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Nats`] if the connection fails.
    pub async fn nats(url: &str) -> Result<Self, ChannelError> {
        Ok(Self::Nats(NatsTransport::connect(url).await?))
    }

    /// Connection state signal.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        match self {
            Self::Nats(nats) => nats.connection(),
            Self::Memory(hub) => hub.connection(),
        }
    }

    /// Publish a raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Nats`] if the NATS publish fails.
    pub async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), ChannelError> {
        match self {
            Self::Nats(nats) => nats
                .client
                .publish(subject.clone(), payload.into())
                .await
                .map_err(|e| ChannelError::Nats(format!("failed to publish to {subject}: {e}"))),
            Self::Memory(hub) => {
                hub.publish(subject, payload);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hub_delivers_to_all_receivers() {
        let hub = MemoryHub::new(8);
        let mut rx = hub.subscribe_all();
        assert_eq!(hub.publish("track.A.position", b"{}".to_vec()), 1);
        let message = rx.recv().await.unwrap();
        assert_eq!(message.subject, "track.A.position");
    }

    #[tokio::test]
    async fn hub_without_receivers_drops_messages() {
        let hub = MemoryHub::new(8);
        assert_eq!(hub.publish("track.A.position", Vec::new()), 0);
    }

    #[tokio::test]
    async fn hub_connection_signal() {
        let hub = MemoryHub::default();
        let transport = Transport::Memory(hub.clone());
        let mut state = transport.connection();
        assert_eq!(*state.borrow(), ConnectionState::Connected);
        hub.set_connection(ConnectionState::Disconnected);
        state.changed().await.unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    #[ignore = "requires a NATS server on localhost:4222"]
    async fn nats_connect_reports_connected() {
        let transport = Transport::nats("nats://localhost:4222").await.unwrap();
        assert_eq!(*transport.connection().borrow(), ConnectionState::Connected);
    }
}
