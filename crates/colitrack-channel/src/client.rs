//! Position channel client.
//!
//! One [`ChannelClient`] per tracking session. Subscribing joins the room of
//! a tracking code and returns a [`PositionStream`]; a forwarding task moves
//! decoded events from the transport into the stream's buffer.
//!
//! Unsubscribing clears the stream's active flag before aborting the
//! forwarding task. The stream checks the flag on every poll, so once
//! [`ChannelClient::unsubscribe`] returns no further event is yielded, even
//! one already buffered.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use colitrack_types::{ConnectionState, PositionEvent, TrackingCode};
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{decode_position, encode_join, join_subject, room_subject};
use crate::error::ChannelError;
use crate::transport::{MemoryHub, Transport};

/// A decoded event, tagged with the room it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    /// Room the event was published in.
    pub code: TrackingCode,
    /// Decoded event.
    pub event: PositionEvent,
}

/// Stream of events for one subscription.
///
/// Ends when the subscription is cancelled or the transport closes.
#[derive(Debug)]
pub struct PositionStream {
    code: TrackingCode,
    rx: mpsc::Receiver<ChannelMessage>,
    active: Arc<AtomicBool>,
}

impl PositionStream {
    /// Code this stream is subscribed to.
    pub const fn code(&self) -> &TrackingCode {
        &self.code
    }

    /// Whether the subscription is still live.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Stream for PositionStream {
    type Item = ChannelMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.is_active() {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(message)) if self.is_active() => Poll::Ready(Some(message)),
            Poll::Ready(_) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug)]
struct Subscription {
    code: TrackingCode,
    active: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Subscription {
    fn cancel(self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }
}

/// Client for the live position channel.
#[derive(Debug)]
pub struct ChannelClient {
    transport: Transport,
    prefix: String,
    buffer: usize,
    subscription: Option<Subscription>,
}

impl ChannelClient {
    /// A client over `transport`, using `prefix` for subjects and
    /// buffering up to `buffer` events per subscription.
    pub fn new(transport: Transport, prefix: impl Into<String>, buffer: usize) -> Self {
        Self {
            transport,
            prefix: prefix.into(),
            buffer: buffer.max(1),
            subscription: None,
        }
    }

    /// Connection state signal of the underlying transport.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.transport.connection()
    }

    /// Code currently subscribed to.
    pub fn subscribed(&self) -> Option<&TrackingCode> {
        self.subscription.as_ref().map(|s| &s.code)
    }

    /// Join the room of `code` and stream its events.
    ///
    /// An existing subscription (for any code) is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Nats`] if subscribing or announcing the
    /// join fails, or [`ChannelError::Serde`] if the join cannot be
    /// encoded.
    pub async fn subscribe(&mut self, code: &TrackingCode) -> Result<PositionStream, ChannelError> {
        if let Some(previous) = self.subscription.take() {
            debug!(code = %previous.code, "replacing subscription");
            previous.cancel();
        }

        let join = encode_join(code)?;
        let subject = room_subject(&self.prefix, code);
        let (tx, rx) = mpsc::channel(self.buffer);
        let active = Arc::new(AtomicBool::new(true));

        let task = match &self.transport {
            Transport::Nats(nats) => {
                let subscriber = nats
                    .client()
                    .subscribe(subject.clone())
                    .await
                    .map_err(|e| ChannelError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
                tokio::spawn(forward_nats(subscriber, code.clone(), tx))
            }
            Transport::Memory(hub) => {
                tokio::spawn(forward_memory(hub, subject.clone(), code.clone(), tx))
            }
        };

        if let Err(e) = self.transport.publish(join_subject(&self.prefix), join).await {
            active.store(false, Ordering::Release);
            task.abort();
            return Err(e);
        }
        info!(code = %code, subject = subject, "subscribed to position room");

        self.subscription = Some(Subscription {
            code: code.clone(),
            active: Arc::clone(&active),
            task,
        });
        Ok(PositionStream {
            code: code.clone(),
            rx,
            active,
        })
    }

    /// Leave the room of `code`. Idempotent: returns `false` when `code`
    /// was not subscribed.
    pub fn unsubscribe(&mut self, code: &TrackingCode) -> bool {
        match self.subscription.take() {
            Some(subscription) if &subscription.code == code => {
                info!(code = %code, "unsubscribed from position room");
                subscription.cancel();
                true
            }
            other => {
                self.subscription = other;
                false
            }
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}

fn decode(code: &TrackingCode, payload: &[u8]) -> Option<ChannelMessage> {
    match decode_position(payload) {
        Ok(event) => Some(ChannelMessage {
            code: code.clone(),
            event,
        }),
        Err(e) => {
            warn!(code = %code, error = %e, "skipping undecodable position payload");
            None
        }
    }
}

async fn forward_nats(
    mut subscriber: async_nats::Subscriber,
    code: TrackingCode,
    tx: mpsc::Sender<ChannelMessage>,
) {
    while let Some(message) = subscriber.next().await {
        let Some(decoded) = decode(&code, &message.payload) else {
            continue;
        };
        if tx.send(decoded).await.is_err() {
            break;
        }
    }
    debug!(code = %code, "NATS forwarding ended");
}

fn forward_memory(
    hub: &MemoryHub,
    subject: String,
    code: TrackingCode,
    tx: mpsc::Sender<ChannelMessage>,
) -> impl Future<Output = ()> + Send + 'static {
    // Receiver is created before returning so nothing published after
    // subscribe is missed.
    let mut rx = hub.subscribe_all();
    async move {
        loop {
            match rx.recv().await {
                Ok(message) if message.subject == subject => {
                    let Some(decoded) = decode(&code, &message.payload) else {
                        continue;
                    };
                    if tx.send(decoded).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(code = %code, skipped = n, "position forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!(code = %code, "memory forwarding ended");
    }
}
