//! The live tracking loop.
//!
//! Everything happens on one task: operator commands, channel events,
//! history and entity responses, connection changes and the periodic
//! signal check are multiplexed with `tokio::select!`. Backend calls run on
//! a [`JoinSet`] and come back tagged with the code they were made for, so
//! a response for a code that is no longer tracked is discarded by the
//! [`Tracker`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use colitrack_api::{ApiClient, ApiError, ParcelQuery, TrackHistory};
use colitrack_channel::{ChannelClient, ChannelMessage, PositionStream};
use colitrack_core::{ReconcileConfig, Tracker, build_frame};
use colitrack_geo::{MapHandle, ViewportController, aggregate};
use colitrack_observer::AppState;
use colitrack_types::{ConnectionState, MapEntity, SignalState, TrackingCode};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::LiveError;

/// How often the live signal is re-evaluated.
const SIGNAL_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on parcel pages fetched per entity refresh.
const MAX_PARCEL_PAGES: u32 = 20;

type HistoryResult = (TrackingCode, Result<TrackHistory, ApiError>);

/// Settings the loop needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// Silence after which the signal turns stale.
    pub stale_after: Duration,
    /// Deduplication settings for the timeline.
    pub reconcile: ReconcileConfig,
    /// Page size for parcel listings.
    pub per_page: u32,
}

/// State of the live loop.
pub struct LiveLoop {
    api: ApiClient,
    channel: ChannelClient,
    observer: Arc<AppState>,
    controller: ViewportController,
    settings: LiveSettings,
    tracker: Tracker,
    stream: Option<PositionStream>,
    map: Option<MapHandle>,
    connection: watch::Receiver<ConnectionState>,
    connection_open: bool,
    history: JoinSet<HistoryResult>,
    entities: JoinSet<Result<Vec<MapEntity>, ApiError>>,
    last_signal: Option<SignalState>,
}

impl LiveLoop {
    /// Assemble the loop. Nothing is fetched until [`LiveLoop::run`].
    pub fn new(
        api: ApiClient,
        channel: ChannelClient,
        observer: Arc<AppState>,
        controller: ViewportController,
        settings: LiveSettings,
    ) -> Self {
        let connection = channel.connection();
        Self {
            tracker: Tracker::new(settings.stale_after),
            api,
            channel,
            observer,
            controller,
            settings,
            stream: None,
            map: None,
            connection,
            connection_open: true,
            history: JoinSet::new(),
            entities: JoinSet::new(),
            last_signal: None,
        }
    }

    /// Run until [`Command::Quit`] or the command channel closes.
    ///
    /// # Errors
    ///
    /// Returns [`LiveError::Api`] when the backend rejects the session
    /// credential. Other backend failures are logged and the loop goes on.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<(), LiveError> {
        self.refresh_entities();
        let mut ticker = tokio::time::interval(SIGNAL_CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Track(code)) => self.track(code).await,
                    Some(Command::Stop) => self.stop().await,
                    Some(Command::Refresh) => self.refresh_entities(),
                    Some(Command::Quit) | None => break,
                },
                message = next_message(&mut self.stream) => match message {
                    Some(message) => self.on_message(&message).await,
                    None => {
                        debug!("position stream ended");
                        self.stream = None;
                    }
                },
                Some(joined) = self.history.join_next(), if !self.history.is_empty() => {
                    match joined {
                        Ok((code, result)) => self.on_history(&code, result).await?,
                        Err(e) => warn!(error = %e, "history task failed"),
                    }
                }
                Some(joined) = self.entities.join_next(), if !self.entities.is_empty() => {
                    match joined {
                        Ok(result) => self.on_entities(result).await?,
                        Err(e) => warn!(error = %e, "entity task failed"),
                    }
                }
                changed = self.connection.changed(), if self.connection_open => {
                    if changed.is_ok() {
                        let state = *self.connection.borrow_and_update();
                        self.on_connection(state).await;
                    } else {
                        debug!("connection signal closed");
                        self.connection_open = false;
                    }
                }
                _ = ticker.tick() => self.check_signal().await,
            }
        }

        self.stop().await;
        self.history.abort_all();
        self.entities.abort_all();
        info!("live loop finished");
        Ok(())
    }

    async fn track(&mut self, code: TrackingCode) {
        if let Some(previous) = self.tracker.active().map(|s| s.code().clone()) {
            self.channel.unsubscribe(&previous);
        }
        self.stream = None;
        self.tracker.track(code.clone(), Instant::now());
        self.tracker.on_connection(*self.connection.borrow());
        if let Some(handle) = self.map.replace(self.controller.mount()) {
            handle.release();
        }

        match self.channel.subscribe(&code).await {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                warn!(code = %code, error = %e, "live channel unavailable, showing history only");
                self.tracker.on_connection(ConnectionState::Disconnected);
            }
        }

        let api = self.api.clone();
        self.history.spawn(async move {
            let result = api.fetch_history(&code).await;
            (code, result)
        });
        self.publish().await;
    }

    async fn stop(&mut self) {
        self.stream = None;
        if let Some(session) = self.tracker.stop() {
            self.channel.unsubscribe(session.code());
        }
        if let Some(handle) = self.map.take() {
            handle.release();
            self.observer.clear_frame().await;
        }
        self.last_signal = None;
    }

    fn refresh_entities(&mut self) {
        let api = self.api.clone();
        let query = ParcelQuery {
            per_page: self.settings.per_page,
            ..ParcelQuery::default()
        };
        self.entities.spawn(async move {
            let agencies = api.list_agencies().await?;
            let parcels = api.list_all_parcels(&query, MAX_PARCEL_PAGES).await?;
            Ok(aggregate(&agencies.items, &parcels))
        });
    }

    async fn on_message(&mut self, message: &ChannelMessage) {
        match self
            .tracker
            .on_position(&message.code, &message.event, Instant::now())
        {
            Ok(outcome) => {
                debug!(code = %message.code, ?outcome, "position applied");
                self.publish().await;
            }
            Err(e) => debug!(error = %e, "position discarded"),
        }
    }

    async fn on_history(
        &mut self,
        code: &TrackingCode,
        result: Result<TrackHistory, ApiError>,
    ) -> Result<(), LiveError> {
        match result {
            Ok(history) => {
                let steps = history.steps.len();
                match self.tracker.on_history(
                    code,
                    history.steps,
                    history.map_center,
                    history.status_label.as_deref(),
                ) {
                    Ok(()) => {
                        info!(code = %code, steps, "history loaded");
                        self.publish().await;
                    }
                    Err(e) => debug!(error = %e, "history discarded"),
                }
            }
            Err(e) if e.is_session_expired() => {
                warn!(code = %code, "session expired, re-authentication required");
                return Err(e.into());
            }
            Err(ApiError::NotFound(_)) if self.tracker.is_active(code) => {
                warn!(code = %code, "no such shipment");
            }
            Err(e) if self.tracker.is_active(code) => {
                warn!(code = %code, error = %e, "history fetch failed");
            }
            Err(e) => debug!(code = %code, error = %e, "stale history failure discarded"),
        }
        Ok(())
    }

    async fn on_entities(
        &mut self,
        result: Result<Vec<MapEntity>, ApiError>,
    ) -> Result<(), LiveError> {
        match result {
            Ok(entities) => {
                info!(count = entities.len(), "entities refreshed");
                self.observer.set_entities(entities).await;
                Ok(())
            }
            Err(e) if e.is_session_expired() => {
                warn!("session expired, re-authentication required");
                Err(e.into())
            }
            Err(e) => {
                warn!(error = %e, "entity refresh failed");
                Ok(())
            }
        }
    }

    async fn on_connection(&mut self, state: ConnectionState) {
        info!(?state, "channel connection changed");
        self.tracker.on_connection(state);
        self.publish().await;
    }

    async fn check_signal(&mut self) {
        let Some(session) = self.tracker.active() else {
            return;
        };
        if Some(session.signal(Instant::now())) != self.last_signal {
            self.publish().await;
        }
    }

    async fn publish(&mut self) {
        let (Some(session), Some(map)) = (self.tracker.active(), self.map.as_mut()) else {
            return;
        };
        let frame = build_frame(
            session,
            &self.controller,
            map,
            &self.settings.reconcile,
            Instant::now(),
        );
        if self.last_signal != Some(frame.signal) {
            info!(code = %frame.code, signal = ?frame.signal, "signal changed");
        }
        self.last_signal = Some(frame.signal);
        let clients = self.observer.publish_frame(frame).await;
        debug!(clients, "frame published");
    }
}

/// Next message of the current subscription, or never when there is none.
async fn next_message(stream: &mut Option<PositionStream>) -> Option<ChannelMessage> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
