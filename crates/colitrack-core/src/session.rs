//! Tracking sessions.
//!
//! A [`TrackingSession`] owns everything tied to one tracked code: the path
//! accumulator, the fetched history and the live-signal bookkeeping. The
//! [`Tracker`] holds at most one active session and is the single place
//! where incoming channel messages and REST responses are matched against
//! the code currently tracked. Anything tagged with another code is a stale
//! response and is rejected without touching the active session.

use std::time::{Duration, Instant};

use colitrack_types::{
    ConnectionState, GeoPoint, PositionEvent, SessionId, SignalState, TrackingCode, TrackingStep,
};
use tracing::{debug, info};

use crate::accumulator::{ApplyOutcome, PathAccumulator};
use crate::error::TrackError;
use crate::reconcile::{ReconcileConfig, merge};

/// State of one tracked code, from subscribe to unsubscribe.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    id: SessionId,
    accumulator: PathAccumulator,
    history: Vec<TrackingStep>,
    map_center: Option<GeoPoint>,
    connection: ConnectionState,
    subscribed_at: Instant,
    last_event_at: Option<Instant>,
    stale_after: Duration,
}

impl TrackingSession {
    /// A fresh session for `code`, subscribed at `now`.
    pub fn new(code: TrackingCode, stale_after: Duration, now: Instant) -> Self {
        Self {
            id: SessionId::new(),
            accumulator: PathAccumulator::new(code),
            history: Vec::new(),
            map_center: None,
            connection: ConnectionState::Connected,
            subscribed_at: now,
            last_event_at: None,
            stale_after,
        }
    }

    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Tracked code.
    pub const fn code(&self) -> &TrackingCode {
        self.accumulator.code()
    }

    /// The live path accumulator.
    pub const fn accumulator(&self) -> &PathAccumulator {
        &self.accumulator
    }

    /// History as fetched, in backend order.
    pub fn history(&self) -> &[TrackingStep] {
        &self.history
    }

    /// Map center suggested by the backend.
    pub const fn map_center(&self) -> Option<&GeoPoint> {
        self.map_center.as_ref()
    }

    /// Last known channel connection state.
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Apply a live position event received at `now`.
    ///
    /// Any message counts as signal, including ones dropped for invalid
    /// coordinates.
    pub fn apply_position(&mut self, event: &PositionEvent, now: Instant) -> ApplyOutcome {
        self.last_event_at = Some(now);
        self.accumulator.apply(event)
    }

    /// Store the fetched history and seed the status from it.
    ///
    /// Steps are observed in timestamp order, then the package's own status
    /// label, so the latest known status wins under the accumulator's
    /// no-regress rule.
    pub fn load_history(
        &mut self,
        steps: Vec<TrackingStep>,
        map_center: Option<GeoPoint>,
        status_label: Option<&str>,
    ) {
        let ordered = merge(&steps, &[], &ReconcileConfig::default());
        for step in &ordered {
            self.accumulator.observe_status(&step.status);
        }
        if let Some(label) = status_label {
            self.accumulator.observe_status(label);
        }
        debug!(
            code = %self.code(),
            steps = steps.len(),
            status = %self.accumulator.status(),
            "history loaded"
        );
        self.history = steps;
        self.map_center = map_center.filter(GeoPoint::is_valid);
    }

    /// Record a channel connection change.
    pub fn set_connection(&mut self, state: ConnectionState) {
        if state != self.connection {
            info!(code = %self.code(), state = ?state, "channel connection changed");
            self.connection = state;
        }
    }

    /// Live-signal indicator at `now`.
    pub fn signal(&self, now: Instant) -> SignalState {
        if self.connection == ConnectionState::Disconnected {
            return SignalState::Disconnected;
        }
        let since = self.last_event_at.unwrap_or(self.subscribed_at);
        if now.saturating_duration_since(since) > self.stale_after {
            SignalState::Stale
        } else if self.last_event_at.is_some() {
            SignalState::Live
        } else {
            SignalState::AwaitingSignal
        }
    }

    /// History merged with the live route.
    pub fn timeline(&self, config: &ReconcileConfig) -> Vec<TrackingStep> {
        merge(&self.history, self.accumulator.route(), config)
    }
}

/// Holds the active tracking session and filters stale traffic.
#[derive(Debug)]
pub struct Tracker {
    active: Option<TrackingSession>,
    stale_after: Duration,
}

impl Tracker {
    /// A tracker with no active session.
    pub const fn new(stale_after: Duration) -> Self {
        Self {
            active: None,
            stale_after,
        }
    }

    /// Start tracking `code`, discarding any previous session. Tracking
    /// the same code again also starts afresh.
    pub fn track(&mut self, code: TrackingCode, now: Instant) -> &TrackingSession {
        if let Some(previous) = &self.active {
            info!(from = %previous.code(), to = %code, "switching tracked code");
        } else {
            info!(code = %code, "tracking started");
        }
        self.active
            .insert(TrackingSession::new(code, self.stale_after, now))
    }

    /// Stop tracking, returning the finished session.
    pub fn stop(&mut self) -> Option<TrackingSession> {
        let session = self.active.take();
        if let Some(s) = &session {
            info!(code = %s.code(), "tracking stopped");
        }
        session
    }

    /// The active session, if any.
    pub const fn active(&self) -> Option<&TrackingSession> {
        self.active.as_ref()
    }

    /// Whether `code` is the code currently tracked.
    pub fn is_active(&self, code: &TrackingCode) -> bool {
        self.active.as_ref().is_some_and(|s| s.code() == code)
    }

    fn session_for(&mut self, code: &TrackingCode) -> Result<&mut TrackingSession, TrackError> {
        let Some(session) = self.active.as_mut() else {
            debug!(received = %code, "no active session, discarding");
            return Err(TrackError::NoActiveSession {
                received: code.clone(),
            });
        };
        if session.code() != code {
            debug!(active = %session.code(), received = %code, "discarding stale response");
            return Err(TrackError::StaleResponse {
                active: session.code().clone(),
                received: code.clone(),
            });
        }
        Ok(session)
    }

    /// Route a live event tagged with `code` to the active session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::StaleResponse`] when `code` is not the active
    /// code, or [`TrackError::NoActiveSession`] when nothing is tracked.
    pub fn on_position(
        &mut self,
        code: &TrackingCode,
        event: &PositionEvent,
        now: Instant,
    ) -> Result<ApplyOutcome, TrackError> {
        let session = self.session_for(code)?;
        Ok(session.apply_position(event, now))
    }

    /// Route a history response tagged with `code` to the active session.
    ///
    /// # Errors
    ///
    /// Same as [`Tracker::on_position`].
    pub fn on_history(
        &mut self,
        code: &TrackingCode,
        steps: Vec<TrackingStep>,
        map_center: Option<GeoPoint>,
        status_label: Option<&str>,
    ) -> Result<(), TrackError> {
        let session = self.session_for(code)?;
        session.load_history(steps, map_center, status_label);
        Ok(())
    }

    /// Record a connection change on the active session, if any.
    pub fn on_connection(&mut self, state: ConnectionState) {
        if let Some(session) = self.active.as_mut() {
            session.set_connection(state);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use colitrack_types::{ShipmentStatus, StepSource, TrackingPhase};

    use super::*;

    const STALE: Duration = Duration::from_secs(60);

    fn code(raw: &str) -> TrackingCode {
        TrackingCode::parse(raw).unwrap()
    }

    fn step(status: &str) -> TrackingStep {
        TrackingStep {
            timestamp: None,
            status: status.to_owned(),
            location: None,
            point: None,
            source: StepSource::History,
        }
    }

    #[test]
    fn late_event_for_previous_code_is_rejected() {
        let now = Instant::now();
        let mut tracker = Tracker::new(STALE);
        tracker.track(code("A"), now);
        tracker
            .on_position(&code("A"), &PositionEvent::at(4.05, 9.76), now)
            .unwrap();

        tracker.stop();
        tracker.track(code("B"), now);

        let late = tracker.on_position(&code("A"), &PositionEvent::at(4.06, 9.77), now);
        assert_eq!(
            late,
            Err(TrackError::StaleResponse {
                active: code("B"),
                received: code("A"),
            })
        );
        let active = tracker.active().unwrap();
        assert_eq!(active.code(), &code("B"));
        assert!(active.accumulator().route().is_empty());
        assert_eq!(active.accumulator().phase(), TrackingPhase::Empty);
    }

    #[test]
    fn events_without_session_are_rejected() {
        let mut tracker = Tracker::new(STALE);
        let result = tracker.on_position(&code("A"), &PositionEvent::at(4.05, 9.76), Instant::now());
        assert!(matches!(result, Err(TrackError::NoActiveSession { .. })));
    }

    #[test]
    fn stale_history_response_is_rejected() {
        let now = Instant::now();
        let mut tracker = Tracker::new(STALE);
        tracker.track(code("A"), now);
        tracker.track(code("B"), now);
        let result = tracker.on_history(&code("A"), vec![step("Livré")], None, None);
        assert!(result.is_err());
        assert_eq!(
            tracker.active().map(|s| s.accumulator().status()),
            Some(ShipmentStatus::Registered)
        );
    }

    #[test]
    fn retracking_same_code_starts_fresh() {
        let now = Instant::now();
        let mut tracker = Tracker::new(STALE);
        let first = tracker.track(code("A"), now).id();
        tracker
            .on_position(&code("A"), &PositionEvent::at(4.05, 9.76), now)
            .unwrap();
        let second = tracker.track(code("A"), now).id();
        assert_ne!(first, second);
        assert!(tracker.active().unwrap().accumulator().route().is_empty());
    }

    #[test]
    fn history_seeds_status() {
        let now = Instant::now();
        let mut tracker = Tracker::new(STALE);
        tracker.track(code("A"), now);
        tracker
            .on_history(
                &code("A"),
                vec![step("Enregistré"), step("En transit")],
                Some(GeoPoint::new(0.0, 0.0)),
                None,
            )
            .unwrap();
        let session = tracker.active().unwrap();
        assert_eq!(session.accumulator().status(), ShipmentStatus::InTransit);
        assert!(session.map_center().is_none());
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn package_status_applies_without_steps() {
        let now = Instant::now();
        let mut tracker = Tracker::new(STALE);
        tracker.track(code("A"), now);
        tracker
            .on_history(&code("A"), Vec::new(), None, Some("Livré"))
            .unwrap();
        let session = tracker.active().unwrap();
        assert_eq!(session.accumulator().status(), ShipmentStatus::Delivered);
        assert!(session.history().is_empty());
    }

    #[test]
    fn package_status_never_regresses_delivery() {
        let mut session = TrackingSession::new(code("A"), STALE, Instant::now());
        session.load_history(vec![step("Livré")], None, Some("En transit"));
        assert_eq!(session.accumulator().status(), ShipmentStatus::Delivered);
        assert_eq!(
            session.accumulator().shipment().status_label.as_deref(),
            Some("Livré")
        );
    }

    #[test]
    fn signal_follows_events_and_connection() {
        let t0 = Instant::now();
        let mut session = TrackingSession::new(code("A"), STALE, t0);
        assert_eq!(session.signal(t0), SignalState::AwaitingSignal);
        assert_eq!(session.signal(t0 + Duration::from_secs(61)), SignalState::Stale);

        let t1 = t0 + Duration::from_secs(5);
        session.apply_position(&PositionEvent::at(4.05, 9.76), t1);
        assert_eq!(session.signal(t1 + Duration::from_secs(30)), SignalState::Live);
        assert_eq!(session.signal(t1 + Duration::from_secs(90)), SignalState::Stale);

        session.set_connection(ConnectionState::Disconnected);
        assert_eq!(session.signal(t1), SignalState::Disconnected);
        assert_eq!(session.accumulator().route().len(), 1);

        session.set_connection(ConnectionState::Connected);
        assert_eq!(session.signal(t1), SignalState::Live);
    }

    #[test]
    fn timeline_merges_history_and_live() {
        let now = Instant::now();
        let mut session = TrackingSession::new(code("A"), STALE, now);
        session.load_history(vec![step("En transit")], None, None);
        session.apply_position(&PositionEvent::at(4.05, 9.76), now);
        let timeline = session.timeline(&ReconcileConfig::default());
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.get(1).map(|s| s.status.as_str()), Some("En transit"));
    }
}
