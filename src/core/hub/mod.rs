// src/core/hub/mod.rs

//! The broadcast hub: the single owner of the published `ServerState`, the set
//! of connected sessions, and the provider lifecycle tied to that set.
//!
//! Every read or mutation of membership, snapshot and provider activity
//! happens under one `parking_lot::Mutex`. Critical sections never await and
//! never touch a socket; fan-out and presentation callbacks run after the lock
//! is released, on copies taken while it was held.

mod lifecycle;
mod timer;

pub use lifecycle::{JoinAction, ProviderActivity};
pub use timer::DelayedAction;

use crate::config::Config;
use crate::connection::ClientSession;
use crate::core::GnssShareError;
use crate::core::errors::ProviderError;
use crate::core::events::{ProviderEvent, ProviderSink};
use crate::core::protocol;
use crate::core::provider::{LocationProvider, LocationSource};
use crate::core::state::{LocationFix, ServerState, ServerStatus};
use crate::core::status::{StatusListener, StatusReport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Hub settings derived from the server configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubSettings {
    /// Passed to the provider on every start.
    pub source: LocationSource,
    /// Delay between the last client leaving and the provider being stopped.
    pub stop_grace: Duration,
}

impl HubSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source: config.source,
            stop_grace: config.provider_stop_grace,
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// State guarded by the hub lock.
struct HubInner {
    sessions: HashMap<u64, Arc<ClientSession>>,
    state: Arc<ServerState>,
    activity: ProviderActivity,
    pending_stop: DelayedAction,
}

/// The single source of truth for what clients are told.
pub struct BroadcastHub {
    inner: Mutex<HubInner>,
    /// Cleared on shutdown. A stopped hub never schedules a delayed stop and
    /// rejects new registrations.
    running: AtomicBool,
    provider: Arc<dyn LocationProvider>,
    status: Arc<dyn StatusListener>,
    sink: ProviderSink,
    settings: HubSettings,
    weak_self: Weak<BroadcastHub>,
}

impl BroadcastHub {
    /// Creates a hub and the receiver its event pump must drain.
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        status: Arc<dyn StatusListener>,
        settings: HubSettings,
    ) -> (Arc<Self>, UnboundedReceiver<ProviderEvent>) {
        let (sink, events) = ProviderSink::channel();
        let hub = Arc::new_cyclic(|weak_self| Self {
            inner: Mutex::new(HubInner {
                sessions: HashMap::new(),
                state: Arc::new(ServerState::new()),
                activity: ProviderActivity::Idle,
                pending_stop: DelayedAction::new(),
            }),
            running: AtomicBool::new(true),
            provider,
            status,
            sink,
            settings,
            weak_self: weak_self.clone(),
        });
        (hub, events)
    }

    // --- Membership ---

    /// Adds `session` to the membership set. The first member starts the
    /// provider (or cancels its pending stop).
    ///
    /// Returns `false` if the hub is shut down; the session is then
    /// disconnected and not added.
    pub fn register(&self, session: Arc<ClientSession>) -> bool {
        if !self.is_running() {
            debug!(
                "Rejecting client {}: server is shutting down.",
                session.addr()
            );
            session.disconnect();
            return false;
        }

        let (count, start_result) = {
            let mut inner = self.inner.lock();
            let was_empty = inner.sessions.is_empty();
            inner.sessions.insert(session.id(), session.clone());
            let start_result = if was_empty {
                self.start_provider_if_needed(&mut inner)
            } else {
                Ok(None)
            };
            (inner.sessions.len(), start_result)
        };

        info!(
            "Client registered: {} (session {}). Connected clients: {}",
            session.addr(),
            session.id(),
            count
        );
        self.status.on_membership_changed(count);
        match start_result {
            Ok(Some(state)) => self.status.on_state_changed(&state),
            Ok(None) => {}
            Err(e) => self.report_provider_failure(&e),
        }
        true
    }

    /// Removes the session with `session_id`. Returns `false` if it was
    /// already removed, which is a normal outcome when teardown paths race.
    ///
    /// Leaving the set empty schedules a delayed provider stop.
    pub fn deregister(&self, session_id: u64) -> bool {
        let (removed, count) = {
            let mut inner = self.inner.lock();
            let removed = inner.sessions.remove(&session_id);
            if removed.is_some() && inner.sessions.is_empty() && self.is_running() {
                self.schedule_stop(&mut inner);
            }
            (removed, inner.sessions.len())
        };

        match &removed {
            Some(session) => info!(
                "Client removed: {}. Remaining clients: {}",
                session.addr(),
                count
            ),
            None => debug!("Client session {} was already removed.", session_id),
        }
        self.status.on_membership_changed(count);
        removed.is_some()
    }

    // --- Provider updates ---

    /// Publishes `fix` and pushes the resulting frame to every current member.
    ///
    /// The frame is pushed before the lock is released, so a concurrent
    /// `send_snapshot` can never replace it with an older state.
    pub fn on_fix_received(&self, fix: LocationFix) {
        let state = {
            let mut inner = self.inner.lock();
            if !inner.activity.is_running() {
                debug!("Dropping fix received while the provider is idle.");
                return;
            }
            let state = Arc::new(inner.state.with_fix(fix));
            inner.state = state.clone();

            match protocol::frame(&protocol::encode(&state)) {
                Ok(frame) => {
                    debug!("Broadcasting location to {} clients.", inner.sessions.len());
                    for session in inner.sessions.values() {
                        session.push(frame.clone());
                    }
                }
                Err(e) => warn!("Failed to encode location update: {}", e),
            }
            state
        };

        self.status.on_state_changed(&state);
    }

    /// Updates the satellite count without broadcasting. It reaches clients
    /// with the next fix or heartbeat response.
    pub fn on_satellite_count_changed(&self, count: u32) {
        let notify = {
            let mut inner = self.inner.lock();
            inner.state = Arc::new(inner.state.with_satellites(count));
            (!inner.sessions.is_empty() && !inner.state.has_location())
                .then(|| inner.state.clone())
        };

        if let Some(state) = notify {
            self.status.on_state_changed(&state);
        }
    }

    /// Drains provider events until `shutdown` fires or the channel closes.
    pub async fn run_event_pump(
        self: Arc<Self>,
        mut events: UnboundedReceiver<ProviderEvent>,
        shutdown: CancellationToken,
    ) {
        info!("Provider event pump started.");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(ProviderEvent::Fix(fix)) => self.on_fix_received(fix),
                    Some(ProviderEvent::SatelliteCount(count)) => {
                        self.on_satellite_count_changed(count)
                    }
                    None => break,
                },
            }
        }
        info!("Provider event pump shutting down.");
    }

    // --- Provider lifecycle ---

    /// Called with the lock held when membership goes from zero to one.
    fn start_provider_if_needed(
        &self,
        inner: &mut HubInner,
    ) -> Result<Option<Arc<ServerState>>, ProviderError> {
        match inner.activity.member_joined() {
            JoinAction::StartProvider => {
                info!("Starting location updates ({} source)...", self.settings.source);
                if let Err(e) = self.provider.start(self.settings.source, self.sink.clone()) {
                    inner.activity.force_idle();
                    return Err(e);
                }
                let state = Arc::new(inner.state.with_status(ServerStatus::AwaitingLocation));
                inner.state = state.clone();
                info!("Location updates started.");
                Ok(Some(state))
            }
            JoinAction::CancelStop => {
                if inner.pending_stop.cancel() {
                    debug!("Cancelled scheduled stop of location updates.");
                }
                Ok(None)
            }
            JoinAction::Nothing => Ok(None),
        }
    }

    /// Called with the lock held when membership becomes empty.
    fn schedule_stop(&self, inner: &mut HubInner) {
        if !inner.activity.last_member_left() {
            return;
        }
        info!(
            "No clients remaining, scheduling stop of location updates in {:?}.",
            self.settings.stop_grace
        );
        let weak = self.weak_self.clone();
        let scheduled = inner
            .pending_stop
            .schedule(self.settings.stop_grace, move |generation| {
                if let Some(hub) = weak.upgrade() {
                    hub.stop_provider_if_idle(generation);
                }
            });
        if scheduled.is_none() {
            warn!("Could not schedule delayed stop; stopping location updates now.");
            inner.activity.stop_fired();
            self.stop_provider_locked(inner);
        }
    }

    /// The body of the delayed stop scheduled as `generation`.
    ///
    /// Re-checks at fire time that this stop is still the pending one (it was
    /// neither cancelled by a registration nor replaced), that nobody has
    /// reconnected and that the server is still running; otherwise does nothing.
    pub fn stop_provider_if_idle(&self, generation: u64) {
        let state = {
            let mut inner = self.inner.lock();
            if !inner.pending_stop.is_current(generation) {
                debug!("Ignoring stale delayed stop (generation {}).", generation);
                return;
            }
            inner.pending_stop.disarm();
            if !self.is_running() || !inner.sessions.is_empty() {
                debug!("Location updates not stopped: clients connected or server stopping.");
                return;
            }
            if !inner.activity.stop_fired() {
                return;
            }
            self.stop_provider_locked(&mut inner)
        };
        self.status.on_state_changed(&state);
    }

    fn stop_provider_locked(&self, inner: &mut HubInner) -> Arc<ServerState> {
        info!("Stopping location updates...");
        self.provider.stop();
        let state = Arc::new(inner.state.with_status(ServerStatus::LocationStopped));
        inner.state = state.clone();
        info!("Location updates stopped.");
        state
    }

    fn report_provider_failure(&self, e: &ProviderError) {
        match e {
            ProviderError::PermissionDenied(_) => warn!("Location permission not granted: {}", e),
            ProviderError::Unavailable(_) => warn!("Error starting location updates: {}", e),
        }
        self.status
            .on_start_failed(&GnssShareError::Provider(e.clone()).to_string());
    }

    // --- Shutdown ---

    /// Stops the hub: cancels the pending stop, stops the provider and
    /// force-disconnects every session. Idempotent.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let (sessions, stopped_state) = {
            let mut inner = self.inner.lock();
            inner.pending_stop.cancel();
            let stopped_state = if inner.activity.force_idle() {
                Some(self.stop_provider_locked(&mut inner))
            } else {
                None
            };
            let sessions: Vec<Arc<ClientSession>> = inner.sessions.values().cloned().collect();
            (sessions, stopped_state)
        };

        info!("Disconnecting {} clients.", sessions.len());
        for session in sessions {
            session.disconnect();
        }
        if let Some(state) = stopped_state {
            self.status.on_state_changed(&state);
        }
    }

    // --- Queries ---

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<ServerState> {
        self.inner.lock().state.clone()
    }

    /// Queues the current snapshot for `session`.
    ///
    /// Encoding and pushing happen under the hub lock, ordered with respect to
    /// broadcasts, so the outbox never ends up holding an older state than
    /// the published one.
    pub fn send_snapshot(&self, session: &ClientSession) -> Result<(), GnssShareError> {
        let inner = self.inner.lock();
        let frame = protocol::frame(&protocol::encode(&inner.state))?;
        if !session.push(frame) {
            return Err(GnssShareError::SessionClosed);
        }
        Ok(())
    }

    pub fn client_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn provider_activity(&self) -> ProviderActivity {
        self.inner.lock().activity
    }

    /// True while the provider runs, including the grace period after the last client left.
    pub fn is_provider_active(&self) -> bool {
        self.provider_activity().is_running()
    }

    pub fn has_pending_stop(&self) -> bool {
        self.inner.lock().pending_stop.is_pending()
    }

    /// The generation of the pending delayed stop, if one is scheduled.
    pub fn pending_stop_generation(&self) -> Option<u64> {
        self.inner.lock().pending_stop.pending_generation()
    }

    /// A human-readable summary for the presentation layer.
    pub fn status_report(&self) -> StatusReport {
        let (state, clients, activity) = {
            let inner = self.inner.lock();
            (inner.state.clone(), inner.sessions.len(), inner.activity)
        };
        StatusReport::from_state(
            &state,
            clients,
            activity.is_running(),
            chrono::Utc::now().timestamp_millis(),
        )
    }
}
