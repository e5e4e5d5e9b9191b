// src/core/hub/lifecycle.rs

//! The coupling between client membership and provider activity.
//!
//! ```text
//! Idle --first member joins--> Active --last member leaves--> PendingStop
//! PendingStop --grace timer fires, still empty--> Idle
//! PendingStop --member joins--> Active (timer cancelled)
//! ```

/// Whether the location provider is (or is about to stop) running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderActivity {
    #[default]
    Idle,
    Active,
    /// The last client left; the provider keeps running until the grace timer fires.
    PendingStop,
}

/// What the hub must do after the first member joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinAction {
    /// The provider is idle and must be started.
    StartProvider,
    /// The provider is still running; only the pending stop must be cancelled.
    CancelStop,
    Nothing,
}

impl ProviderActivity {
    /// The provider is running, including during the grace period.
    pub fn is_running(self) -> bool {
        !matches!(self, ProviderActivity::Idle)
    }

    /// Transition for a registration that took membership from zero to one.
    pub fn member_joined(&mut self) -> JoinAction {
        match *self {
            ProviderActivity::Idle => {
                *self = ProviderActivity::Active;
                JoinAction::StartProvider
            }
            ProviderActivity::PendingStop => {
                *self = ProviderActivity::Active;
                JoinAction::CancelStop
            }
            ProviderActivity::Active => JoinAction::Nothing,
        }
    }

    /// Transition for a deregistration that left membership empty.
    /// Returns `true` if a delayed stop must be scheduled.
    pub fn last_member_left(&mut self) -> bool {
        if *self == ProviderActivity::Active {
            *self = ProviderActivity::PendingStop;
            return true;
        }
        false
    }

    /// Transition for the grace timer firing. Returns `true` if the provider
    /// must actually be stopped now.
    pub fn stop_fired(&mut self) -> bool {
        if *self == ProviderActivity::PendingStop {
            *self = ProviderActivity::Idle;
            return true;
        }
        false
    }

    /// Unconditional transition to `Idle` (server shutdown or a failed start).
    /// Returns `true` if the provider was running.
    pub fn force_idle(&mut self) -> bool {
        let was_running = self.is_running();
        *self = ProviderActivity::Idle;
        was_running
    }
}
