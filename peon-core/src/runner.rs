//! Hook runner: one full hook invocation from payload to side effects.
//!
//! ## Error Handling
//!
//! A hook must return promptly and never break the host, so every fault
//! except a broken default pack degrades to "no sound, no notification":
//!
//! - **Corrupt config**: built-in defaults are used for this run.
//! - **Unparsable payload / unknown event**: logged, no-op.
//! - **State lock timeout or unreadable state**: spam detection is skipped
//!   for this event; an unreadable state file is replaced with a fresh one.
//! - **Missing pack asset**: logged, no-op.
//! - **Host failures** (player, notifier, title): logged and ignored.
//! - **Default pack unavailable**: returned as an error (fatal).

use crate::config::{seed_default_config, Config, Paths};
use crate::engine::{AlertDecision, AlertEngine, SoundDecision};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::hook::parse_payload;
use crate::pack::PackLibrary;
use crate::state::{HookState, StateGuard, StateStore};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Why an invocation produced no decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// stdin was not a JSON hook payload
    InvalidPayload,
    /// The hook (or notification subtype) is not one we handle
    UnrecognizedEvent,
    /// The event came from a delegate agent session
    AgentSession,
    /// A recoverable fault (e.g. missing pack asset) cancelled the alert
    Degraded,
}

/// Result of a hook invocation
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    NoOp(NoOpReason),
    Dispatched(AlertDecision),
}

/// Runs hook invocations against a data directory and a host.
pub struct HookRunner<'a> {
    paths: Paths,
    host: Host<'a>,
}

impl<'a> HookRunner<'a> {
    pub fn new(paths: Paths, host: Host<'a>) -> Self {
        Self { paths, host }
    }

    /// Handle one hook payload received at `now`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        payload: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<HookOutcome> {
        let config_path = self.paths.config_path();
        if let Err(e) = seed_default_config(&config_path) {
            tracing::warn!(path = %config_path.display(), error = %e, "Failed to seed default config");
        }
        let config = Config::load_or_default(&config_path);

        let event = match parse_payload(payload, now) {
            Ok(event) => event,
            Err(Error::UnrecognizedEventKind(kind)) => {
                tracing::debug!(kind = %kind, "Ignoring unrecognized hook event");
                return Ok(HookOutcome::NoOp(NoOpReason::UnrecognizedEvent));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid hook payload");
                return Ok(HookOutcome::NoOp(NoOpReason::InvalidPayload));
            }
        };

        tracing::info!(
            event = event.kind.as_str(),
            session_id = %event.session_id,
            "Handling hook event"
        );

        let store = StateStore::new(&self.paths);
        let guard = match store.lock() {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!(error = %e, "Continuing without hook state");
                None
            }
        };
        let mut state = match guard.as_ref().map(StateGuard::load) {
            Some(Ok(state)) => Some(state),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Hook state unreadable, continuing without history");
                None
            }
            None => None,
        };

        if event.is_delegate() {
            if let (Some(guard), Some(state)) = (guard.as_ref(), state.as_mut()) {
                if state.add_agent_session(&event.session_id) {
                    save_state(guard, state);
                }
            }
            tracing::debug!(session_id = %event.session_id, "Delegate session, staying silent");
            return Ok(HookOutcome::NoOp(NoOpReason::AgentSession));
        }
        if state
            .as_ref()
            .is_some_and(|state| state.is_agent_session(&event.session_id))
        {
            return Ok(HookOutcome::NoOp(NoOpReason::AgentSession));
        }

        let library = PackLibrary::new(self.paths.pack_roots(), &config.active_pack);
        let engine = AlertEngine::new(&config, &library);
        let result = engine.decide(&event, state.as_mut(), self.host.focus, rng);

        // History and repeat bookkeeping are kept even when the alert fails
        if let Some(guard) = guard.as_ref() {
            save_state(guard, &state.unwrap_or_default());
        }
        drop(guard);

        let decision = match result {
            Ok(decision) => decision,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "Alert degraded to no-op");
                return Ok(HookOutcome::NoOp(NoOpReason::Degraded));
            }
            Err(e) => {
                tracing::error!(error = %e, "Alert failed");
                return Err(e);
            }
        };

        self.dispatch(&decision);
        Ok(HookOutcome::Dispatched(decision))
    }

    fn dispatch(&self, decision: &AlertDecision) {
        if let Err(e) = self.host.title.set_title(&decision.ui.tab_title) {
            tracing::debug!(error = %e, "Failed to set terminal title");
        }

        if let SoundDecision::Play {
            category,
            pack,
            sample,
            volume,
        } = &decision.sound
        {
            if sample.path.is_file() {
                tracing::info!(
                    category = %category,
                    pack = %pack,
                    file = %sample.file,
                    volume,
                    "Playing sample"
                );
                if let Err(e) = self.host.player.play(&sample.path, *volume) {
                    tracing::warn!(path = %sample.path.display(), error = %e, "Audio playback failed");
                }
            } else {
                tracing::warn!(path = %sample.path.display(), "Sample file missing, skipping playback");
            }
        }

        if let Some(notice) = &decision.ui.desktop_notification {
            if let Err(e) = self.host.notifier.notify(&notice.title, &notice.body) {
                tracing::warn!(error = %e, "Desktop notification failed");
            }
        }
    }
}

fn save_state(guard: &StateGuard, state: &HookState) {
    if let Err(e) = guard.save(state) {
        tracing::warn!(error = %e, "Failed to persist hook state");
    }
}
