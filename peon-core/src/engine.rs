//! Alert decision engine.
//!
//! Maps one hook event plus the persisted hook state to an [`AlertDecision`]:
//!
//! 1. **Classify** the event into a [`SoundCategory`]. Prompt submissions go
//!    through the spam detector first.
//! 2. **Advise** UI side effects (tab title, desktop notification). This is
//!    independent of whether the sound plays.
//! 3. **Gate** the category against the pause flag and per-category toggles.
//! 4. **Select** a sample from the pack catalog, avoiding an immediate repeat.
//!
//! The engine does no I/O of its own. The caller loads and saves the state
//! around [`AlertEngine::decide`] and dispatches the decision.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::FocusProbe;
use crate::pack::{Sample, SampleCatalog};
use crate::state::{HookState, PromptHistory};
use crate::types::{EventKind, HookEvent, NotificationKind, SessionStatus, SoundCategory};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Why a sound was not played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// `enabled` is false
    Paused,
    /// The category is switched off in `categories`
    CategoryDisabled,
}

/// Audio half of a decision
#[derive(Debug, Clone, PartialEq)]
pub enum SoundDecision {
    Suppressed {
        category: SoundCategory,
        reason: SuppressReason,
    },
    Play {
        category: SoundCategory,
        pack: String,
        sample: Sample,
        volume: f64,
    },
}

/// Desktop notification content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotice {
    pub title: String,
    pub body: String,
}

/// UI half of a decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiRequest {
    /// Terminal tab title describing the session status
    pub tab_title: String,
    /// Present when the human should be pulled back to the terminal
    pub desktop_notification: Option<DesktopNotice>,
}

/// Outcome for one hook event
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    pub sound: SoundDecision,
    pub ui: UiRequest,
}

impl AlertDecision {
    pub fn category(&self) -> SoundCategory {
        match &self.sound {
            SoundDecision::Suppressed { category, .. } | SoundDecision::Play { category, .. } => {
                *category
            }
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self.sound, SoundDecision::Suppressed { .. })
    }
}

/// Decision engine over a fixed configuration and sample catalog.
pub struct AlertEngine<'a, C: SampleCatalog + ?Sized> {
    config: &'a Config,
    catalog: &'a C,
}

impl<'a, C: SampleCatalog + ?Sized> AlertEngine<'a, C> {
    pub fn new(config: &'a Config, catalog: &'a C) -> Self {
        Self { config, catalog }
    }

    /// Decide what to do for `event`.
    ///
    /// `state` is `None` when the persisted state could not be loaded; spam
    /// detection and repeat avoidance are then skipped for this event.
    ///
    /// Errors: [`Error::UnrecognizedEventKind`] and [`Error::MissingPackAsset`]
    /// are recoverable; [`Error::DefaultPackUnavailable`] is not.
    pub fn decide<R: Rng + ?Sized>(
        &self,
        event: &HookEvent,
        mut state: Option<&mut HookState>,
        focus: &dyn FocusProbe,
        rng: &mut R,
    ) -> Result<AlertDecision> {
        let category = classify(event, || match state.as_deref_mut() {
            Some(state) => {
                detect_spam(&mut state.prompt_timestamps, self.config, event.timestamp)
            }
            None => false,
        })?;

        let ui = advise_ui(event, self.config, focus);

        if let Some(reason) = gate(self.config, category) {
            tracing::debug!(category = %category, ?reason, "Sound suppressed");
            return Ok(AlertDecision {
                sound: SoundDecision::Suppressed { category, reason },
                ui,
            });
        }

        let last = state
            .as_deref()
            .and_then(|state| state.last_played(category))
            .map(str::to_string);
        let (pack, sample) = select_sample(self.catalog, category, last.as_deref(), rng)?;

        if let Some(state) = state {
            state.set_last_played(category, &sample.file);
        }

        Ok(AlertDecision {
            sound: SoundDecision::Play {
                category,
                pack,
                sample,
                volume: self.config.volume,
            },
            ui,
        })
    }
}

/// Map an event to its sound category.
///
/// `is_spam` is consulted only for prompt submissions, so the prompt history
/// is updated exactly when a prompt arrives.
pub fn classify(event: &HookEvent, is_spam: impl FnOnce() -> bool) -> Result<SoundCategory> {
    match (event.kind, event.notification) {
        (EventKind::SessionStart, _) => Ok(SoundCategory::SessionStart),
        (EventKind::PromptSubmit, _) => {
            if is_spam() {
                Ok(SoundCategory::UserSpam)
            } else {
                Ok(SoundCategory::TaskAcknowledge)
            }
        }
        (EventKind::Stop, _) => Ok(SoundCategory::TaskComplete),
        (EventKind::Notification, Some(NotificationKind::PermissionRequired)) => {
            Ok(SoundCategory::InputRequired)
        }
        (EventKind::Notification, Some(NotificationKind::Idle)) => Ok(SoundCategory::TaskComplete),
        (EventKind::Notification, None) => Err(Error::UnrecognizedEventKind(
            "Notification without a known notification_type".to_string(),
        )),
    }
}

/// Record a prompt and report whether it completes a spam burst.
///
/// Threshold and window are read from the current config on every call.
pub fn detect_spam(history: &mut PromptHistory, config: &Config, now: DateTime<Utc>) -> bool {
    let spam = history.record_prompt(
        now,
        config.annoyed_window_seconds,
        config.annoyed_threshold,
    );
    if spam {
        tracing::info!(
            threshold = config.annoyed_threshold,
            window_secs = config.annoyed_window_seconds,
            "Prompt spam detected"
        );
    }
    spam
}

/// Returns the reason to suppress `category`, or `None` if it may play.
pub fn gate(config: &Config, category: SoundCategory) -> Option<SuppressReason> {
    if config.is_paused() {
        Some(SuppressReason::Paused)
    } else if !config.categories.is_enabled(category) {
        Some(SuppressReason::CategoryDisabled)
    } else {
        None
    }
}

/// Pick a sample for `category` uniformly at random.
///
/// The previously played file is left out of the draw when there is
/// anything else to choose from.
pub fn select_sample<C: SampleCatalog + ?Sized, R: Rng + ?Sized>(
    catalog: &C,
    category: SoundCategory,
    last_played: Option<&str>,
    rng: &mut R,
) -> Result<(String, Sample)> {
    let found = catalog.samples_for(category)?;

    let mut pool: Vec<&Sample> = found
        .samples
        .iter()
        .filter(|sample| Some(sample.file.as_str()) != last_played)
        .collect();
    if pool.is_empty() {
        pool = found.samples.iter().collect();
    }

    pool.choose(rng)
        .map(|sample| (found.pack.to_string(), (*sample).clone()))
        .ok_or_else(|| Error::MissingPackAsset {
            pack: found.pack.to_string(),
            category,
        })
}

/// Tab title and, when warranted, a desktop notification for `event`.
///
/// Desktop notifications are raised for permission and idle notifications
/// when they are enabled and no terminal has focus. The pause flag and
/// category toggles play no part here.
pub fn advise_ui(event: &HookEvent, config: &Config, focus: &dyn FocusProbe) -> UiRequest {
    let project = event.project_name();
    let status = session_status(event);
    let marker = if status.wants_attention() { "* " } else { "" };
    let tab_title = format!("{}{}: {}", marker, project, status.as_str());

    let body = match (event.kind, event.notification) {
        (EventKind::Notification, Some(NotificationKind::PermissionRequired)) => {
            Some(format!("{} -- A tool is waiting for your permission", project))
        }
        (EventKind::Notification, Some(NotificationKind::Idle)) => {
            Some(format!("{} -- Ready for your next instruction", project))
        }
        _ => None,
    };

    let desktop_notification = body
        .filter(|_| config.desktop_notifications && !focus.is_terminal_focused())
        .map(|body| DesktopNotice {
            title: tab_title.clone(),
            body,
        });

    UiRequest {
        tab_title,
        desktop_notification,
    }
}

fn session_status(event: &HookEvent) -> SessionStatus {
    match (event.kind, event.notification) {
        (EventKind::SessionStart, _) => SessionStatus::Ready,
        (EventKind::PromptSubmit, _) => SessionStatus::Working,
        (EventKind::Notification, Some(NotificationKind::PermissionRequired)) => {
            SessionStatus::NeedsApproval
        }
        (EventKind::Stop, _) | (EventKind::Notification, _) => SessionStatus::Done,
    }
}
