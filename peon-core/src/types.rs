//! Core domain types for peon-ping
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Hook event** | A lifecycle notification emitted by the host agent (session start, prompt submitted, stop, notification) |
//! | **Category** | A CESP sound category (`session.start`, `task.complete`, ...) an event resolves to |
//! | **Pack** | A named collection of samples grouped by category |
//! | **Sample** | One audio file inside a pack |
//! | **Spam window** | Sliding interval used to detect rapid repeated prompting |
//! | **Suppression** | The decision outcome of intentionally not playing any sound |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================
// Sound categories
// ============================================

/// Sound categories defined by the Coding Event Sound Pack Specification.
///
/// The set is closed; category names found in config documents or pack
/// manifests that do not parse into this enum are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoundCategory {
    #[serde(rename = "session.start")]
    SessionStart,
    #[serde(rename = "task.acknowledge")]
    TaskAcknowledge,
    #[serde(rename = "task.complete")]
    TaskComplete,
    #[serde(rename = "input.required")]
    InputRequired,
    #[serde(rename = "user.spam")]
    UserSpam,
}

impl SoundCategory {
    /// Returns the CESP identifier used in configs and manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCategory::SessionStart => "session.start",
            SoundCategory::TaskAcknowledge => "task.acknowledge",
            SoundCategory::TaskComplete => "task.complete",
            SoundCategory::InputRequired => "input.required",
            SoundCategory::UserSpam => "user.spam",
        }
    }

    /// All known categories
    pub fn all() -> &'static [SoundCategory] {
        &[
            SoundCategory::SessionStart,
            SoundCategory::TaskAcknowledge,
            SoundCategory::TaskComplete,
            SoundCategory::InputRequired,
            SoundCategory::UserSpam,
        ]
    }
}

impl std::fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SoundCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SoundCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown sound category: {}", s))
    }
}

// ============================================
// Hook events
// ============================================

/// Lifecycle hook kinds we react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionStart,
    PromptSubmit,
    Stop,
    Notification,
}

impl EventKind {
    /// Returns the hook name as emitted by the host
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionStart => "SessionStart",
            EventKind::PromptSubmit => "UserPromptSubmit",
            EventKind::Stop => "Stop",
            EventKind::Notification => "Notification",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SessionStart" => Ok(EventKind::SessionStart),
            "UserPromptSubmit" => Ok(EventKind::PromptSubmit),
            "Stop" => Ok(EventKind::Stop),
            "Notification" => Ok(EventKind::Notification),
            other => Err(Error::UnrecognizedEventKind(other.to_string())),
        }
    }
}

/// Subtype carried by `Notification` hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A tool is waiting for the human to approve it
    PermissionRequired,
    /// The agent has been idle waiting for the next prompt
    Idle,
}

impl NotificationKind {
    /// Parse the host's `notification_type` field; unknown values yield `None`
    pub fn from_hook(value: &str) -> Option<Self> {
        match value {
            "permission_prompt" => Some(NotificationKind::PermissionRequired),
            "idle_prompt" => Some(NotificationKind::Idle),
            _ => None,
        }
    }
}

/// A single hook invocation, normalized from the host payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HookEvent {
    pub kind: EventKind,
    pub notification: Option<NotificationKind>,
    pub timestamp: DateTime<Utc>,
    /// Host session identifier (empty when not provided)
    pub session_id: String,
    /// Working directory of the agent session
    pub cwd: Option<String>,
    /// Host permission mode (`default`, `plan`, `delegate`, ...)
    pub permission_mode: Option<String>,
}

impl HookEvent {
    /// Build a bare event with no session context
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            notification: None,
            timestamp,
            session_id: String::new(),
            cwd: None,
            permission_mode: None,
        }
    }

    pub fn with_notification(mut self, notification: NotificationKind) -> Self {
        self.notification = Some(notification);
        self
    }

    /// Project label for titles and notifications.
    ///
    /// Basename of `cwd` restricted to alphanumerics and ` ._-`, or `claude`.
    pub fn project_name(&self) -> String {
        let base = self
            .cwd
            .as_deref()
            .and_then(|cwd| std::path::Path::new(cwd).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let cleaned: String = base
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
            .collect();

        if cleaned.is_empty() {
            "claude".to_string()
        } else {
            cleaned
        }
    }

    /// Whether the host launched this session as a delegate agent
    pub fn is_delegate(&self) -> bool {
        self.permission_mode.as_deref() == Some("delegate")
    }
}

// ============================================
// Session status (tab title)
// ============================================

/// Status shown in the terminal tab title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Ready,
    Working,
    Done,
    NeedsApproval,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Ready => "ready",
            SessionStatus::Working => "working",
            SessionStatus::Done => "done",
            SessionStatus::NeedsApproval => "needs approval",
        }
    }

    /// Statuses that want the human's attention get a marker in the title
    pub fn wants_attention(&self) -> bool {
        matches!(self, SessionStatus::Done | SessionStatus::NeedsApproval)
    }
}
