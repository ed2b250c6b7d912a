//! Hook payload parsing
//!
//! The host pipes one JSON object per hook invocation on stdin:
//!
//! ```json
//! {"hook_event_name": "Notification", "notification_type": "permission_prompt",
//!  "session_id": "abc", "cwd": "/home/me/project", "permission_mode": "default"}
//! ```
//!
//! Missing fields default to empty; only `hook_event_name` is required to
//! produce an event.

use crate::error::{Error, Result};
use crate::types::{EventKind, HookEvent, NotificationKind};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawHookPayload {
    hook_event_name: Option<String>,
    notification_type: Option<String>,
    session_id: Option<String>,
    cwd: Option<String>,
    permission_mode: Option<String>,
}

/// Parse a hook payload received at `now`.
///
/// Fails with [`Error::Json`] for malformed input and
/// [`Error::UnrecognizedEventKind`] for hooks we don't handle.
pub fn parse_payload(input: &str, now: DateTime<Utc>) -> Result<HookEvent> {
    let raw: RawHookPayload = serde_json::from_str(input)?;

    let name = raw.hook_event_name.unwrap_or_default();
    let kind: EventKind = name.parse()?;

    let notification = match kind {
        EventKind::Notification => raw
            .notification_type
            .as_deref()
            .and_then(NotificationKind::from_hook),
        _ => None,
    };

    if kind == EventKind::Notification && notification.is_none() {
        return Err(Error::UnrecognizedEventKind(format!(
            "Notification/{}",
            raw.notification_type.unwrap_or_default()
        )));
    }

    Ok(HookEvent {
        kind,
        notification,
        timestamp: now,
        session_id: raw.session_id.unwrap_or_default(),
        cwd: raw.cwd.filter(|cwd| !cwd.is_empty()),
        permission_mode: raw.permission_mode.filter(|mode| !mode.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permission_notification() {
        let now = Utc::now();
        let event = parse_payload(
            r#"{"hook_event_name": "Notification", "notification_type": "permission_prompt",
                "session_id": "s-1", "cwd": "/work/api", "permission_mode": "default",
                "transcript_path": "/tmp/t.jsonl"}"#,
            now,
        )
        .unwrap();

        assert_eq!(event.kind, EventKind::Notification);
        assert_eq!(event.notification, Some(NotificationKind::PermissionRequired));
        assert_eq!(event.timestamp, now);
        assert_eq!(event.session_id, "s-1");
        assert_eq!(event.cwd.as_deref(), Some("/work/api"));
        assert!(!event.is_delegate());
    }

    #[test]
    fn test_parse_minimal_payload() {
        let event = parse_payload(r#"{"hook_event_name": "Stop"}"#, Utc::now()).unwrap();
        assert_eq!(event.kind, EventKind::Stop);
        assert_eq!(event.notification, None);
        assert!(event.session_id.is_empty());
        assert!(event.cwd.is_none());
    }

    #[test]
    fn test_notification_type_ignored_for_other_events() {
        let event = parse_payload(
            r#"{"hook_event_name": "Stop", "notification_type": "idle_prompt"}"#,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(event.notification, None);
    }

    #[test]
    fn test_delegate_mode() {
        let event = parse_payload(
            r#"{"hook_event_name": "Stop", "permission_mode": "delegate", "session_id": "agent"}"#,
            Utc::now(),
        )
        .unwrap();
        assert!(event.is_delegate());
    }

    #[test]
    fn test_unrecognized_payloads() {
        let now = Utc::now();
        for input in [
            r#"{"hook_event_name": "PreToolUse"}"#,
            r#"{}"#,
            r#"{"hook_event_name": "Notification", "notification_type": "auth_success"}"#,
            r#"{"hook_event_name": "Notification"}"#,
        ] {
            let err = parse_payload(input, now).unwrap_err();
            assert!(
                matches!(err, Error::UnrecognizedEventKind(_)),
                "{input} gave {err:?}"
            );
        }

        assert!(matches!(parse_payload("", now), Err(Error::Json(_))));
        assert!(matches!(parse_payload("[1, 2]", now), Err(Error::Json(_))));
    }
}
