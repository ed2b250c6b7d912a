//! Error types for peon-core

use thiserror::Error;

use crate::types::SoundCategory;

/// Main error type for the peon-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Hook event name (or notification subtype) we have no mapping for
    #[error("unrecognized event kind: {0}")]
    UnrecognizedEventKind(String),

    /// The pack has no samples registered for a category
    #[error("pack '{pack}' has no samples for category {category}")]
    MissingPackAsset {
        pack: String,
        category: SoundCategory,
    },

    /// Configuration document could not be parsed
    #[error("configuration is corrupt: {0}")]
    ConfigCorrupt(String),

    /// State file could not be read, written or locked
    #[error("state persistence failed: {0}")]
    PersistenceFailure(String),

    /// The bundled default pack could not be loaded
    #[error("default pack '{pack}' is unavailable: {message}")]
    DefaultPackUnavailable { pack: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the hook can degrade to a silent no-op instead of failing.
    ///
    /// Only a broken default pack is fatal: there is nothing left to fall back to.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::DefaultPackUnavailable { .. })
    }
}

/// Result type alias for peon-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_default_pack_is_fatal() {
        assert!(Error::UnrecognizedEventKind("PreToolUse".into()).is_recoverable());
        assert!(Error::MissingPackAsset {
            pack: "peon".into(),
            category: SoundCategory::UserSpam,
        }
        .is_recoverable());
        assert!(Error::ConfigCorrupt("eof".into()).is_recoverable());
        assert!(Error::PersistenceFailure("locked".into()).is_recoverable());
        assert!(!Error::DefaultPackUnavailable {
            pack: "peon".into(),
            message: "missing manifest".into(),
        }
        .is_recoverable());
    }

    #[test]
    fn test_missing_asset_message_names_category() {
        let err = Error::MissingPackAsset {
            pack: "glados".into(),
            category: SoundCategory::InputRequired,
        };
        assert_eq!(
            err.to_string(),
            "pack 'glados' has no samples for category input.required"
        );
    }
}
