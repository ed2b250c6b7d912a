//! Configuration loading and management
//!
//! User data lives in `~/.claude/peon-ping/` (override with `PEON_PING_HOME`):
//! - Config: `config.json`, seeded verbatim from the bundled default on first run
//! - State: `.state.json` plus its lock file `.state.lock`
//! - User-installed packs: `packs/<name>/openpeon.json`
//!
//! Bundled packs are looked up under `$CLAUDE_PLUGIN_ROOT/packs/` first.
//! Logs follow XDG and go to `$XDG_STATE_HOME/peon-ping/` (~/.local/state/peon-ping/).

use crate::error::{Error, Result};
use crate::types::SoundCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The bundled default configuration document, copied verbatim on first run.
pub const DEFAULT_CONFIG: &str = include_str!("../assets/config.default.json");

/// Name of the pack shipped with the plugin; the fallback for every lookup.
pub const DEFAULT_PACK: &str = "peon";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

// ============================================
// Config document
// ============================================

/// User configuration, stored as `config.json`.
///
/// Every key has a default so partial documents load. Keys we don't know
/// about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Pack whose samples are played
    #[serde(default = "default_active_pack")]
    pub active_pack: String,

    /// Playback volume, 0.0 to 1.0
    #[serde(default = "default_volume")]
    pub volume: f64,

    /// Global switch; `false` means paused
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Show desktop notifications when the terminal is not focused
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,

    /// Per-category enable flags; absent categories are enabled
    #[serde(default)]
    pub categories: CategoryToggles,

    /// Prompts within the window needed to count as spam
    #[serde(default = "default_annoyed_threshold")]
    pub annoyed_threshold: u32,

    /// Length of the spam window in seconds
    #[serde(default = "default_annoyed_window")]
    pub annoyed_window_seconds: u64,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "LoggingConfig::is_default")]
    pub logging: LoggingConfig,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_active_pack() -> String {
    DEFAULT_PACK.to_string()
}

fn default_volume() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_annoyed_threshold() -> u32 {
    3
}

fn default_annoyed_window() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_pack: default_active_pack(),
            volume: default_volume(),
            enabled: true,
            desktop_notifications: true,
            categories: CategoryToggles::all_enabled(),
            annoyed_threshold: default_annoyed_threshold(),
            annoyed_window_seconds: default_annoyed_window(),
            logging: LoggingConfig::default(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Per-category enable flags.
///
/// Serialized as a flat `{"task.complete": true, ...}` object. Names outside
/// the known category set are retained for round-tripping but never consulted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, bool>",
    into = "BTreeMap<String, bool>"
)]
pub struct CategoryToggles {
    known: BTreeMap<SoundCategory, bool>,
    unknown: BTreeMap<String, bool>,
}

impl CategoryToggles {
    /// Explicitly enable every known category
    pub fn all_enabled() -> Self {
        Self {
            known: SoundCategory::all().iter().map(|c| (*c, true)).collect(),
            unknown: BTreeMap::new(),
        }
    }

    /// Absent categories are treated as enabled.
    pub fn is_enabled(&self, category: SoundCategory) -> bool {
        self.known.get(&category).copied().unwrap_or(true)
    }

    pub fn set(&mut self, category: SoundCategory, enabled: bool) {
        self.known.insert(category, enabled);
    }

    /// Category names present in the document that we don't recognize
    pub fn unknown_names(&self) -> impl Iterator<Item = &str> {
        self.unknown.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, bool>> for CategoryToggles {
    fn from(raw: BTreeMap<String, bool>) -> Self {
        let mut toggles = CategoryToggles::default();
        for (name, enabled) in raw {
            match name.parse::<SoundCategory>() {
                Ok(category) => {
                    toggles.known.insert(category, enabled);
                }
                Err(_) => {
                    toggles.unknown.insert(name, enabled);
                }
            }
        }
        toggles
    }
}

impl From<CategoryToggles> for BTreeMap<String, bool> {
    fn from(toggles: CategoryToggles) -> Self {
        let mut raw = toggles.unknown;
        raw.extend(
            toggles
                .known
                .into_iter()
                .map(|(category, enabled)| (category.as_str().to_string(), enabled)),
        );
        raw
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    fn is_default(&self) -> bool {
        *self == LoggingConfig::default()
    }

    /// Read only the `logging` key of the config document at `path`.
    ///
    /// Logging has to start before the full document is loaded, so any
    /// problem here quietly yields defaults; the full load reports it.
    pub fn read_from(path: &Path) -> Self {
        #[derive(Deserialize)]
        struct LoggingOnly {
            #[serde(default)]
            logging: LoggingConfig,
        }

        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<LoggingOnly>(&content).ok())
            .map(|doc| doc.logging)
            .unwrap_or_default()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse a config document, then clamp out-of-range values.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(content).map_err(|e| Error::ConfigCorrupt(e.to_string()))?;
        config.sanitize();
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file yields defaults; an unreadable or unparsable one is
    /// reported as [`Error::ConfigCorrupt`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigCorrupt(format!("failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_json(&content)
    }

    /// Load configuration for a hook invocation.
    ///
    /// Hooks must never fail on a broken config, so corruption falls back to
    /// built-in defaults for this run.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Falling back to default config");
                Config::default()
            }
        }
    }

    /// Write the config back as pretty JSON, replacing the file atomically.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        crate::state::write_atomic(path, content.as_bytes())
    }

    /// Whether sounds are globally paused
    pub fn is_paused(&self) -> bool {
        !self.enabled
    }

    fn sanitize(&mut self) {
        if !self.volume.is_finite() {
            tracing::warn!(volume = self.volume, "Invalid volume, using default");
            self.volume = default_volume();
        } else if !(0.0..=1.0).contains(&self.volume) {
            tracing::warn!(volume = self.volume, "Volume out of range, clamping");
            self.volume = self.volume.clamp(0.0, 1.0);
        }

        if self.annoyed_window_seconds == 0 {
            tracing::warn!("annoyed_window_seconds must be at least 1");
            self.annoyed_window_seconds = 1;
        }

        for name in self.categories.unknown_names() {
            tracing::warn!(category = name, "Ignoring unknown sound category in config");
        }
    }
}

/// Write the bundled default config if none exists yet.
///
/// Returns `true` when the file was created.
pub fn seed_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    crate::state::write_atomic(path, DEFAULT_CONFIG.as_bytes())?;
    tracing::info!(path = %path.display(), "Seeded default config");
    Ok(true)
}

// ============================================
// Paths
// ============================================

/// Filesystem locations used by a hook invocation.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Mutable user data (config, state, user packs)
    pub data_dir: PathBuf,
    /// Plugin install root holding bundled packs
    pub plugin_root: Option<PathBuf>,
}

impl Paths {
    /// Resolve paths from the environment.
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os("PEON_PING_HOME")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir().join(".claude").join("peon-ping"));

        let plugin_root = std::env::var_os("CLAUDE_PLUGIN_ROOT")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(plugin_root_from_exe);

        Self {
            data_dir,
            plugin_root,
        }
    }

    /// Paths rooted at explicit directories (for testing).
    pub fn new(data_dir: PathBuf, plugin_root: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            plugin_root,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(".state.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(".state.lock")
    }

    /// Directories searched for packs, in priority order
    pub fn pack_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(root) = &self.plugin_root {
            roots.push(root.join("packs"));
        }
        roots.push(self.data_dir.join("packs"));
        roots
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/peon-ping/` (~/.local/state/peon-ping/)
    pub fn log_dir() -> PathBuf {
        xdg_state_home().join("peon-ping")
    }
}

/// The binary is installed as `<plugin>/bin/peon`; walk up looking for `packs/`.
fn plugin_root_from_exe() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.ancestors()
        .skip(1)
        .take(2)
        .find(|dir| dir.join("packs").is_dir())
        .map(Path::to_path_buf)
}
