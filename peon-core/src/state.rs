//! Cross-invocation hook state.
//!
//! Every hook runs in a fresh process, so the prompt history used for spam
//! detection (plus a little bookkeeping) is persisted in `.state.json`.
//!
//! Lock strategy:
//! - `.state.lock` is an advisory OS file lock (flock), held while a hook
//!   reads, updates and writes the state.
//! - The state file itself is replaced atomically (temp file + rename), so a
//!   reader never observes a half-written document.
//! - Acquisition waits up to [`LOCK_TIMEOUT`]; callers treat a timeout as a
//!   [`Error::PersistenceFailure`] and continue without history.

use crate::config::Paths;
use crate::error::{Error, Result};
use crate::types::SoundCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a hook waits for another hook to release the state lock.
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(500);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Agent sessions remembered for suppression; oldest are dropped first.
const MAX_AGENT_SESSIONS: usize = 64;

// ============================================
// Prompt history
// ============================================

/// Timestamps of recent `UserPromptSubmit` events.
///
/// Stored on disk as fractional epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct PromptHistory {
    timestamps: Vec<DateTime<Utc>>,
}

impl PromptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Record a prompt at `now` and report whether it completes a spam burst.
    ///
    /// Entries `window_secs` or more older than `now` are evicted before
    /// counting. A burst clears the history so one burst alerts only once.
    pub fn record_prompt(&mut self, now: DateTime<Utc>, window_secs: u64, threshold: u32) -> bool {
        let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);

        self.timestamps
            .retain(|t| now.signed_duration_since(*t).num_milliseconds() < window_ms);
        self.timestamps.push(now);

        if self.timestamps.len() >= threshold as usize {
            self.timestamps.clear();
            true
        } else {
            false
        }
    }
}

impl From<Vec<f64>> for PromptHistory {
    fn from(raw: Vec<f64>) -> Self {
        let timestamps = raw
            .into_iter()
            .filter(|secs| secs.is_finite())
            .filter_map(|secs| DateTime::<Utc>::from_timestamp_millis((secs * 1000.0) as i64))
            .collect();
        Self { timestamps }
    }
}

impl From<PromptHistory> for Vec<f64> {
    fn from(history: PromptHistory) -> Self {
        history
            .timestamps
            .into_iter()
            .map(|t| t.timestamp_millis() as f64 / 1000.0)
            .collect()
    }
}

// ============================================
// Hook state document
// ============================================

/// Everything persisted between hook invocations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookState {
    /// Recent prompt submissions for spam detection
    pub prompt_timestamps: PromptHistory,
    /// Last sample file played per category name, to avoid immediate repeats
    pub last_played: BTreeMap<String, String>,
    /// Host sessions running as delegate agents; these stay silent
    pub agent_sessions: Vec<String>,
}

impl HookState {
    pub fn last_played(&self, category: SoundCategory) -> Option<&str> {
        self.last_played.get(category.as_str()).map(String::as_str)
    }

    pub fn set_last_played(&mut self, category: SoundCategory, file: &str) {
        self.last_played
            .insert(category.as_str().to_string(), file.to_string());
    }

    pub fn is_agent_session(&self, session_id: &str) -> bool {
        !session_id.is_empty() && self.agent_sessions.iter().any(|s| s == session_id)
    }

    /// Remember a delegate session. Returns `false` if it was already known.
    pub fn add_agent_session(&mut self, session_id: &str) -> bool {
        if session_id.is_empty() || self.is_agent_session(session_id) {
            return false;
        }
        self.agent_sessions.push(session_id.to_string());
        if self.agent_sessions.len() > MAX_AGENT_SESSIONS {
            let excess = self.agent_sessions.len() - MAX_AGENT_SESSIONS;
            self.agent_sessions.drain(..excess);
        }
        true
    }
}

// ============================================
// Store
// ============================================

/// Locked access to `.state.json`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StateStore {
    pub fn new(paths: &Paths) -> Self {
        Self {
            path: paths.state_path(),
            lock_path: paths.lock_path(),
        }
    }

    /// Acquire the state lock, waiting up to [`LOCK_TIMEOUT`].
    pub fn lock(&self) -> Result<StateGuard> {
        self.lock_with_timeout(LOCK_TIMEOUT)
    }

    pub fn lock_with_timeout(&self, timeout: Duration) -> Result<StateGuard> {
        let lock = FileLock::acquire(&self.lock_path, timeout).map_err(|e| {
            Error::PersistenceFailure(format!(
                "failed to lock {}: {}",
                self.lock_path.display(),
                e
            ))
        })?;

        Ok(StateGuard {
            path: self.path.clone(),
            _lock: lock,
        })
    }
}

/// Held while reading and writing state; the lock is released on drop.
pub struct StateGuard {
    path: PathBuf,
    _lock: FileLock,
}

impl StateGuard {
    /// Read the state file. A missing file is an empty state.
    pub fn load(&self) -> Result<HookState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HookState::default()),
            Err(e) => {
                return Err(Error::PersistenceFailure(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::PersistenceFailure(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    pub fn save(&self, state: &HookState) -> Result<()> {
        let content = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &content).map_err(|e| {
            Error::PersistenceFailure(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

/// Replace `path` with `contents` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "peon".to_string());
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    Ok(result?)
}

// ============================================
// Advisory file lock
// ============================================

struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path, timeout: Duration) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match lock_file_nonblocking(&file) {
                Ok(()) => return Ok(FileLock { file }),
                Err(e) if is_lock_busy(&e) && Instant::now() < deadline => {
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // The lock file stays on disk; removing it would race with waiters.
        let _ = unlock_file(&self.file);
    }
}

fn is_lock_busy(error: &io::Error) -> bool {
    matches!(error.kind(), io::ErrorKind::WouldBlock)
        || matches!(error.raw_os_error(), Some(11) | Some(35))
}

#[cfg(unix)]
fn lock_file_nonblocking(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    const LOCK_EX: i32 = 2;
    const LOCK_NB: i32 = 4;
    let fd = file.as_raw_fd();
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock_file(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    const LOCK_UN: i32 = 8;
    let fd = file.as_raw_fd();
    // SAFETY: flock is called with a valid file descriptor and constant flags.
    let rc = unsafe { flock(fd, LOCK_UN) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
extern "C" {
    fn flock(fd: i32, operation: i32) -> i32;
}

// Without flock we rely on the atomic rename alone; concurrent hooks may
// then lose a prompt timestamp, which only weakens spam detection.
#[cfg(not(unix))]
fn lock_file_nonblocking(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock_file(_file: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_spam_burst_then_reset() {
        let mut history = PromptHistory::new();
        assert!(!history.record_prompt(at(0), 10, 3));
        assert!(!history.record_prompt(at(2), 10, 3));
        assert!(history.record_prompt(at(4), 10, 3));
        assert!(history.is_empty());
        assert!(!history.record_prompt(at(5), 10, 3));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_old_prompts_are_evicted() {
        let mut history = PromptHistory::new();
        assert!(!history.record_prompt(at(0), 10, 3));
        assert!(!history.record_prompt(at(5), 10, 3));
        // t=0 is exactly one window old and drops out
        assert!(!history.record_prompt(at(10), 10, 3));
        assert_eq!(history.timestamps(), &[at(5), at(10)]);
    }

    #[test]
    fn test_threshold_one_is_always_spam() {
        let mut history = PromptHistory::new();
        for t in 0..5 {
            assert!(history.record_prompt(at(t * 100), 10, 1));
        }
        let mut history = PromptHistory::new();
        assert!(history.record_prompt(at(0), 10, 0));
    }

    #[test]
    fn test_history_serializes_as_epoch_seconds() {
        let mut history = PromptHistory::new();
        history.record_prompt(at(0), 10, 5);
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, "[1700000000.0]");

        let parsed: PromptHistory = serde_json::from_str("[1700000000.25, 1700000001]").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.timestamps()[0].timestamp_millis(), 1_700_000_000_250);
    }

    #[test]
    fn test_agent_sessions_are_capped() {
        let mut state = HookState::default();
        assert!(state.add_agent_session("a"));
        assert!(!state.add_agent_session("a"));
        assert!(!state.add_agent_session(""));
        for i in 0..MAX_AGENT_SESSIONS {
            state.add_agent_session(&format!("s{i}"));
        }
        assert_eq!(state.agent_sessions.len(), MAX_AGENT_SESSIONS);
        assert!(!state.is_agent_session("a"));
        assert!(state.is_agent_session("s63"));
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempdir().unwrap();
        let paths = Paths::new(dir.path().to_path_buf(), None);
        let store = StateStore::new(&paths);

        let guard = store.lock().unwrap();
        let mut state = guard.load().unwrap();
        assert_eq!(state, HookState::default());

        state.prompt_timestamps.record_prompt(at(1), 10, 3);
        state.set_last_played(SoundCategory::TaskComplete, "done.wav");
        guard.save(&state).unwrap();
        drop(guard);

        let guard = store.lock().unwrap();
        assert_eq!(guard.load().unwrap(), state);
    }

    #[test]
    fn test_corrupt_state_is_persistence_failure() {
        let dir = tempdir().unwrap();
        let paths = Paths::new(dir.path().to_path_buf(), None);
        fs::write(paths.state_path(), "{{{").unwrap();

        let guard = StateStore::new(&paths).lock().unwrap();
        assert!(matches!(guard.load(), Err(Error::PersistenceFailure(_))));
    }

    #[test]
    fn test_reads_legacy_state_document() {
        let dir = tempdir().unwrap();
        let paths = Paths::new(dir.path().to_path_buf(), None);
        fs::write(
            paths.state_path(),
            r#"{"prompt_timestamps": [1700000000.5], "last_played": {"task.complete": "a.wav", "task.error": "x.wav"}}"#,
        )
        .unwrap();

        let guard = StateStore::new(&paths).lock().unwrap();
        let state = guard.load().unwrap();
        assert_eq!(state.prompt_timestamps.len(), 1);
        assert_eq!(state.last_played(SoundCategory::TaskComplete), Some("a.wav"));
        assert!(state.agent_sessions.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_second_locker_times_out() {
        let dir = tempdir().unwrap();
        let paths = Paths::new(dir.path().to_path_buf(), None);
        let store = StateStore::new(&paths);

        let _held = store.lock().unwrap();
        let err = store
            .lock_with_timeout(Duration::from_millis(30))
            .err()
            .expect("lock should be busy");
        assert!(matches!(err, Error::PersistenceFailure(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_hooks_keep_every_prompt() {
        const HOOKS: i64 = 8;
        let dir = tempdir().unwrap();
        let paths = Paths::new(dir.path().to_path_buf(), None);

        let handles: Vec<_> = (0..HOOKS)
            .map(|i| {
                let store = StateStore::new(&paths);
                std::thread::spawn(move || {
                    let now = Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap();
                    let guard = store.lock_with_timeout(Duration::from_secs(10)).unwrap();
                    let mut state = guard.load().unwrap();
                    assert!(!state.prompt_timestamps.record_prompt(now, 3600, 1000));
                    guard.save(&state).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let guard = StateStore::new(&paths).lock().unwrap();
        let mut seen: Vec<i64> = guard
            .load()
            .unwrap()
            .prompt_timestamps
            .timestamps()
            .iter()
            .map(|t| t.timestamp() - 1_700_000_000)
            .collect();
        seen.sort();
        assert_eq!(seen, (0..HOOKS).collect::<Vec<_>>());
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/file.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
