//! Interfaces to the host machine.
//!
//! The decision engine never touches audio devices, windows or the terminal
//! itself; the binary supplies implementations of these traits and tests
//! supply recording fakes.

use std::io;
use std::path::Path;

/// Plays an audio file at a volume between 0.0 and 1.0.
pub trait AudioPlayer {
    fn play(&self, path: &Path, volume: f64) -> io::Result<()>;
}

/// Shows a native desktop notification.
pub trait DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> io::Result<()>;
}

/// Reports whether a terminal window currently has focus.
///
/// Probing can be slow (it may spawn a helper process), so the engine only
/// asks when a desktop notification is actually on the table.
pub trait FocusProbe {
    fn is_terminal_focused(&self) -> bool;
}

/// Sets the terminal tab title.
pub trait TitleWriter {
    fn set_title(&self, title: &str) -> io::Result<()>;
}

/// Everything a hook invocation may do to the outside world.
pub struct Host<'a> {
    pub player: &'a dyn AudioPlayer,
    pub notifier: &'a dyn DesktopNotifier,
    pub focus: &'a dyn FocusProbe,
    pub title: &'a dyn TitleWriter,
}

/// Fixed focus answer, for hosts where focus can't be determined.
#[derive(Debug, Clone, Copy)]
pub struct StaticFocus(pub bool);

impl FocusProbe for StaticFocus {
    fn is_terminal_focused(&self) -> bool {
        self.0
    }
}
