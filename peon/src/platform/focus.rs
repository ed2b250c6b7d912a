use peon_core::host::FocusProbe;

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
const MACOS_TERMINALS: &[&str] = &[
    "terminal", "iterm", "wezterm", "alacritty", "kitty", "hyper", "tabby",
];

#[cfg_attr(any(target_os = "macos", windows), allow(dead_code))]
const LINUX_TERMINALS: &[&str] = &[
    "terminal",
    "konsole",
    "xterm",
    "alacritty",
    "kitty",
    "wezterm",
    "tilix",
    "terminator",
    "gnome-terminal",
];

#[cfg_attr(not(windows), allow(dead_code))]
const WINDOWS_TERMINALS: &[&str] = &[
    "windows terminal",
    "command prompt",
    "powershell",
    "pwsh",
    "cmd.exe",
    "wezterm",
    "alacritty",
    "kitty",
    "mintty",
    "conemu",
    "cmder",
    "hyper",
    "tabby",
];

/// Asks the window system whether a terminal is frontmost.
///
/// Any failure to find out counts as "not focused", so the user still gets
/// the notification.
#[derive(Debug, Default)]
pub struct SystemFocusProbe;

impl FocusProbe for SystemFocusProbe {
    fn is_terminal_focused(&self) -> bool {
        let focused = match foreground_window() {
            Some((name, keywords)) => is_terminal(&name, keywords),
            None => false,
        };
        tracing::debug!(focused, "Probed terminal focus");
        focused
    }
}

fn is_terminal(window: &str, keywords: &[&str]) -> bool {
    let window = window.trim().to_lowercase();
    !window.is_empty() && keywords.iter().any(|keyword| window.contains(keyword))
}

#[cfg(target_os = "macos")]
fn foreground_window() -> Option<(String, &'static [&'static str])> {
    use super::{capture_output, PROBE_TIMEOUT};
    use std::process::Command;

    let name = capture_output(
        Command::new("osascript").args([
            "-e",
            "tell application \"System Events\" to get name of \
             first application process whose frontmost is true",
        ]),
        PROBE_TIMEOUT,
    )?;
    Some((name, MACOS_TERMINALS))
}

#[cfg(windows)]
fn foreground_window() -> Option<(String, &'static [&'static str])> {
    use std::ffi::c_int;

    #[link(name = "user32")]
    extern "system" {
        fn GetForegroundWindow() -> isize;
        fn GetWindowTextLengthW(hwnd: isize) -> c_int;
        fn GetWindowTextW(hwnd: isize, text: *mut u16, max_count: c_int) -> c_int;
    }

    // SAFETY: the buffer is sized from GetWindowTextLengthW plus the
    // terminating NUL, and the handle is only passed back to user32.
    let title = unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd == 0 {
            return None;
        }
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return None;
        }
        let mut buf = vec![0u16; len as usize + 1];
        let copied = GetWindowTextW(hwnd, buf.as_mut_ptr(), buf.len() as c_int);
        String::from_utf16_lossy(&buf[..copied.max(0) as usize])
    };
    Some((title, WINDOWS_TERMINALS))
}

#[cfg(not(any(target_os = "macos", windows)))]
fn foreground_window() -> Option<(String, &'static [&'static str])> {
    use super::{capture_output, PROBE_TIMEOUT};
    use std::process::Command;

    let name = capture_output(
        Command::new("xdotool").args(["getactivewindow", "getwindowname"]),
        PROBE_TIMEOUT,
    )?;
    Some((name, LINUX_TERMINALS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macos_terminals() {
        assert!(is_terminal("iTerm2\n", MACOS_TERMINALS));
        assert!(is_terminal("Terminal", MACOS_TERMINALS));
        assert!(!is_terminal("Safari", MACOS_TERMINALS));
    }

    #[test]
    fn test_linux_window_titles() {
        assert!(is_terminal("me@box: ~/api - Konsole", LINUX_TERMINALS));
        assert!(is_terminal("* api: done - Alacritty", LINUX_TERMINALS));
        assert!(!is_terminal("Inbox - Mozilla Firefox", LINUX_TERMINALS));
        assert!(!is_terminal("", LINUX_TERMINALS));
    }

    #[test]
    fn test_windows_window_titles() {
        assert!(is_terminal("Administrator: Windows PowerShell", WINDOWS_TERMINALS));
        assert!(is_terminal("C:\\WINDOWS\\system32\\cmd.exe", WINDOWS_TERMINALS));
        assert!(!is_terminal("Visual Studio Code", WINDOWS_TERMINALS));
    }
}
