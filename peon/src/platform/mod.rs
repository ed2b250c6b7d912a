//! Platform implementations of the host collaborators.
//!
//! Everything here shells out to tools that ship with the OS (or are
//! commonly installed) and never waits on them, except the focus probe
//! which needs an answer and is bounded by [`PROBE_TIMEOUT`].

mod focus;
mod notify;
mod player;
mod title;

pub use focus::SystemFocusProbe;
pub use notify::SystemNotifier;
pub use player::SystemPlayer;
pub use title::TerminalTitle;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long a helper process may take to answer a query.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Find an executable on `PATH`.
pub fn which(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| executable_in(&dir, program))
}

fn executable_in(dir: &Path, program: &str) -> Option<PathBuf> {
    let candidate = dir.join(program);
    if candidate.is_file() {
        return Some(candidate);
    }
    if cfg!(windows) {
        let exe = dir.join(format!("{program}.exe"));
        if exe.is_file() {
            return Some(exe);
        }
    }
    None
}

fn quiet(command: &mut Command) -> &mut Command {
    command.stdin(Stdio::null()).stderr(Stdio::null());
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

/// Start a helper process and let it run on after we exit.
fn spawn_detached(command: &mut Command) -> io::Result<()> {
    let child = quiet(command).stdout(Stdio::null()).spawn()?;
    tracing::debug!(pid = child.id(), "Spawned helper process");
    Ok(())
}

/// Run a helper and capture its stdout, killing it after `timeout`.
///
/// Returns `None` if the helper can't be started, fails, or times out.
#[cfg_attr(windows, allow(dead_code))]
fn capture_output(command: &mut Command, timeout: Duration) -> Option<String> {
    let mut child = quiet(command).stdout(Stdio::piped()).spawn().ok()?;
    let started = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => break,
            Ok(Some(_)) => return None,
            Ok(None) if started.elapsed() >= timeout => {
                tracing::debug!(?timeout, "Helper process timed out");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(_) => return None,
        }
    }

    let mut output = String::new();
    child.stdout.take()?.read_to_string(&mut output).ok()?;
    Some(output)
}
