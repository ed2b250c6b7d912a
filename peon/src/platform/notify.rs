use super::{spawn_detached, which};
use peon_core::host::DesktopNotifier;
use std::io;
use std::process::Command;

/// Native desktop notifications: `osascript` on macOS, a PowerShell balloon
/// tip on Windows and `notify-send` on Linux.
#[derive(Debug, Default)]
pub struct SystemNotifier;

impl DesktopNotifier for SystemNotifier {
    fn notify(&self, title: &str, body: &str) -> io::Result<()> {
        let mut command = notify_command(title, body).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no notification helper available")
        })?;
        spawn_detached(&mut command)
    }
}

fn notify_command(title: &str, body: &str) -> Option<Command> {
    if cfg!(target_os = "macos") {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            applescript_escape(body),
            applescript_escape(title)
        );
        let mut command = Command::new("osascript");
        command.arg("-e").arg(script);
        return Some(command);
    }

    if cfg!(windows) {
        let mut command = Command::new("powershell");
        command.args([
            "-NoProfile",
            "-ExecutionPolicy",
            "Bypass",
            "-Command",
            &balloon_script(title, body),
        ]);
        return Some(command);
    }

    let exe = which("notify-send")?;
    let mut command = Command::new(exe);
    command.args(["--app-name", "peon-ping", title, body]);
    Some(command)
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn powershell_escape(text: &str) -> String {
    text.replace('\'', "''")
}

fn balloon_script(title: &str, body: &str) -> String {
    format!(
        "Add-Type -AssemblyName System.Windows.Forms;\
         $n = New-Object System.Windows.Forms.NotifyIcon;\
         $n.Icon = [System.Drawing.SystemIcons]::Information;\
         $n.BalloonTipTitle = '{}';\
         $n.BalloonTipText = '{}';\
         $n.Visible = $true;\
         $n.ShowBalloonTip(5000);\
         Start-Sleep -Seconds 6;\
         $n.Dispose()",
        powershell_escape(title),
        powershell_escape(body)
    )
}
