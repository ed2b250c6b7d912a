use super::{spawn_detached, which};
use peon_core::host::AudioPlayer;
use std::io;
use std::path::Path;
use std::process::Command;

/// Plays samples through the first available command-line player.
///
/// macOS uses `afplay`. Elsewhere `ffplay` is preferred for its volume
/// control, then PulseAudio/PipeWire/ALSA on Linux and `Media.SoundPlayer`
/// on Windows (WAV only, no volume).
#[derive(Debug, Default)]
pub struct SystemPlayer;

impl AudioPlayer for SystemPlayer {
    fn play(&self, path: &Path, volume: f64) -> io::Result<()> {
        let mut command = player_command(path, volume).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no audio player available")
        })?;
        spawn_detached(&mut command)
    }
}

fn player_command(path: &Path, volume: f64) -> Option<Command> {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("afplay");
        command.arg("-v").arg(volume.to_string()).arg(path);
        return Some(command);
    }

    if let Some(ffplay) = which("ffplay") {
        let mut command = Command::new(ffplay);
        command
            .args(["-nodisp", "-autoexit", "-loglevel", "quiet", "-volume"])
            .arg(ffplay_volume(volume).to_string())
            .arg(path);
        return Some(command);
    }

    if cfg!(target_os = "linux") {
        for player in ["paplay", "pw-play", "aplay"] {
            if let Some(exe) = which(player) {
                let mut command = Command::new(exe);
                if player == "aplay" {
                    command.arg("-q");
                }
                command.arg(path);
                return Some(command);
            }
        }
    }

    if cfg!(windows) && is_wav(path) {
        let script = format!(
            "(New-Object Media.SoundPlayer '{}').PlaySync()",
            path.display().to_string().replace('\'', "''")
        );
        let mut command = Command::new("powershell");
        command.args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", &script]);
        return Some(command);
    }

    None
}

/// ffplay takes volume as an integer percentage.
fn ffplay_volume(volume: f64) -> u8 {
    (volume * 100.0).clamp(0.0, 100.0) as u8
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffplay_volume() {
        assert_eq!(ffplay_volume(0.5), 50);
        assert_eq!(ffplay_volume(0.0), 0);
        assert_eq!(ffplay_volume(1.0), 100);
        assert_eq!(ffplay_volume(0.333), 33);
        assert_eq!(ffplay_volume(2.0), 100);
        assert_eq!(ffplay_volume(-1.0), 0);
    }

    #[test]
    fn test_is_wav() {
        assert!(is_wav(Path::new("packs/peon/sounds/ready.wav")));
        assert!(is_wav(Path::new("READY.WAV")));
        assert!(!is_wav(Path::new("ready.mp3")));
        assert!(!is_wav(Path::new("wav")));
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_afplay_command() {
        let command = player_command(Path::new("/tmp/ready.wav"), 0.25).unwrap();
        assert_eq!(command.get_program(), "afplay");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["-v", "0.25", "/tmp/ready.wav"]);
    }
}
