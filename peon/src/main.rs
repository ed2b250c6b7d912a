//! peon - audio alerts for coding agent lifecycle hooks
//!
//! Run with no subcommand (or `hook`) from the agent's hook configuration:
//! the hook payload is read from stdin, and the binary plays a sample from
//! the active sound pack, updates the terminal tab title and raises a
//! desktop notification when the agent is waiting on the user.
//!
//! User data lives in `~/.claude/peon-ping/` (override with `PEON_PING_HOME`).
//! Logs go to `$XDG_STATE_HOME/peon-ping/peon.log`.

mod platform;

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use peon_core::config::{seed_default_config, LoggingConfig};
use peon_core::host::Host;
use peon_core::{
    Config, HookOutcome, HookRunner, Paths, SoundCategory, SoundDecision, SuppressReason,
};

use crate::platform::{SystemFocusProbe, SystemNotifier, SystemPlayer, TerminalTitle};

#[derive(Parser)]
#[command(name = "peon")]
#[command(about = "Audio alerts for coding agent lifecycle hooks")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one hook payload from stdin (the default)
    Hook,

    /// Mute all sounds
    Pause,

    /// Unmute sounds
    Resume,

    /// Switch between paused and active
    Toggle,

    /// Show whether sounds are active, plus the pack and volume
    Status,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = Paths::from_env();

    match args.command.unwrap_or(Command::Hook) {
        Command::Hook => cmd_hook(paths),
        Command::Pause => cmd_set_enabled(&paths, false),
        Command::Resume => cmd_set_enabled(&paths, true),
        Command::Toggle => cmd_toggle(&paths),
        Command::Status => cmd_status(&paths),
    }
}

/// Handle a hook invocation.
///
/// Only a broken default pack makes this fail; every other fault is logged
/// and the hook exits cleanly so the agent is never interrupted.
fn cmd_hook(paths: Paths) -> Result<()> {
    // The runner loads the full config; only the log level is needed up front.
    // Logging is best-effort here: a read-only state dir must not break the hook
    let logging = LoggingConfig::read_from(&paths.config_path());
    let _log_guard = peon_core::logging::init(&logging).ok();

    let mut payload = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut payload) {
        tracing::warn!(error = %e, "Failed to read hook payload");
        return Ok(());
    }

    let player = SystemPlayer;
    let notifier = SystemNotifier;
    let focus = SystemFocusProbe;
    let title = TerminalTitle;
    let host = Host {
        player: &player,
        notifier: &notifier,
        focus: &focus,
        title: &title,
    };

    let runner = HookRunner::new(paths, host);
    let outcome = runner
        .run(&payload, Utc::now(), &mut rand::thread_rng())
        .context("failed to handle hook event")?;

    if let HookOutcome::Dispatched(decision) = &outcome {
        if matches!(
            decision.sound,
            SoundDecision::Suppressed {
                category: SoundCategory::SessionStart,
                reason: SuppressReason::Paused,
            }
        ) {
            eprintln!("peon-ping: sounds paused -- use 'peon resume' to unpause");
        }
    }

    tracing::debug!(?outcome, "Hook finished");
    Ok(())
}

fn cmd_set_enabled(paths: &Paths, enabled: bool) -> Result<()> {
    let mut config = load_config(paths)?;
    config.enabled = enabled;
    save_config(paths, &config)?;
    print_enabled(enabled);
    Ok(())
}

fn cmd_toggle(paths: &Paths) -> Result<()> {
    let mut config = load_config(paths)?;
    config.enabled = !config.enabled;
    save_config(paths, &config)?;
    print_enabled(config.enabled);
    Ok(())
}

fn cmd_status(paths: &Paths) -> Result<()> {
    let config = load_config(paths)?;
    let state = if config.is_paused() { "paused" } else { "active" };

    println!("peon-ping: {state}");
    println!("  pack: {}  volume: {:?}", config.active_pack, config.volume);
    Ok(())
}

fn print_enabled(enabled: bool) {
    if enabled {
        println!("peon-ping: sounds resumed");
    } else {
        println!("peon-ping: sounds paused");
    }
}

/// Load the config document, seeding it first; a corrupt document is an error.
fn load_config(paths: &Paths) -> Result<Config> {
    let path = paths.config_path();
    seed_default_config(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Config::load_from(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn save_config(paths: &Paths, config: &Config) -> Result<()> {
    let path = paths.config_path();
    config
        .save_to(&path)
        .with_context(|| format!("failed to write {}", path.display()))
}
