//! Console commands standing in for the mirror's on-screen buttons.

use crate::adapter::ConsoleAdapter;
use crate::error::HologramError;

use common::ErrorLocation;

use mirror_core::context::MirrorContext;
use models::VoiceControl;

use std::panic::Location;
use std::str::FromStr;

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Navigate to a view: `vision`, `voice`, `home`/`menu`.
    ShowView(View),
    Voice(VoiceControl),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Vision,
    Voice,
    Home,
}

impl View {
    /// Name understood by `Store::show_view`.
    pub fn name(&self) -> &'static str {
        match self {
            View::Vision => "vision",
            View::Voice => "voice",
            View::Home => "home",
        }
    }
}

pub const HELP: &str =
    "commands: vision | voice | home | start | stop | status | help | quit";

impl FromStr for Command {
    type Err = HologramError;

    #[track_caller]
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_ascii_lowercase().as_str() {
            "vision" => Ok(Command::ShowView(View::Vision)),
            "voice" => Ok(Command::ShowView(View::Voice)),
            "home" | "menu" | "back" => Ok(Command::ShowView(View::Home)),
            "start" | "listen" => Ok(Command::Voice(VoiceControl::Start)),
            "stop" => Ok(Command::Voice(VoiceControl::Stop)),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(HologramError::UnknownCommand {
                command: other.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Command {
    /// Apply the command. Returns `false` once the console should exit.
    pub fn execute(self, context: &MirrorContext, adapter: &ConsoleAdapter) -> bool {
        match self {
            Command::ShowView(view) => {
                if let Err(e) = context.show_view(view.name()) {
                    warn!("{e}");
                }
            }
            Command::Voice(action) => {
                if !context.send_voice_control(action) {
                    warn!("Voice control not sent; backend is {}", context.store().status());
                }
            }
            Command::Status => {
                let snapshot = context.store().snapshot();
                let screen = adapter.screen();
                info!(
                    "{} | view {} | voice {} | frames {} | waves {} | motions {}",
                    snapshot.status,
                    snapshot.mode,
                    snapshot.voice_state,
                    screen.video_frames,
                    screen.waves,
                    screen.motions
                );
            }
            Command::Help => info!("{HELP}"),
            Command::Quit => return false,
        }
        true
    }
}
