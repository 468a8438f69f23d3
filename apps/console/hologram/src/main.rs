use hologram::adapter::ConsoleAdapter;
use hologram::command::{Command, HELP};
use hologram::error::HologramError;
use hologram::logger::initialize as LoggerInitialize;

use mirror_core::config::ClientConfig;
use mirror_core::context::MirrorContext;
use mirror_core::error::CoreError;

use common::ErrorLocation;

use std::env::args_os;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader, stdin};
use tokio::signal::ctrl_c;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HologramError> {
    // Optional first argument overrides the config (and log) directory.
    let config_dir = match args_os().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => ClientConfig::default_dir()?,
    };

    create_dir_all(&config_dir).map_err(|e| HologramError::Hologram {
        message: format!(
            "Failed to create config directory {}: {e}",
            config_dir.display()
        ),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&config_dir)?;

    info!("Hologram console starting");
    info!("Config directory: {}", config_dir.display());

    let config =
        ClientConfig::load(&config_dir)?.with_endpoint_override(ClientConfig::endpoint_from_env());
    config.validate()?;

    let context = MirrorContext::new(&config)?;
    let adapter = ConsoleAdapter::attach(&context);
    context.start();

    if let Some(view) = &config.initial_view {
        context.show_view(view).map_err(CoreError::from)?;
    }

    info!("{HELP}");
    let mut lines = BufReader::new(stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {e}");
                }
                info!("Interrupted");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(command) => {
                        if !command.execute(&context, &adapter) {
                            break;
                        }
                    }
                    Err(e) => warn!("{e}; {HELP}"),
                },
                Ok(None) => {
                    info!("stdin closed; running until Ctrl-C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    context.shutdown();
    info!("Hologram console stopped");
    Ok(())
}
