#![cfg_attr(not(target_os = "windows"), forbid(unsafe_code))]

mod config;
mod constants;
mod dispatcher;
mod engine;
mod groups;
mod hotkeys;
mod platform;
mod types;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::Settings;
use dispatcher::Dispatcher;
use engine::TransformEngine;
use groups::GroupRegistry;
use hotkeys::spawn_listener;
use platform::WindowSystem;
use ui::UiEvent;

/// Organize windows into hotkey-addressable groups and toggle per-window
/// transforms (always on top, show only, transparency) on them.
#[derive(Parser, Debug)]
#[command(name = "wingroup", version)]
struct Cli {
    /// Path to the config file (default: the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Starting alpha for newly transparent windows (30-255)
    #[arg(long)]
    alpha: Option<u8>,

    /// Make transparent windows click-through by default
    #[arg(long)]
    click_through: bool,

    /// List manageable windows and exit
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // CLI flag wins over the environment variable
    let log_level = match cli
        .log_level
        .clone()
        .or_else(|| std::env::var("LOG_LEVEL").ok())
        .unwrap_or_else(|| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    #[cfg(target_os = "windows")]
    {
        run(&platform::Win32Windows, cli)?;
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = cli;
        Err("wingroup manages Win32 windows and only runs on Windows".into())
    }
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn run(ws: &dyn WindowSystem, cli: Cli) -> Result<()> {
    if cli.list {
        for (handle, title) in ws.enumerate() {
            match ws.rect(handle) {
                Some(r) => println!("{handle}\t{}x{}\t{title}", r.width(), r.height()),
                None => println!("{handle}\t-\t{title}"),
            }
        }
        return Ok(());
    }

    let path = config::config_path(cli.config.clone());
    let settings = Settings::load(&path);
    info!(path = %path.display(), "config loaded");

    let mut registry = GroupRegistry::new(settings, path);
    let (ui_tx, ui_rx) = mpsc::channel();
    let mut engine = TransformEngine::new(ui_tx);
    if let Some(alpha) = cli.alpha {
        engine.set_default_alpha(ws, alpha);
    }
    if cli.click_through {
        engine.set_default_clickthrough(ws, true);
    }
    let mut dispatcher = Dispatcher::new();

    let (hotkey_tx, hotkey_rx) = mpsc::channel();
    let listener = match spawn_listener(&registry.settings().hotkeys, hotkey_tx) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to start hotkey listener");
            return Err(e);
        }
    };

    info!("wingroup running, press Ctrl+Alt+<digit> then an action key");

    // Hotkey events drive everything; each one may emit UI events which are
    // drained right after so notices land next to the action that caused them.
    while let Ok(event) = hotkey_rx.recv() {
        dispatcher.handle(ws, &mut registry, &mut engine, event);
        for ui in ui_rx.try_iter() {
            match ui {
                UiEvent::Notice(text) => info!(notice = %text),
                UiEvent::CreateOverlay(target) => {
                    info!(window = %target, "transparency overlay requested");
                }
                UiEvent::DestroyOverlay(target) => {
                    info!(window = %target, "transparency overlay dismissed");
                }
                UiEvent::OpenGroupManager(preselect) => {
                    info!(?preselect, "group manager requested");
                }
                UiEvent::PromptGroup(group) => {
                    info!(name = %registry.group_name(group), "group armed, press an action key");
                }
            }
        }
    }

    warn!("hotkey listener channel closed, shutting down");
    listener.shutdown();
    Ok(())
}
