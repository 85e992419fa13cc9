#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod app;
mod config;
mod edit;
mod error;
mod form;
mod geometry;
mod intake;
mod raster;
mod slot;
mod widget;
mod worker;

use config::Settings;

/// Capture, rotate and crop identity-document images.
#[derive(Parser, Debug)]
#[command(name = "doc-capture")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> eframe::Result {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("doc_capture={}", cli.log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&config_path);
    if !config_path.exists() {
        // Leave a template next to where it will be looked up
        if let Err(e) = settings.save(&config_path) {
            tracing::warn!(error = %e, "could not write default settings");
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 720.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Doc Capture",
        options,
        Box::new(|cc| Ok(Box::new(app::CaptureApp::new(cc, settings)))),
    )
}
