//! Pedalboard - drag pedals and patch cables, hear the chain live.

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;
use pedalboard_config::{Settings, settings_path};
use pedalboard_core::BoardSettings;
use pedalboard_gui::{PedalboardApp, StreamOptions};

/// Pedalboard GUI application.
#[derive(Parser, Debug)]
#[command(name = "pedalboard")]
#[command(about = "Virtual guitar pedalboard with patch cables")]
#[command(version)]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input audio device name, or `keyboard` for the tone source
    #[arg(long)]
    input: Option<String>,

    /// Output audio device name (optional, uses default if not specified)
    #[arg(long)]
    output: Option<String>,

    /// Sample rate in Hz (overrides the settings file)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Buffer size in samples (overrides the settings file)
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    save_config: bool,
}

/// Loads the settings file, falling back to defaults when it is unusable.
fn load_settings(path: &std::path::Path) -> Settings {
    match Settings::load_or_default(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "ignoring settings file");
            Settings::default()
        }
    }
}

fn main() -> eframe::Result<()> {
    use tracing_subscriber::EnvFilter;

    // Initialize tracing subscriber; bridge legacy log:: calls from eframe/egui
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    tracing_log::LogTracer::init().ok();

    let args = Args::parse();

    let path = args.config.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings(&path);
    if let Some(rate) = args.sample_rate {
        settings.audio.sample_rate = rate;
    }
    if let Some(size) = args.buffer_size {
        settings.audio.buffer_size = size;
    }

    if args.save_config {
        match settings.save(&path) {
            Ok(()) => tracing::info!(path = %path.display(), "settings written"),
            Err(e) => tracing::error!(error = %e, "could not write settings"),
        }
        return Ok(());
    }

    let board_settings = match settings.to_board_settings() {
        Ok(board) => board,
        Err(e) => {
            tracing::error!(error = %e, "invalid settings, using defaults");
            settings = Settings::default();
            BoardSettings::default()
        }
    };
    let options = StreamOptions {
        output_device: args.output,
        input_device: args.input,
        sample_rate: settings.audio.sample_rate,
        buffer_size: settings.audio.buffer_size,
    };

    tracing::info!("Starting Pedalboard");
    tracing::info!(
        sample_rate = options.sample_rate,
        buffer_size = options.buffer_size,
        "audio config"
    );
    if let Some(ref input) = options.input_device {
        tracing::info!(device = %input, "input device");
    }
    if let Some(ref output) = options.output_device {
        tracing::info!(device = %output, "output device");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 650.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("Pedalboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Pedalboard",
        native_options,
        Box::new(move |cc| Ok(Box::new(PedalboardApp::new(cc, board_settings, options)))),
    )
}
