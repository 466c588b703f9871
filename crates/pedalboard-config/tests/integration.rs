//! Integration tests for pedalboard-config.
//!
//! File round trips go through a temporary directory; the loaded settings are
//! then used to build a live board.

use pedalboard_config::{ConfigError, Settings, TieBreakRule, ValidationError};
use pedalboard_core::{AudioGraph, Board, PedalKind, TieBreak};
use tempfile::TempDir;

#[test]
fn save_then_load_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("settings.toml");

    let mut settings = Settings::default();
    settings.interaction.tie_break = TieBreakRule::Nearest;
    settings.pedals.volume_gain = 0.5;
    settings.save(&path).expect("save should create parent directories");

    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    assert!(Settings::load(&path).unwrap_err().is_not_found());
    assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
}

#[test]
fn malformed_file_is_not_silently_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.toml");
    std::fs::write(&path, "[interaction\nsnap_threshold = ").unwrap();

    let err = Settings::load_or_default(&path).unwrap_err();
    assert!(matches!(err, ConfigError::TomlParse(_)), "got: {err}");
}

#[test]
fn hand_edited_file_drives_the_starter_board() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &path,
        r##"
[interaction]
snap_threshold = 45.0
tie_break = "nearest"

[pedals]
oscillator_frequency = 220.0

[pedals.colors]
oscillator = "#ff00ff"
"##,
    )
    .unwrap();

    let board_settings = Settings::load(&path).unwrap().to_board_settings().unwrap();
    assert_eq!(board_settings.snap_threshold, 45.0);
    assert_eq!(board_settings.tie_break, TieBreak::Nearest);

    let mut ctx = AudioGraph::new(48000.0);
    let board = Board::starter(board_settings, &mut ctx).unwrap();
    let (_, oscillator) = board.pedals().next().unwrap();
    assert_eq!(oscillator.kind(), &PedalKind::Oscillator { frequency: 220.0 });
    assert_eq!(oscillator.color().to_hex(), "#ff00ff");
}

#[test]
fn out_of_range_values_are_reported_together() {
    let settings = Settings::from_toml(
        r#"
[interaction]
snap_threshold = -5.0

[audio]
sample_rate = 1000
"#,
    )
    .unwrap();

    let err = settings.validate().unwrap_err();
    let ConfigError::Validation(ValidationError::Multiple(errors)) = &err else {
        panic!("expected multiple validation errors, got {err}");
    };
    assert_eq!(errors.len(), 2);
}
