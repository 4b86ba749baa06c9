use areakit_core::event_bus::{CoalesceScope, Signal};
use areakit_settings::{BusSettings, SettingsError, SettingsManager};
use std::time::Duration;
use tempfile::TempDir;

fn customized() -> BusSettings {
    BusSettings {
        default_coalesce_ms: 80,
        suppress_unnecessary: true,
        coalesce_scope: CoalesceScope::PerHandle,
        disabled_signals: vec![Signal::CaretMoved, Signal::RepaintRequested],
        log_filter: "areakit_core=trace".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_toml_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bus.toml");

    customized().save_to_file(&path).unwrap();
    let loaded = BusSettings::load_from_file(&path).unwrap();
    assert_eq!(loaded, customized());

    let config = loaded.to_bus_config();
    assert_eq!(config.default_coalesce, Duration::from_millis(80));
    assert_eq!(config.coalesce_scope, CoalesceScope::PerHandle);
}

#[test]
fn test_json_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bus.json");

    customized().save_to_file(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"per_handle\""));
    assert!(text.contains("\"caret_moved\""));
    assert_eq!(BusSettings::load_from_file(&path).unwrap(), customized());
}

#[test]
fn test_invalid_file_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bus.toml");
    std::fs::write(&path, "disabled_signals = [\"invoke_later\"]\n").unwrap();

    let err = BusSettings::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Bus(_)));
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bus.toml");
    std::fs::write(&path, "default_coalesce_ms = \"soon\"\n").unwrap();

    assert!(matches!(
        BusSettings::load_from_file(&path),
        Err(SettingsError::TomlParse(_))
    ));
    assert_eq!(
        SettingsManager::load_or_default_from(&path),
        BusSettings::default()
    );
}

#[test]
fn test_saved_settings_start_a_bus() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bus.toml");
    customized().save_to_file(&path).unwrap();

    let settings = SettingsManager::load_or_default_from(&path);
    let ui = areakit_core::ManualScheduler::new();
    let bus = areakit_core::EventBus::with_config(settings.to_bus_config(), std::sync::Arc::new(ui))
        .unwrap();
    assert!(!bus.is_signal_enabled(Signal::CaretMoved));
    assert!(bus.is_signal_enabled(Signal::AreaChanged));
    bus.stop_dispatching();
}
