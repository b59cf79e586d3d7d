use super::load_config;
use super::settings::Settings;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.broker.max_line_length, 65536);
    assert_eq!(settings.logging.level, "info");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    let cfg = temp_env::with_vars_unset(
        ["WHISPER__LOGGING__LEVEL", "WHISPER__BROKER__MAX_LINE_LENGTH"],
        load_config,
    );

    env::set_current_dir(orig).expect("restore cwd");
    assert_eq!(cfg.expect("load_config failed"), Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    // load_config reads config/default.toml relative to the cwd
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [broker]
        max_line_length = 128

        [logging]
        level = "debug"
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = temp_env::with_vars_unset(
        ["WHISPER__LOGGING__LEVEL", "WHISPER__BROKER__MAX_LINE_LENGTH"],
        load_config,
    );

    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.broker.max_line_length, 128);
    assert_eq!(cfg.logging.level, "debug");
}

#[test]
#[serial]
fn environment_overrides_single_field() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    let cfg = temp_env::with_vars(
        [
            ("WHISPER__LOGGING__LEVEL", Some("trace")),
            ("WHISPER__BROKER__MAX_LINE_LENGTH", None),
        ],
        load_config,
    );

    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.logging.level, "trace");
    assert_eq!(cfg.broker.max_line_length, 65536);
}
