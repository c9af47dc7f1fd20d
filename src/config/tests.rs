use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::load_config_from;

const UNSET: Option<&str> = None;

fn missing_file() -> String {
    "config/does-not-exist".to_string()
}

fn clear_optional() -> Vec<(&'static str, Option<&'static str>)> {
    [
        "PULSE_HOST",
        "PULSE_PORT",
        "PULSE_VIRTUAL_HOST",
        "PULSE_USE_SSL",
        "PULSE_CONNECTION_TIMEOUT",
        "PULSE_TREESTATUS_ENABLE",
        "PULSE_TREESTATUS_EXCHANGE",
    ]
    .into_iter()
    .map(|k| (k, UNSET))
    .collect()
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.host, "pulse.mozilla.org");
    assert_eq!(settings.port, 5671);
    assert_eq!(settings.virtual_host, "/");
    assert!(settings.use_ssl);
    assert_eq!(settings.connection_timeout, 5);
    assert!(!settings.treestatus_enable);
    assert_eq!(settings.treestatus_exchange, "exchange/treestatus/v1");
}

#[test]
#[serial]
fn test_credentials_only_falls_back_to_defaults() {
    let mut vars = clear_optional();
    vars.push(("PULSE_USER", Some("treestatus")));
    vars.push(("PULSE_PASSWORD", Some("secret")));

    temp_env::with_vars(vars, || {
        let settings = load_config_from(&missing_file()).expect("load config");
        assert_eq!(settings.user, "treestatus");
        assert_eq!(settings.password, "secret");
        assert_eq!(settings.host, "pulse.mozilla.org");
        assert_eq!(settings.port, 5671);
        assert!(settings.use_ssl);
    });
}

#[test]
#[serial]
fn test_env_overrides_and_coercion() {
    let vars = vec![
        ("PULSE_USER", Some("treestatus")),
        ("PULSE_PASSWORD", Some("12345")),
        ("PULSE_HOST", Some("localhost")),
        ("PULSE_PORT", Some("5672")),
        ("PULSE_VIRTUAL_HOST", Some("/treestatus")),
        ("PULSE_USE_SSL", Some("false")),
        ("PULSE_CONNECTION_TIMEOUT", Some("2")),
        ("PULSE_TREESTATUS_ENABLE", Some("true")),
        ("PULSE_TREESTATUS_EXCHANGE", Some("exchange/treestatus/test")),
    ];

    temp_env::with_vars(vars, || {
        let settings = load_config_from(&missing_file()).expect("load config");
        assert_eq!(settings.password, "12345");
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 5672);
        assert_eq!(settings.virtual_host, "/treestatus");
        assert!(!settings.use_ssl);
        assert_eq!(settings.connection_timeout, 2);
        assert!(settings.treestatus_enable);
        assert_eq!(settings.treestatus_exchange, "exchange/treestatus/test");

        let conn = settings.connection_config();
        assert_eq!(conn.address(), "localhost:5672");
        assert_eq!(conn.virtual_host, "/treestatus");
        assert!(!conn.use_tls);
        assert_eq!(conn.connect_timeout, Duration::from_secs(2));
    });
}

#[test]
#[serial]
fn test_numeric_looking_credentials_are_kept_verbatim() {
    for (user, password) in [("007", "0123"), ("treestatus", "1e3"), ("42", "1.50")] {
        let mut vars = clear_optional();
        vars.push(("PULSE_USER", Some(user)));
        vars.push(("PULSE_PASSWORD", Some(password)));

        temp_env::with_vars(vars, || {
            let settings = load_config_from(&missing_file()).expect("load config");
            assert_eq!(settings.user, user);
            assert_eq!(settings.password, password);

            let conn = settings.connection_config();
            assert_eq!(conn.user, user);
            assert_eq!(conn.password, password);
        });
    }
}

#[test]
#[serial]
fn test_missing_user_is_an_error() {
    let mut vars = clear_optional();
    vars.push(("PULSE_USER", UNSET));
    vars.push(("PULSE_PASSWORD", Some("secret")));

    temp_env::with_vars(vars, || {
        let err = load_config_from(&missing_file()).unwrap_err();
        assert!(err.to_string().contains("PULSE_USER"));
    });
}

#[test]
#[serial]
fn test_missing_password_is_an_error() {
    let mut vars = clear_optional();
    vars.push(("PULSE_USER", Some("treestatus")));
    vars.push(("PULSE_PASSWORD", UNSET));

    temp_env::with_vars(vars, || {
        let err = load_config_from(&missing_file()).unwrap_err();
        assert!(err.to_string().contains("PULSE_PASSWORD"));
    });
}

#[test]
#[serial]
fn test_file_values_are_overridden_by_env() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("pulse.toml");
    let toml = r#"
        host = "pulse.example.com"
        port = 5673
        user = "from-file"
        password = "file-secret"
        use_ssl = false
    "#;
    fs::write(&path, toml).expect("write config file");

    let mut vars = clear_optional();
    vars.push(("PULSE_USER", UNSET));
    vars.push(("PULSE_PASSWORD", UNSET));
    vars.retain(|(k, _)| *k != "PULSE_PORT");
    vars.push(("PULSE_PORT", Some("5674")));

    temp_env::with_vars(vars, || {
        let settings = load_config_from(path.to_str().unwrap()).expect("load config");
        assert_eq!(settings.host, "pulse.example.com");
        assert_eq!(settings.port, 5674);
        assert_eq!(settings.user, "from-file");
        assert_eq!(settings.password, "file-secret");
        assert!(!settings.use_ssl);
    });
}
