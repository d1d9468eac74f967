//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use recup_monitor::config::load_config;
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("RECUP_APPLICATION_LOG_LEVEL");
    std::env::remove_var("RECUP_MONITOR_CYCLE_SECONDS");
    std::env::remove_var("RECUP_MONITOR_PACING_MS");
    std::env::remove_var("RECUP_RECUP_RETRY_MAX_RETRIES");
    std::env::remove_var("RECUP_STORAGE_FALLBACK_DIR");
    std::env::remove_var("RECUP_TELEGRAM_BOT_TOKEN");
    std::env::remove_var("TEST_RECUP_CLIENT_SECRET");
    std::env::remove_var("TEST_RECUP_API_PASSWORD");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(contents.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

const MINIMAL: &str = r#"
[recup]
token_client_id = "client"
token_client_secret = "secret"
api_username = "APPMOBILE"
api_password = "pw"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    let toml_content = r#"
[application]
log_level = "debug"

[recup]
base_url = "https://recup.example.com/gateway"
token_url = "https://auth.example.com/token"
token_client_id = "client"
token_client_secret = "secret"
api_username = "APPMOBILE"
api_password = "pw"
accept_language = "en-GB"
timeout_seconds = 45

[recup.retry]
max_retries = 5
initial_delay_ms = 500
max_delay_ms = 8000
backoff_multiplier = 1.5

[storage]
subscriptions_file = "/var/lib/recup/subscriptions.json"
snapshots_file = "/var/lib/recup/previous.json"
users_file = "/var/lib/recup/users.json"
journal_file = "/var/lib/recup/journal.json"
documents_dir = "/var/lib/recup/documents"
fallback_dir = "/tmp/recup"

[monitor]
cycle_seconds = 600
pacing_ms = 2500
jitter_ms = 500
error_backoff_seconds = 120

[telegram]
bot_token = "123456:ABC"
timeout_seconds = 20

[filter_defaults]
only_new_dates = false
notify_removed = true
min_changes_to_notify = 3
time_threshold_minutes = 30
show_all_current = false
months_limit = 6

[logging]
local_enabled = false
local_path = "/var/log/recup"
local_rotation = "hourly"
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");

    assert_eq!(config.recup.base_url, "https://recup.example.com/gateway");
    assert_eq!(config.recup.token_url, "https://auth.example.com/token");
    assert_eq!(config.recup.accept_language, "en-GB");
    assert_eq!(config.recup.timeout_seconds, 45);
    assert_eq!(config.recup.retry.max_retries, 5);
    assert_eq!(config.recup.retry.backoff_multiplier, 1.5);

    assert_eq!(config.storage.journal_file, "/var/lib/recup/journal.json");
    assert_eq!(config.storage.fallback_dir.as_deref(), Some("/tmp/recup"));

    assert_eq!(config.monitor.cycle_seconds, 600);
    assert_eq!(config.monitor.pacing_ms, 2500);
    assert_eq!(config.monitor.jitter_ms, 500);
    assert_eq!(config.monitor.error_backoff_seconds, 120);

    assert_eq!(
        config
            .telegram
            .bot_token
            .as_ref()
            .map(|t| t.expose_secret().as_ref().to_string()),
        Some("123456:ABC".to_string())
    );
    assert_eq!(config.telegram.timeout_seconds, 20);

    assert!(!config.filter_defaults.only_new_dates);
    assert!(config.filter_defaults.notify_removed);
    assert_eq!(config.filter_defaults.min_changes_to_notify, 3);
    assert_eq!(config.filter_defaults.time_threshold_minutes, 30);
    assert_eq!(config.filter_defaults.months_limit, Some(6));

    assert!(!config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config(MINIMAL);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(
        config.recup.base_url,
        "https://recup-webapi-appmobile.regione.lazio.it"
    );
    assert_eq!(config.recup.timeout_seconds, 30);
    assert_eq!(config.recup.retry.max_retries, 3);
    assert_eq!(config.storage.subscriptions_file, "input_prescriptions.json");
    assert_eq!(config.storage.snapshots_file, "previous_data.json");
    assert_eq!(config.storage.users_file, "authorized_users.json");
    assert_eq!(config.storage.journal_file, "booking_journal.json");
    assert!(config.storage.fallback_dir.is_none());
    assert_eq!(config.monitor.cycle_seconds, 300);
    assert_eq!(config.monitor.pacing_ms, 1000);
    assert_eq!(config.monitor.jitter_ms, 0);
    assert!(config.telegram.bot_token.is_none());
    assert!(config.filter_defaults.only_new_dates);
    assert!(!config.filter_defaults.notify_removed);
    assert_eq!(config.filter_defaults.min_changes_to_notify, 2);
    assert_eq!(config.filter_defaults.time_threshold_minutes, 60);
    assert!(config.filter_defaults.show_all_current);
    assert!(config.filter_defaults.months_limit.is_none());
    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_path, "logs");
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("TEST_RECUP_CLIENT_SECRET", "from-env-secret");
    std::env::set_var("TEST_RECUP_API_PASSWORD", "from-env-password");

    let toml_content = r#"
[recup]
token_client_id = "client"
token_client_secret = "${TEST_RECUP_CLIENT_SECRET}"
api_username = "APPMOBILE"
# api_password = "${NEVER_SET_BECAUSE_COMMENTED}"
api_password = "${TEST_RECUP_API_PASSWORD}"
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(
        config.recup.token_client_secret.expose_secret().as_ref(),
        "from-env-secret"
    );
    assert_eq!(
        config.recup.api_password.expose_secret().as_ref(),
        "from-env-password"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_substitution_variable_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let toml_content = r#"
[recup]
token_client_id = "client"
token_client_secret = "${TEST_RECUP_CLIENT_SECRET}"
api_username = "APPMOBILE"
api_password = "${TEST_RECUP_API_PASSWORD}"
"#;

    let temp_file = write_config(toml_content);
    let err = load_config(temp_file.path()).unwrap_err().to_string();

    assert!(err.contains("TEST_RECUP_CLIENT_SECRET"));
    assert!(err.contains("TEST_RECUP_API_PASSWORD"));
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    std::env::set_var("RECUP_APPLICATION_LOG_LEVEL", "trace");
    std::env::set_var("RECUP_MONITOR_CYCLE_SECONDS", "900");
    std::env::set_var("RECUP_MONITOR_PACING_MS", "not-a-number");
    std::env::set_var("RECUP_RECUP_RETRY_MAX_RETRIES", "1");
    std::env::set_var("RECUP_STORAGE_FALLBACK_DIR", "/srv/recup");
    std::env::set_var("RECUP_TELEGRAM_BOT_TOKEN", "999:XYZ");

    let temp_file = write_config(MINIMAL);
    let config = load_config(temp_file.path()).unwrap();

    assert_eq!(config.application.log_level, "trace");
    assert_eq!(config.monitor.cycle_seconds, 900);
    // Unparseable numeric overrides are ignored
    assert_eq!(config.monitor.pacing_ms, 1000);
    assert_eq!(config.recup.retry.max_retries, 1);
    assert_eq!(config.storage.fallback_dir.as_deref(), Some("/srv/recup"));
    assert!(config.telegram.bot_token.is_some());

    cleanup_env_vars();
}

#[test]
fn test_invalid_config_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let invalid: Vec<String> = vec![
        // Missing booking service credentials
        "[application]\nlog_level = \"info\"\n".to_string(),
        // Bad log level
        format!("[application]\nlog_level = \"verbose\"\n{MINIMAL}"),
        // Two stores on one file
        format!("{MINIMAL}\n[storage]\nsubscriptions_file = \"a.json\"\nsnapshots_file = \"a.json\"\n"),
        // Forced check threshold is not a valid stored default
        format!("{MINIMAL}\n[filter_defaults]\nmin_changes_to_notify = 0\n"),
        // Months limit out of range
        format!("{MINIMAL}\n[filter_defaults]\nmonths_limit = 30\n"),
        // Unknown rotation
        format!("{MINIMAL}\n[logging]\nlocal_rotation = \"size\"\n"),
        // Zero cycle length
        format!("{MINIMAL}\n[monitor]\ncycle_seconds = 0\n"),
        // Non-http base URL
        "[recup]\nbase_url = \"ftp://example.com\"\ntoken_client_id = \"c\"\ntoken_client_secret = \"s\"\napi_username = \"u\"\napi_password = \"p\"\n".to_string(),
    ];

    for contents in &invalid {
        let temp_file = write_config(contents);
        let result = load_config(temp_file.path());
        assert!(result.is_err(), "expected failure for:\n{contents}");
    }
}

#[test]
fn test_missing_file_is_configuration_error() {
    let err = load_config("/nonexistent/recup.toml").unwrap_err();
    assert!(err.to_string().contains("Configuration file not found"));
}
