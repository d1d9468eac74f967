//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::RecupConfig;
use super::secret::{secret_string, secret_string_opt};
use crate::domain::errors::RecupError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into RecupConfig
/// 4. Applies environment variable overrides (RECUP_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use recup_monitor::config::loader::load_config;
///
/// let config = load_config("recup.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<RecupConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(RecupError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        RecupError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text with the same steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<RecupConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: RecupConfig = toml::from_str(&contents)
        .map_err(|e| RecupError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        RecupError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| RecupError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(RecupError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Applies environment variable overrides using RECUP_* prefix
///
/// Environment variables follow the pattern: RECUP_<SECTION>_<KEY>
/// For example: RECUP_RECUP_BASE_URL, RECUP_MONITOR_CYCLE_SECONDS
fn apply_env_overrides(config: &mut RecupConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("RECUP_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Booking service overrides
    if let Ok(val) = std::env::var("RECUP_RECUP_BASE_URL") {
        config.recup.base_url = val;
    }
    if let Ok(val) = std::env::var("RECUP_RECUP_TOKEN_URL") {
        config.recup.token_url = val;
    }
    if let Ok(val) = std::env::var("RECUP_RECUP_TOKEN_CLIENT_ID") {
        config.recup.token_client_id = val;
    }
    if let Ok(val) = std::env::var("RECUP_RECUP_TOKEN_CLIENT_SECRET") {
        config.recup.token_client_secret = secret_string(val);
    }
    if let Ok(val) = std::env::var("RECUP_RECUP_API_USERNAME") {
        config.recup.api_username = val;
    }
    if let Ok(val) = std::env::var("RECUP_RECUP_API_PASSWORD") {
        config.recup.api_password = secret_string(val);
    }
    if let Some(timeout) = env_parse("RECUP_RECUP_TIMEOUT_SECONDS") {
        config.recup.timeout_seconds = timeout;
    }
    if let Some(retries) = env_parse("RECUP_RECUP_RETRY_MAX_RETRIES") {
        config.recup.retry.max_retries = retries;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("RECUP_STORAGE_SUBSCRIPTIONS_FILE") {
        config.storage.subscriptions_file = val;
    }
    if let Ok(val) = std::env::var("RECUP_STORAGE_SNAPSHOTS_FILE") {
        config.storage.snapshots_file = val;
    }
    if let Ok(val) = std::env::var("RECUP_STORAGE_USERS_FILE") {
        config.storage.users_file = val;
    }
    if let Ok(val) = std::env::var("RECUP_STORAGE_JOURNAL_FILE") {
        config.storage.journal_file = val;
    }
    if let Ok(val) = std::env::var("RECUP_STORAGE_DOCUMENTS_DIR") {
        config.storage.documents_dir = val;
    }
    if let Ok(val) = std::env::var("RECUP_STORAGE_FALLBACK_DIR") {
        config.storage.fallback_dir = Some(val);
    }

    // Monitor overrides
    if let Some(cycle) = env_parse("RECUP_MONITOR_CYCLE_SECONDS") {
        config.monitor.cycle_seconds = cycle;
    }
    if let Some(pacing) = env_parse("RECUP_MONITOR_PACING_MS") {
        config.monitor.pacing_ms = pacing;
    }
    if let Some(jitter) = env_parse("RECUP_MONITOR_JITTER_MS") {
        config.monitor.jitter_ms = jitter;
    }

    // Telegram overrides
    if let Ok(val) = std::env::var("RECUP_TELEGRAM_BOT_TOKEN") {
        config.telegram.bot_token = secret_string_opt(Some(val));
    }
    if let Ok(val) = std::env::var("RECUP_TELEGRAM_API_BASE") {
        config.telegram.api_base = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("RECUP_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("RECUP_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("RECUP_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
