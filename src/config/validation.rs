use std::collections::HashSet;

use super::{AuthApiSecret, ServerConfig};

/// Run every validation rule against a loaded configuration
pub(crate) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_auth_api_secrets(&config.auth_api_secrets)?;
    validate_auth_required(config.auth_required, &config.auth_api_secrets)?;
    validate_livekit_credentials(&config.livekit_api_key, &config.livekit_api_secret)?;
    validate_timings(config)?;
    validate_directory_url(&config.directory_url)?;
    Ok(())
}

pub(crate) fn validate_auth_api_secrets(
    secrets: &[AuthApiSecret],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut seen = HashSet::new();
    for entry in secrets {
        if entry.id.trim().is_empty() {
            return Err("Auth API secret entries require a non-empty id".into());
        }
        if entry.secret.is_empty() {
            return Err(format!("Auth API secret '{}' has an empty secret", entry.id).into());
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(format!("Duplicate auth API secret id '{}'", entry.id).into());
        }
    }
    Ok(())
}

pub(crate) fn validate_auth_required(
    auth_required: bool,
    secrets: &[AuthApiSecret],
) -> Result<(), Box<dyn std::error::Error>> {
    if auth_required && secrets.is_empty() {
        return Err(
            "AUTH_REQUIRED=true requires AUTH_API_SECRETS_JSON or AUTH_API_SECRET to be set"
                .into(),
        );
    }
    Ok(())
}

pub(crate) fn validate_livekit_credentials(
    api_key: &Option<String>,
    api_secret: &Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    match (api_key, api_secret) {
        (Some(_), None) => Err("LIVEKIT_API_KEY is set but LIVEKIT_API_SECRET is missing".into()),
        (None, Some(_)) => Err("LIVEKIT_API_SECRET is set but LIVEKIT_API_KEY is missing".into()),
        _ => Ok(()),
    }
}

fn validate_timings(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let checks = [
        (
            "transfer.decision_timeout_seconds",
            config.transfer.decision_timeout_seconds,
        ),
        (
            "transfer.attempt_expiry_seconds",
            config.transfer.attempt_expiry_seconds,
        ),
        (
            "transfer.expiry_sweep_interval_seconds",
            config.transfer.expiry_sweep_interval_seconds,
        ),
        (
            "rooms.sweep_interval_seconds",
            config.rooms.sweep_interval_seconds,
        ),
    ];
    for (name, value) in checks {
        if value == 0 {
            return Err(format!("{name} must be greater than zero").into());
        }
    }

    if config.transfer.attempt_expiry_seconds <= config.transfer.decision_timeout_seconds {
        return Err(
            "transfer.attempt_expiry_seconds must be longer than transfer.decision_timeout_seconds"
                .into(),
        );
    }
    Ok(())
}

fn validate_directory_url(url: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(url) = url {
        let parsed = url::Url::parse(url).map_err(|e| format!("Invalid DIRECTORY_URL '{url}': {e}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("DIRECTORY_URL must use http or https, got '{}'", parsed.scheme()).into());
        }
    }
    Ok(())
}
