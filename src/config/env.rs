use std::path::PathBuf;

use super::utils::{env_bool, env_opt, env_parse};
use super::{
    AuthApiSecret, RoomSweepConfig, ServerConfig, SipConfig, TlsConfig, TransferConfig,
    parse_auth_api_secrets_json,
};

/// Build a [`ServerConfig`] from environment variables and defaults
///
/// Recognised variables:
/// - `HOST`, `PORT`, `TLS_ENABLED`, `TLS_CERT_PATH`, `TLS_KEY_PATH`
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`
/// - `LIVEKIT_SIP_HOST`, `SIP_OUTBOUND_TRUNK_ID`, `SWITCHBOARD_AGENT_NAME`, `CONSULTATION_AGENT_NAME`
/// - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_PHONE_NUMBER`
/// - `SENDGRID_API_KEY`, `EMAIL_FROM_ADDRESS`, `EMAIL_FROM_NAME`
/// - `DIRECTORY_URL`, `DIRECTORY_API_KEY`, `DIRECTORY_CACHE_TTL_SECONDS`
/// - `TRANSFER_DECISION_TIMEOUT_SECONDS`, `TRANSFER_EXPIRY_SECONDS`, `TRANSFER_SWEEP_INTERVAL_SECONDS`
/// - `ROOM_SWEEP_INTERVAL_SECONDS`, `ROOM_INACTIVITY_SECONDS`
/// - `AUTH_REQUIRED`, `AUTH_API_SECRETS_JSON`, `AUTH_API_SECRET`, `AUTH_API_SECRET_ID`
/// - `CORS_ALLOWED_ORIGINS`, `RATE_LIMIT_REQUESTS_PER_SECOND`, `RATE_LIMIT_BURST_SIZE`
pub(crate) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let host = env_opt("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = env_parse("PORT", 3001u16)?;

    let tls = if env_bool("TLS_ENABLED", false)? {
        let cert_path = env_opt("TLS_CERT_PATH")
            .ok_or("TLS_ENABLED=true requires TLS_CERT_PATH")?;
        let key_path = env_opt("TLS_KEY_PATH").ok_or("TLS_ENABLED=true requires TLS_KEY_PATH")?;
        Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        })
    } else {
        None
    };

    let defaults = SipConfig::default();
    let sip = SipConfig {
        sip_host: env_opt("LIVEKIT_SIP_HOST"),
        outbound_trunk_id: env_opt("SIP_OUTBOUND_TRUNK_ID"),
        switchboard_agent_name: env_opt("SWITCHBOARD_AGENT_NAME")
            .unwrap_or(defaults.switchboard_agent_name),
        consultation_agent_name: env_opt("CONSULTATION_AGENT_NAME")
            .unwrap_or(defaults.consultation_agent_name),
    };

    let transfer_defaults = TransferConfig::default();
    let transfer = TransferConfig {
        decision_timeout_seconds: env_parse(
            "TRANSFER_DECISION_TIMEOUT_SECONDS",
            transfer_defaults.decision_timeout_seconds,
        )?,
        attempt_expiry_seconds: env_parse(
            "TRANSFER_EXPIRY_SECONDS",
            transfer_defaults.attempt_expiry_seconds,
        )?,
        expiry_sweep_interval_seconds: env_parse(
            "TRANSFER_SWEEP_INTERVAL_SECONDS",
            transfer_defaults.expiry_sweep_interval_seconds,
        )?,
    };

    let room_defaults = RoomSweepConfig::default();
    let rooms = RoomSweepConfig {
        sweep_interval_seconds: env_parse(
            "ROOM_SWEEP_INTERVAL_SECONDS",
            room_defaults.sweep_interval_seconds,
        )?,
        inactivity_threshold_seconds: env_parse(
            "ROOM_INACTIVITY_SECONDS",
            room_defaults.inactivity_threshold_seconds,
        )?,
    };

    Ok(ServerConfig {
        host,
        port,
        tls,
        livekit_url: env_opt("LIVEKIT_URL").unwrap_or_else(|| "ws://localhost:7880".to_string()),
        livekit_api_key: env_opt("LIVEKIT_API_KEY"),
        livekit_api_secret: env_opt("LIVEKIT_API_SECRET"),
        sip,
        twilio_account_sid: env_opt("TWILIO_ACCOUNT_SID"),
        twilio_auth_token: env_opt("TWILIO_AUTH_TOKEN"),
        twilio_phone_number: env_opt("TWILIO_PHONE_NUMBER"),
        sendgrid_api_key: env_opt("SENDGRID_API_KEY"),
        email_from_address: env_opt("EMAIL_FROM_ADDRESS"),
        email_from_name: env_opt("EMAIL_FROM_NAME").unwrap_or_else(|| "Switchboard".to_string()),
        directory_url: env_opt("DIRECTORY_URL"),
        directory_api_key: env_opt("DIRECTORY_API_KEY"),
        directory_cache_ttl_seconds: env_parse("DIRECTORY_CACHE_TTL_SECONDS", 300u64)?,
        transfer,
        rooms,
        auth_api_secrets: load_auth_api_secrets()?,
        auth_required: env_bool("AUTH_REQUIRED", false)?,
        cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: env_parse("RATE_LIMIT_REQUESTS_PER_SECOND", 60u32)?,
        rate_limit_burst_size: env_parse("RATE_LIMIT_BURST_SIZE", 10u32)?,
    })
}

/// API secrets from `AUTH_API_SECRETS_JSON`, or the legacy single-secret variables
fn load_auth_api_secrets() -> Result<Vec<AuthApiSecret>, Box<dyn std::error::Error>> {
    if let Some(json) = env_opt("AUTH_API_SECRETS_JSON") {
        return parse_auth_api_secrets_json(&json);
    }

    Ok(env_opt("AUTH_API_SECRET")
        .map(|secret| {
            vec![AuthApiSecret {
                id: env_opt("AUTH_API_SECRET_ID").unwrap_or_else(|| "default".to_string()),
                secret,
            }]
        })
        .unwrap_or_default())
}
