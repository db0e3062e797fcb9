//! Configuration module for the switchboard gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment configuration
//! - `validation`: Configuration validation logic
//! - `sip`: SIP trunk and agent dispatch settings
//! - `utils`: Helpers for parsing environment values
//!
//! # Example
//! ```rust,no_run
//! use switchboard_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod sip;
mod utils;
mod validation;
mod yaml;

pub use sip::SipConfig;

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// API secret authentication entry with a client identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthApiSecret {
    pub id: String,
    pub secret: String,
}

/// Warm transfer timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// How long the employee has to decide before the attempt counts as declined
    pub decision_timeout_seconds: u64,
    /// Age after which an attempt is dropped from the registry
    pub attempt_expiry_seconds: u64,
    /// Interval of the attempt expiry sweep
    pub expiry_sweep_interval_seconds: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            decision_timeout_seconds: 60,
            attempt_expiry_seconds: 600,
            expiry_sweep_interval_seconds: 60,
        }
    }
}

impl TransferConfig {
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_seconds)
    }

    pub fn attempt_expiry(&self) -> Duration {
        Duration::from_secs(self.attempt_expiry_seconds)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_interval_seconds)
    }
}

/// Call room garbage collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSweepConfig {
    pub sweep_interval_seconds: u64,
    /// Rooms idle for strictly longer than this are removed
    pub inactivity_threshold_seconds: u64,
}

impl Default for RoomSweepConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: 300,
            inactivity_threshold_seconds: 300,
        }
    }
}

impl RoomSweepConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_seconds)
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the switchboard, including:
/// - Server settings (host, port, TLS)
/// - LiveKit credentials and SIP trunk settings
/// - Twilio and SendGrid credentials for notifications
/// - Employee directory connection
/// - Transfer and room sweep timing
/// - Authentication and security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // LiveKit settings
    pub livekit_url: String,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,

    // SIP trunk and agent dispatch
    pub sip: SipConfig,

    // Twilio (SMS and inbound voice webhooks)
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    /// Sender number for outgoing SMS
    pub twilio_phone_number: Option<String>,

    // Email
    pub sendgrid_api_key: Option<String>,
    pub email_from_address: Option<String>,
    pub email_from_name: String,

    // Employee directory (Supabase REST)
    pub directory_url: Option<String>,
    pub directory_api_key: Option<String>,
    pub directory_cache_ttl_seconds: u64,

    // Call handling
    pub transfer: TransferConfig,
    pub rooms: RoomSweepConfig,

    // Authentication configuration
    pub auth_api_secrets: Vec<AuthApiSecret>,
    pub auth_required: bool,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            livekit_url: "ws://localhost:7880".to_string(),
            livekit_api_key: None,
            livekit_api_secret: None,
            sip: SipConfig::default(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_phone_number: None,
            sendgrid_api_key: None,
            email_from_address: None,
            email_from_name: "Switchboard".to_string(),
            directory_url: None,
            directory_api_key: None,
            directory_cache_ttl_seconds: 300,
            transfer: TransferConfig::default(),
            rooms: RoomSweepConfig::default(),
            auth_api_secrets: Vec::new(),
            auth_required: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

/// Zeroize every secret when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.livekit_api_key {
            key.zeroize();
        }
        if let Some(ref mut secret) = self.livekit_api_secret {
            secret.zeroize();
        }
        if let Some(ref mut token) = self.twilio_auth_token {
            token.zeroize();
        }
        if let Some(ref mut key) = self.sendgrid_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.directory_api_key {
            key.zeroize();
        }
        for secret in &mut self.auth_api_secrets {
            secret.secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads every setting from the process environment (the .env file is loaded in
    /// main.rs beforehand), applies defaults and validates the result.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Check if API secret authentication is configured
    pub fn has_api_secret_auth(&self) -> bool {
        !self.auth_api_secrets.is_empty()
    }

    /// LiveKit API key and secret, if both are configured
    pub fn livekit_credentials(&self) -> Option<(String, String)> {
        match (&self.livekit_api_key, &self.livekit_api_secret) {
            (Some(key), Some(secret)) => Some((key.clone(), secret.clone())),
            _ => None,
        }
    }

    /// HTTP base URL of the LiveKit server API
    ///
    /// The configured URL is usually a websocket URL; the server API lives on
    /// the same host over http(s).
    pub fn livekit_http_url(&self) -> String {
        let url = self.livekit_url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = url.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            url.to_string()
        }
    }

    /// Human-readable list of optional integrations that are not configured
    ///
    /// Used at startup to warn about features that will fail on first use.
    pub fn missing_integrations(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.livekit_credentials().is_none() {
            missing.push("LiveKit API credentials (LIVEKIT_API_KEY / LIVEKIT_API_SECRET)");
        }
        if self.sip.outbound_trunk_id.is_none() {
            missing.push("SIP outbound trunk (SIP_OUTBOUND_TRUNK_ID)");
        }
        if self.sip.sip_host.is_none() {
            missing.push("LiveKit SIP host (LIVEKIT_SIP_HOST)");
        }
        if self.twilio_account_sid.is_none()
            || self.twilio_auth_token.is_none()
            || self.twilio_phone_number.is_none()
        {
            missing.push("Twilio SMS (TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN / TWILIO_PHONE_NUMBER)");
        }
        if self.sendgrid_api_key.is_none() || self.email_from_address.is_none() {
            missing.push("SendGrid email (SENDGRID_API_KEY / EMAIL_FROM_ADDRESS)");
        }
        if self.directory_url.is_none() || self.directory_api_key.is_none() {
            missing.push("Employee directory (DIRECTORY_URL / DIRECTORY_API_KEY)");
        }
        missing
    }
}

pub(crate) fn parse_auth_api_secrets_json(
    json_str: &str,
) -> Result<Vec<AuthApiSecret>, Box<dyn std::error::Error>> {
    #[derive(serde::Deserialize)]
    struct AuthApiSecretJson {
        id: String,
        secret: String,
    }

    let secrets: Vec<AuthApiSecretJson> = serde_json::from_str(json_str)
        .map_err(|e| format!("Invalid AUTH_API_SECRETS_JSON format: {e}"))?;

    Ok(secrets
        .into_iter()
        .map(|entry| AuthApiSecret {
            id: entry.id,
            secret: entry.secret,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "localhost".to_string(),
            port: 3001,
            tls: None,
            livekit_url: "ws://localhost:7880".to_string(),
            livekit_api_key: None,
            livekit_api_secret: None,
            sip: SipConfig::default(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_phone_number: None,
            sendgrid_api_key: None,
            email_from_address: None,
            email_from_name: "Switchboard".to_string(),
            directory_url: None,
            directory_api_key: None,
            directory_cache_ttl_seconds: 300,
            transfer: TransferConfig::default(),
            rooms: RoomSweepConfig::default(),
            auth_api_secrets: Vec::new(),
            auth_required: false,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }

    #[test]
    fn test_livekit_http_url() {
        let mut config = test_config();
        assert_eq!(config.livekit_http_url(), "http://localhost:7880");

        config.livekit_url = "wss://demo.livekit.cloud/".to_string();
        assert_eq!(config.livekit_http_url(), "https://demo.livekit.cloud");

        config.livekit_url = "https://demo.livekit.cloud".to_string();
        assert_eq!(config.livekit_http_url(), "https://demo.livekit.cloud");
    }

    #[test]
    fn test_livekit_credentials_require_both() {
        let mut config = test_config();
        config.livekit_api_key = Some("key".to_string());
        assert!(config.livekit_credentials().is_none());

        config.livekit_api_secret = Some("secret".to_string());
        assert_eq!(
            config.livekit_credentials(),
            Some(("key".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_missing_integrations() {
        let mut config = test_config();
        assert_eq!(config.missing_integrations().len(), 6);

        config.livekit_api_key = Some("key".to_string());
        config.livekit_api_secret = Some("secret".to_string());
        config.sip.outbound_trunk_id = Some("ST_abc".to_string());
        config.sip.sip_host = Some("abc.sip.livekit.cloud".to_string());
        assert_eq!(config.missing_integrations().len(), 3);
    }

    #[test]
    fn test_transfer_defaults() {
        let config = test_config();
        assert_eq!(config.transfer.decision_timeout(), Duration::from_secs(60));
        assert_eq!(config.transfer.attempt_expiry(), Duration::from_secs(600));
        assert_eq!(config.rooms.sweep_interval(), Duration::from_secs(300));
        assert_eq!(
            config.rooms.inactivity_threshold(),
            Duration::from_secs(300)
        );
    }

    fn cleanup_env_vars() {
        unsafe {
            env::remove_var("HOST");
            env::remove_var("PORT");
            env::remove_var("LIVEKIT_URL");
            env::remove_var("LIVEKIT_API_KEY");
            env::remove_var("LIVEKIT_API_SECRET");
            env::remove_var("SIP_OUTBOUND_TRUNK_ID");
            env::remove_var("TWILIO_ACCOUNT_SID");
            env::remove_var("DIRECTORY_URL");
            env::remove_var("TRANSFER_DECISION_TIMEOUT_SECONDS");
            env::remove_var("AUTH_REQUIRED");
            env::remove_var("AUTH_API_SECRETS_JSON");
            env::remove_var("AUTH_API_SECRET");
            env::remove_var("AUTH_API_SECRET_ID");
        }
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

sip:
  outbound_trunk_id: "ST_yaml"
  sip_host: "yaml.sip.livekit.cloud"

transfer:
  decision_timeout_seconds: 45
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.sip.outbound_trunk_id, Some("ST_yaml".to_string()));
        assert_eq!(
            config.sip.sip_host,
            Some("yaml.sip.livekit.cloud".to_string())
        );
        assert_eq!(config.transfer.decision_timeout_seconds, 45);
        assert_eq!(config.transfer.attempt_expiry_seconds, 600);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"

sip:
  outbound_trunk_id: "ST_yaml"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("PORT", "4000");
            env::set_var("SIP_OUTBOUND_TRUNK_ID", "ST_env");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.sip.outbound_trunk_id, Some("ST_yaml".to_string()));
        // ENV value survives where YAML is silent
        assert_eq!(config.port, 4000);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_auth_required_without_secrets_fails() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "auth:\n  required: true\n").unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("AUTH_REQUIRED"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_timeout() {
        cleanup_env_vars();

        unsafe {
            env::set_var("TRANSFER_DECISION_TIMEOUT_SECONDS", "soon");
        }

        let result = ServerConfig::from_env();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("TRANSFER_DECISION_TIMEOUT_SECONDS")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_single_api_secret() {
        cleanup_env_vars();

        unsafe {
            env::set_var("AUTH_REQUIRED", "true");
            env::set_var("AUTH_API_SECRET", "s3cret");
        }

        let config = ServerConfig::from_env().unwrap();
        assert!(config.auth_required);
        assert_eq!(config.auth_api_secrets.len(), 1);
        assert_eq!(config.auth_api_secrets[0].id, "default");

        cleanup_env_vars();
    }
}
