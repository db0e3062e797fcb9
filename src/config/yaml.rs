use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// livekit:
///   url: "wss://demo.livekit.cloud"
///   api_key: "your-api-key"
///   api_secret: "your-api-secret"
///
/// sip:
///   sip_host: "abc123.sip.livekit.cloud"
///   outbound_trunk_id: "ST_xxxx"
///   switchboard_agent_name: "switchboard"
///   consultation_agent_name: "consultation"
///
/// twilio:
///   account_sid: "ACxxxx"
///   auth_token: "token"
///   phone_number: "+15550001111"
///
/// email:
///   sendgrid_api_key: "SG.xxxx"
///   from_address: "switchboard@example.com"
///   from_name: "Example Switchboard"
///
/// directory:
///   url: "https://project.supabase.co"
///   api_key: "service-role-key"
///   cache_ttl_seconds: 300
///
/// transfer:
///   decision_timeout_seconds: 60
///   attempt_expiry_seconds: 600
///
/// rooms:
///   sweep_interval_seconds: 300
///   inactivity_threshold_seconds: 300
///
/// auth:
///   required: true
///   api_secrets:
///     - id: "voice-worker"
///       secret: "your-api-secret"
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub livekit: Option<LiveKitYaml>,
    pub sip: Option<SipYaml>,
    pub twilio: Option<TwilioYaml>,
    pub email: Option<EmailYaml>,
    pub directory: Option<DirectoryYaml>,
    pub transfer: Option<TransferYaml>,
    pub rooms: Option<RoomsYaml>,
    pub auth: Option<AuthYaml>,
    pub security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LiveKitYaml {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SipYaml {
    pub sip_host: Option<String>,
    pub outbound_trunk_id: Option<String>,
    pub switchboard_agent_name: Option<String>,
    pub consultation_agent_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TwilioYaml {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EmailYaml {
    pub sendgrid_api_key: Option<String>,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DirectoryYaml {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub cache_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TransferYaml {
    pub decision_timeout_seconds: Option<u64>,
    pub attempt_expiry_seconds: Option<u64>,
    pub expiry_sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RoomsYaml {
    pub sweep_interval_seconds: Option<u64>,
    pub inactivity_threshold_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthYaml {
    pub required: Option<bool>,
    /// Preferred multi-secret form. If non-empty, it takes precedence over api_secret.
    #[serde(default)]
    pub api_secrets: Vec<AuthApiSecretYaml>,
    /// Legacy single-secret alias. Ignored when api_secrets is non-empty.
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthApiSecretYaml {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080

livekit:
  url: "wss://demo.livekit.cloud"
  api_key: "lk-key"
  api_secret: "lk-secret"

sip:
  sip_host: "abc.sip.livekit.cloud"
  outbound_trunk_id: "ST_123"

twilio:
  account_sid: "AC123"
  auth_token: "tw-token"
  phone_number: "+15550001111"

email:
  sendgrid_api_key: "SG.key"
  from_address: "desk@example.com"

directory:
  url: "https://project.supabase.co"
  api_key: "dir-key"
  cache_ttl_seconds: 120

transfer:
  decision_timeout_seconds: 30

rooms:
  inactivity_threshold_seconds: 600

auth:
  required: true
  api_secrets:
    - id: "worker"
      secret: "worker-secret"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let livekit = config.livekit.unwrap();
        assert_eq!(livekit.api_key, Some("lk-key".to_string()));

        let sip = config.sip.unwrap();
        assert_eq!(sip.outbound_trunk_id, Some("ST_123".to_string()));
        assert!(sip.switchboard_agent_name.is_none());

        let twilio = config.twilio.unwrap();
        assert_eq!(twilio.phone_number, Some("+15550001111".to_string()));

        let directory = config.directory.unwrap();
        assert_eq!(directory.cache_ttl_seconds, Some(120));

        assert_eq!(config.transfer.unwrap().decision_timeout_seconds, Some(30));
        assert_eq!(
            config.rooms.unwrap().inactivity_threshold_seconds,
            Some(600)
        );

        let auth = config.auth.unwrap();
        assert_eq!(auth.required, Some(true));
        assert_eq!(auth.api_secrets.len(), 1);
        assert_eq!(auth.api_secrets[0].id, "worker");
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.sip.is_none());
        assert!(config.transfer.is_none());
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
