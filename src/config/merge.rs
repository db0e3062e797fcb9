use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{AuthApiSecret, ServerConfig, TlsConfig, env};

/// Replace `target` when the YAML value is present
fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Replace an optional `target` when the YAML value is present
fn apply_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Merge environment configuration with YAML overrides
///
/// The environment (including .env values) forms the base; every value present in
/// the YAML file replaces it.
pub(crate) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        apply(&mut config.host, server.host);
        apply(&mut config.port, server.port);

        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                Some(true) => {
                    let cert_path = tls
                        .cert_path
                        .ok_or("server.tls.enabled requires server.tls.cert_path")?;
                    let key_path = tls
                        .key_path
                        .ok_or("server.tls.enabled requires server.tls.key_path")?;
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert_path),
                        key_path: PathBuf::from(key_path),
                    });
                }
                None => {}
            }
        }
    }

    if let Some(livekit) = yaml.livekit {
        apply(&mut config.livekit_url, livekit.url);
        apply_opt(&mut config.livekit_api_key, livekit.api_key);
        apply_opt(&mut config.livekit_api_secret, livekit.api_secret);
    }

    if let Some(sip) = yaml.sip {
        apply_opt(&mut config.sip.sip_host, sip.sip_host);
        apply_opt(&mut config.sip.outbound_trunk_id, sip.outbound_trunk_id);
        apply(
            &mut config.sip.switchboard_agent_name,
            sip.switchboard_agent_name,
        );
        apply(
            &mut config.sip.consultation_agent_name,
            sip.consultation_agent_name,
        );
    }

    if let Some(twilio) = yaml.twilio {
        apply_opt(&mut config.twilio_account_sid, twilio.account_sid);
        apply_opt(&mut config.twilio_auth_token, twilio.auth_token);
        apply_opt(&mut config.twilio_phone_number, twilio.phone_number);
    }

    if let Some(email) = yaml.email {
        apply_opt(&mut config.sendgrid_api_key, email.sendgrid_api_key);
        apply_opt(&mut config.email_from_address, email.from_address);
        apply(&mut config.email_from_name, email.from_name);
    }

    if let Some(directory) = yaml.directory {
        apply_opt(&mut config.directory_url, directory.url);
        apply_opt(&mut config.directory_api_key, directory.api_key);
        apply(
            &mut config.directory_cache_ttl_seconds,
            directory.cache_ttl_seconds,
        );
    }

    if let Some(transfer) = yaml.transfer {
        apply(
            &mut config.transfer.decision_timeout_seconds,
            transfer.decision_timeout_seconds,
        );
        apply(
            &mut config.transfer.attempt_expiry_seconds,
            transfer.attempt_expiry_seconds,
        );
        apply(
            &mut config.transfer.expiry_sweep_interval_seconds,
            transfer.expiry_sweep_interval_seconds,
        );
    }

    if let Some(rooms) = yaml.rooms {
        apply(
            &mut config.rooms.sweep_interval_seconds,
            rooms.sweep_interval_seconds,
        );
        apply(
            &mut config.rooms.inactivity_threshold_seconds,
            rooms.inactivity_threshold_seconds,
        );
    }

    if let Some(auth) = yaml.auth {
        apply(&mut config.auth_required, auth.required);

        if !auth.api_secrets.is_empty() {
            config.auth_api_secrets = auth
                .api_secrets
                .into_iter()
                .map(|entry| AuthApiSecret {
                    id: entry.id,
                    secret: entry.secret,
                })
                .collect();
        } else if let Some(secret) = auth.api_secret {
            config.auth_api_secrets = vec![AuthApiSecret {
                id: "default".to_string(),
                secret,
            }];
        }
    }

    if let Some(security) = yaml.security {
        apply_opt(
            &mut config.cors_allowed_origins,
            security.cors_allowed_origins,
        );
        apply(
            &mut config.rate_limit_requests_per_second,
            security.rate_limit_requests_per_second,
        );
        apply(
            &mut config.rate_limit_burst_size,
            security.rate_limit_burst_size,
        );
    }

    Ok(config)
}
