use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::agents::SwitchboardAgent;
use crate::core::directory::{CachedDirectory, DirectoryClient, SupabaseDirectory};
use crate::core::notify::{EmailSender, SendGridEmail, SmsSender, TwilioSms};
use crate::core::platform::MediaPlatform;
use crate::core::router::CallRouter;
use crate::core::session::SessionLauncher;
use crate::core::transfer::WarmTransferOrchestrator;
use crate::livekit::{AgentDispatchLauncher, LiveKitApi, LiveKitPlatform, WebhookVerifier};

/// External collaborators injected into the application
pub struct Services {
    pub directory: Arc<dyn DirectoryClient>,
    pub sms: Arc<dyn SmsSender>,
    pub email: Arc<dyn EmailSender>,
    pub platform: Arc<dyn MediaPlatform>,
    pub launcher: Arc<dyn SessionLauncher>,
}

impl Services {
    /// Production services built from configuration
    ///
    /// Missing credentials do not fail here; each client reports
    /// `NotConfigured` when first used.
    pub fn from_config(config: &ServerConfig) -> Self {
        let livekit = LiveKitApi::from_credentials(
            &config.livekit_http_url(),
            config.livekit_credentials(),
        );

        let directory = Arc::new(SupabaseDirectory::new(
            config.directory_url.clone(),
            config.directory_api_key.clone(),
        ));

        Self {
            directory: Arc::new(CachedDirectory::new(
                directory,
                Duration::from_secs(config.directory_cache_ttl_seconds),
            )),
            sms: Arc::new(TwilioSms::new(
                config.twilio_account_sid.clone(),
                config.twilio_auth_token.clone(),
                config.twilio_phone_number.clone(),
            )),
            email: Arc::new(SendGridEmail::new(
                config.sendgrid_api_key.clone(),
                config.email_from_address.clone(),
                config.email_from_name.clone(),
            )),
            platform: Arc::new(LiveKitPlatform::new(
                livekit.clone(),
                config.sip.outbound_trunk_id.clone(),
            )),
            launcher: Arc::new(AgentDispatchLauncher::new(livekit, &config.sip)),
        }
    }
}

/// Application state shared across all request handlers
pub struct AppState {
    pub config: ServerConfig,
    pub router: Arc<CallRouter>,
    pub directory: Arc<dyn DirectoryClient>,
    pub launcher: Arc<dyn SessionLauncher>,
    pub transfers: Arc<WarmTransferOrchestrator>,
    pub switchboard: Arc<SwitchboardAgent>,
    pub webhooks: WebhookVerifier,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let missing = config.missing_integrations();
        if !missing.is_empty() {
            warn!(
                missing = ?missing,
                "Some integrations are not configured; related features will fail when used"
            );
        }
        let services = Services::from_config(&config);
        Self::with_services(config, services)
    }

    pub fn with_services(config: ServerConfig, services: Services) -> Arc<Self> {
        let router = Arc::new(CallRouter::new(config.rooms.clone()));
        let transfers = Arc::new(WarmTransferOrchestrator::new(
            services.platform,
            services.launcher.clone(),
            router.clone(),
            config.transfer.clone(),
        ));
        let switchboard = Arc::new(SwitchboardAgent::new(
            services.directory.clone(),
            services.sms,
            services.email,
            router.clone(),
            transfers.clone(),
        ));
        let webhooks = WebhookVerifier::new(config.livekit_credentials());

        Arc::new(Self {
            config,
            router,
            directory: services.directory,
            launcher: services.launcher,
            transfers,
            switchboard,
            webhooks,
        })
    }

    /// Start the room and transfer sweepers
    pub fn start_background_tasks(&self) {
        self.router.start_sweeper();
        self.transfers.start_expiry_sweep();
        info!("Background sweepers started");
    }

    pub async fn stop_background_tasks(&self) {
        self.router.stop_sweeper().await;
        self.transfers.stop_expiry_sweep().await;
        info!("Background sweepers stopped");
    }
}
