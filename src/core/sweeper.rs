use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Background task that runs a job on a fixed interval until stopped
///
/// Used by the call router (idle room sweep) and the transfer orchestrator
/// (attempt expiry). Starting an already running sweeper is a no-op.
#[derive(Default)]
pub struct Sweeper {
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Sweeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Spawn the periodic task; the first run happens one `interval` after start
    pub fn start<F, Fut>(&self, name: &'static str, interval: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock();
        if running.is_some() {
            debug!(sweeper = name, "Sweeper already running");
            return;
        }

        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => job().await,
                }
            }
            debug!(sweeper = name, "Sweeper loop exited");
        });

        info!(sweeper = name, interval_secs = interval.as_secs(), "Sweeper started");
        *running = Some((token, handle));
    }

    /// Stop the task and wait for it to exit
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some((token, handle)) = running {
            token.cancel();
            let _ = handle.await;
            info!("Sweeper stopped");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some((token, _)) = self.running.get_mut().take() {
            token.cancel();
        }
    }
}
