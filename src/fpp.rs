//! FPP control-plane client.
//!
//! One job: ask the FPP daemon, over its HTTP API, to put the overlay
//! model into "accept externally written frames" mode so it starts reading
//! our shared region. This is a one-shot side call with no bearing on the
//! streaming data path — if the API is unreachable the bridge logs a note
//! and carries on, since direct shared-memory writes still work once the
//! daemon comes up with the model already enabled.

use serde::Deserialize;
use std::time::Duration;

/// FPP's default API port.
pub const DEFAULT_API_PORT: u16 = 32322;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Subset of `/api/system/status` we care about.
#[derive(Debug, Deserialize)]
pub struct FppStatus {
    pub status_name: Option<String>,
}

pub struct FppClient {
    base_url: String,
    http: reqwest::Client,
}

impl FppClient {
    pub fn new(host: &str, port: u16) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: format!("http://{host}:{port}/api"),
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()?,
        })
    }

    fn status_url(&self) -> String {
        format!("{}/system/status", self.base_url)
    }

    fn overlay_command_url(&self, model_name: &str) -> String {
        format!(
            "{}/command/Pixel%20Overlay%20Model%20State/{}/1",
            self.base_url, model_name
        )
    }

    /// Fetch daemon status; `None` if unreachable or unparseable.
    pub async fn status(&self) -> Option<FppStatus> {
        let response = self.http.get(self.status_url()).send().await.ok()?;
        response.json::<FppStatus>().await.ok()
    }

    /// Ask the daemon to accept externally written frames for `model_name`.
    pub async fn enable_overlay(&self, model_name: &str) -> bool {
        let url = self.overlay_command_url(model_name);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Pixel overlay enabled for {}", model_name);
                true
            }
            Ok(response) => {
                tracing::warn!(
                    "FPP refused overlay enable for {}: HTTP {}",
                    model_name,
                    response.status()
                );
                false
            }
            Err(e) => {
                tracing::warn!("FPP overlay enable failed: {}", e);
                false
            }
        }
    }

    /// Best-effort startup sequence: probe the API, log what we find, and
    /// enable the overlay if the daemon answered. Never fatal.
    pub async fn setup_overlay(&self, model_name: &str) {
        match self.status().await {
            Some(status) => {
                tracing::info!(
                    "FPP status: {}",
                    status.status_name.as_deref().unwrap_or("unknown")
                );
                self.enable_overlay(model_name).await;
            }
            None => {
                tracing::info!(
                    "FPP API not reachable — direct shared-memory writes will still work"
                );
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
