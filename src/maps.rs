//! Map script readiness.
//!
//! The checkout page loads the maps JavaScript from the provider. Before the
//! page mounts a map it asks this service whether the script is reachable
//! with the configured key. The check runs once per process: every caller,
//! including concurrent ones, shares the same outcome, and a failure is
//! terminal (no retry).

use std::time::Duration;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum MapsError {
    #[error("maps script request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("maps provider returned {status}{}", detail_suffix(.detail))]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("maps provider returned an empty script")]
    EmptyScript,
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MapReadiness {
    Ready { script_url: String },
    Failed { error: String },
}

pub struct MapsLoader {
    client: reqwest::Client,
    script_url: String,
    readiness: OnceCell<MapReadiness>,
}

impl MapsLoader {
    pub fn new(
        script_base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let script_url = format!(
            "{}?key={}&loading=async",
            script_base_url,
            urlencoding::encode(api_key)
        );
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            script_url,
            readiness: OnceCell::new(),
        })
    }

    /// Resolve the readiness signal, loading the script on first use.
    pub async fn readiness(&self) -> MapReadiness {
        self.readiness.get_or_init(|| self.load()).await.clone()
    }

    async fn load(&self) -> MapReadiness {
        match self.fetch_script().await {
            Ok(()) => {
                info!("Maps script is reachable");
                MapReadiness::Ready {
                    script_url: self.script_url.clone(),
                }
            }
            Err(e) => {
                error!("Maps script failed to load: {}", e);
                MapReadiness::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn fetch_script(&self) -> Result<(), MapsError> {
        let response = self.client.get(&self.script_url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MapsError::Status {
                status,
                detail: body.trim().to_string(),
            });
        }
        if body.trim().is_empty() {
            return Err(MapsError::EmptyScript);
        }
        Ok(())
    }
}
