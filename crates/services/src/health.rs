use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use toolbridge_core::BridgeConfig;
use tracing::{debug, warn};

pub const SMARTBERT_SERVICE: &str = "SmartBERT API";
pub const WEB3_SEKIT_SERVICE: &str = "web3-sekit API";

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub service_name: &'static str,
    pub url: String,
    pub reachable: bool,
    /// JSON body returned by the service, when it sent one.
    pub detail: Option<Value>,
    pub error: Option<String>,
}

impl ServiceStatus {
    /// `model` field of the JSON detail, if the service reported one.
    pub fn model(&self) -> Option<&str> {
        self.detail.as_ref()?.get("model")?.as_str()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScannerPresence {
    pub path: PathBuf,
    pub present: bool,
}

/// Outcome of one status check. Every probe is always present.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub smartbert: ServiceStatus,
    pub web3_sekit: ServiceStatus,
    pub scanner: ScannerPresence,
}

impl StatusReport {
    pub fn all_healthy(&self) -> bool {
        self.smartbert.reachable && self.web3_sekit.reachable && self.scanner.present
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "web3se-lab Service Status:")?;

        for status in [&self.smartbert, &self.web3_sekit] {
            if status.reachable {
                writeln!(f, "✅ {}: Running at {}", status.service_name, status.url)?;
                let has_object = status.detail.as_ref().is_some_and(Value::is_object);
                if status.service_name == SMARTBERT_SERVICE && has_object {
                    writeln!(f, "   Model: {}", status.model().unwrap_or("unknown"))?;
                }
            } else {
                writeln!(f, "❌ {}: Not running at {}", status.service_name, status.url)?;
                if let Some(error) = &status.error {
                    writeln!(f, "   Error: {}", error)?;
                }
            }
        }

        if self.scanner.present {
            write!(f, "✅ web3-scanner CLI: Available at {}", self.scanner.path.display())
        } else {
            write!(f, "❌ web3-scanner CLI: Not found at {}", self.scanner.path.display())
        }
    }
}

/// Short-timeout liveness probes for the auxiliary services.
///
/// Nothing is cached: every [`check`](Self::check) issues fresh requests.
pub struct ServiceHealthChecker {
    client: Client,
    smartbert_url: String,
    web3_sekit_url: String,
    scanner_binary: PathBuf,
}

impl ServiceHealthChecker {
    pub fn new(config: &BridgeConfig) -> Self {
        let client = Client::builder()
            .timeout(config.probe_timeout)
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            smartbert_url: config.endpoints.smartbert.clone(),
            web3_sekit_url: config.endpoints.web3_sekit.clone(),
            scanner_binary: config.scanner_binary(),
        }
    }

    pub async fn check(&self) -> StatusReport {
        let (smartbert, web3_sekit) = tokio::join!(
            self.probe(SMARTBERT_SERVICE, &self.smartbert_url),
            self.probe(WEB3_SEKIT_SERVICE, &self.web3_sekit_url),
        );

        let scanner = ScannerPresence {
            present: self.scanner_binary.exists(),
            path: self.scanner_binary.clone(),
        };

        StatusReport {
            smartbert,
            web3_sekit,
            scanner,
        }
    }

    async fn probe(&self, service_name: &'static str, url: &str) -> ServiceStatus {
        let unreachable = |error: String| {
            warn!("{} unreachable at {}: {}", service_name, url, error);
            ServiceStatus {
                service_name,
                url: url.to_string(),
                reachable: false,
                detail: None,
                error: Some(error),
            }
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return unreachable(e.to_string()),
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(e) => return unreachable(e.to_string()),
        };

        // The body is informational only; a non-JSON answer still counts as alive.
        let detail = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<Value>(&body).ok(),
            Err(e) => {
                debug!("Failed to read body from {}: {}", url, e);
                None
            }
        };

        debug!("{} reachable at {}", service_name, url);
        ServiceStatus {
            service_name,
            url: url.to_string(),
            reachable: true,
            detail,
            error: None,
        }
    }
}
