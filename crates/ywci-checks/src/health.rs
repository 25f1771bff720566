//! Readiness polling of a freshly started py-youwol server.
//!
//! Attempts are numbered `1..=attempts` and the poller sleeps only between
//! attempts. A probe error, a non-200 status, an unreadable body and an
//! unexpected `status` value all count as one failed attempt.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use ywci_core::{ActionError, AnnotationProperties, Annotator, Result};

pub const DEFAULT_HEALTH_URL: &str = "http://localhost:2001/healthz";
pub const READY_STATUS: &str = "py-youwol ok";
pub const DEFAULT_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Raw answer of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
}

impl ProbeResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// One request to the health endpoint.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<ProbeResponse>;
}

/// [`HealthProbe`] issuing `GET <url>`.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ywci/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ActionError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self) -> Result<ProbeResponse> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ActionError::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ActionError::Http(e.to_string()))?;
        Ok(ProbeResponse { status, body })
    }
}

/// How a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts } | PollOutcome::Exhausted { attempts } => *attempts,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: Option<String>,
}

/// Fixed-budget readiness poll.
#[derive(Debug, Clone)]
pub struct HealthPoller {
    attempts: u32,
    interval: Duration,
    expected_status: String,
}

impl Default for HealthPoller {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            expected_status: READY_STATUS.to_string(),
        }
    }
}

impl HealthPoller {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            interval,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until ready or out of attempts, inside a log group.
    pub async fn wait(&self, probe: &dyn HealthProbe, annotator: &dyn Annotator) -> PollOutcome {
        annotator.start_group(&format!(
            "Trying at most {} times to call healthz endpoint",
            self.attempts
        ));
        let outcome = self.poll(probe, annotator).await;
        annotator.end_group();

        if let PollOutcome::Exhausted { attempts } = outcome {
            annotator.error(
                &format!("Failed to contact py-youwol after {attempts} attempts"),
                &AnnotationProperties::titled("Run py-youwol"),
            );
        }
        outcome
    }

    async fn poll(&self, probe: &dyn HealthProbe, annotator: &dyn Annotator) -> PollOutcome {
        for attempt in 1..=self.attempts {
            annotator.info(&format!(
                "try to contact py-youwol instance : {attempt}/{}",
                self.attempts
            ));
            match self.check(probe).await {
                Ok(()) => {
                    annotator.info("py-youwol successfully started");
                    info!(attempt, "py-youwol ready");
                    return PollOutcome::Ready { attempts: attempt };
                }
                Err(reason) => {
                    debug!(attempt, %reason, "health check failed");
                    annotator.info(&reason);
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        PollOutcome::Exhausted {
            attempts: self.attempts,
        }
    }

    async fn check(&self, probe: &dyn HealthProbe) -> std::result::Result<(), String> {
        let response = probe
            .probe()
            .await
            .map_err(|e| format!("failed to contact endpoint : {e}"))?;
        if response.status != 200 {
            return Err(format!("invalid HTTP status \"{}\"", response.status));
        }
        let body: HealthBody = serde_json::from_str(&response.body)
            .map_err(|e| format!("invalid JSON response : {e}"))?;
        match body.status {
            Some(status) if status == self.expected_status => Ok(()),
            other => Err(format!(
                "invalid JSON response status : {}",
                other.unwrap_or_default()
            )),
        }
    }
}
