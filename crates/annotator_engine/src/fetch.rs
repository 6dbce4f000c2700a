use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use url::Url;

use crate::{FailureKind, FetchError, ScoreResult};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Source of per-subject scores.
///
/// Implementations never panic or escape with a transport error: every
/// failure path is folded into [`FetchError`].
#[async_trait::async_trait]
pub trait ScoreFetcher: Send + Sync {
    async fn fetch_scores(&self, subject_id: &str) -> Result<ScoreResult, FetchError>;
}

/// Scoring service client: `GET {base}/{subject_id}`.
#[derive(Debug, Clone)]
pub struct ReqwestScoreFetcher {
    base: String,
    client: reqwest::Client,
}

impl ReqwestScoreFetcher {
    pub fn new(api_base: &str, settings: FetchSettings) -> Result<Self, FetchError> {
        let base = api_base.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { base, client })
    }

    pub fn endpoint(&self, subject_id: &str) -> Result<Url, FetchError> {
        Url::parse(&format!("{}/{}", self.base, subject_id))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ScoreFetcher for ReqwestScoreFetcher {
    async fn fetch_scores(&self, subject_id: &str) -> Result<ScoreResult, FetchError> {
        let endpoint = self.endpoint(subject_id)?;
        engine_debug!("GET {}", endpoint);

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            engine_warn!("subject {} answered {}", subject_id, status);
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.as_u16().to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
