//! Pulling data from active sensors.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;

use crate::directory::CollectionProfile;
use crate::utils::{HubError, Result};

/// Body returned by a sensor's collection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PullResult {
    #[serde(default, alias = "Data")]
    pub data: HashMap<String, f64>,
    #[serde(default, alias = "Labels")]
    pub labels: HashMap<String, String>,
}

#[async_trait]
pub trait DataPuller: Send + Sync {
    async fn pull(&self, profile: &CollectionProfile) -> Result<PullResult>;
}

/// GETs the profile's endpoint with the auth token as the `Authorization`
/// header. Anything but a 2xx status with a JSON body is a failure.
#[derive(Debug, Clone)]
pub struct HttpPuller {
    http: reqwest::Client,
}

impl HttpPuller {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl DataPuller for HttpPuller {
    async fn pull(&self, profile: &CollectionProfile) -> Result<PullResult> {
        let failure = |reason: String| HubError::PullFailure {
            endpoint: profile.endpoint.clone(),
            reason,
        };

        let mut request = self.http.get(&profile.endpoint);
        if !profile.auth_token.is_empty() {
            request = request.header(AUTHORIZATION, profile.auth_token.as_str());
        }

        let response = request.send().await.map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("unexpected status {status}")));
        }

        let result: PullResult = response
            .json()
            .await
            .map_err(|e| failure(format!("invalid body: {e}")))?;
        debug!(endpoint = %profile.endpoint, metrics = result.data.len(), "Pulled sensor data");
        Ok(result)
    }
}
