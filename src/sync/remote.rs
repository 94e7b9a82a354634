use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;

use crate::models::SessionRecord;

/// Why a send did not land. The drain treats both variants the same way
/// (halt the batch); the immediate path logs them distinctly.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("network error sending record: {0}")]
    Network(#[from] reqwest::Error),
    #[error("remote rejected record with status {0}")]
    Rejected(reqwest::StatusCode),
}

/// Delivery target for completed session records.
#[async_trait]
pub trait RemoteSink: Send + Sync {
    async fn send(&self, record: &SessionRecord) -> Result<(), SendError>;
}

/// POSTs records as JSON to the configured endpoint. Any 2xx response is an
/// acknowledgment; everything else is a rejection.
pub struct HttpRemote {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRemote {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RemoteSink for HttpRemote {
    async fn send(&self, record: &SessionRecord) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendError::Rejected(response.status()));
        }
        Ok(())
    }
}
