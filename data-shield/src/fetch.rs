use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::error::ShieldError;

/// Retrieves the original object from the presigned URL.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ShieldError>;
}

/// Single-attempt GET over a shared `reqwest` client.
pub struct PresignedUrlFetcher {
    client: reqwest::Client,
}

impl PresignedUrlFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ShieldError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShieldError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ObjectFetcher for PresignedUrlFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ShieldError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ShieldError::UpstreamFetch {
                status: Some(status.as_u16()),
                message: format!("presigned URL returned {status}"),
            });
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
