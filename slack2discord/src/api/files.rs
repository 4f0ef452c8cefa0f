use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;

use crate::error::FetchError;

#[async_trait]
pub trait FileFetcher {
    /// Download a Slack file, refusing anything bigger than the configured ceiling.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

pub struct HttpFileFetcher {
    client: Client,
    max_size: u64,
}

impl HttpFileFetcher {
    pub fn new(slack_token: Option<&str>, timeout: Duration, max_size: u64) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = slack_token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Slack token contains invalid characters")?,
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, max_size })
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(size) = response.content_length() {
            if size > self.max_size {
                return Err(FetchError::TooLarge {
                    size,
                    limit: self.max_size,
                });
            }
        }

        // content-length may be absent or wrong, so the ceiling is enforced while reading
        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_size {
                return Err(FetchError::TooLarge {
                    size: data.len() as u64,
                    limit: self.max_size,
                });
            }
        }

        Ok(data)
    }
}
