//! Blob storage download.
//!
//! A thin collaborator that fetches the raw CSV export over HTTPS with a
//! single blocking GET. There is no retry and no connection pooling; a
//! transfer failure is returned to the caller immediately.

use crate::error::{ProcessingError, Result};
use std::env;
#[cfg(feature = "remote")]
use std::time::Duration;
use tracing::info;

/// Blob name used when `BLOB_NAME` is not set.
pub const DEFAULT_BLOB_NAME: &str = "cost-analysis.csv";

#[cfg(feature = "remote")]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Location of a CSV blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobSource {
    url: String,
    blob_name: String,
}

impl BlobSource {
    /// Use a fully-qualified blob URL (including any SAS query string).
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let blob_name = url
            .split('?')
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_BLOB_NAME)
            .to_string();
        Self { url, blob_name }
    }

    /// Build the blob URL from account, container and blob name.
    pub fn from_parts(
        account: &str,
        container: &str,
        blob_name: &str,
        sas_token: Option<&str>,
    ) -> Self {
        let mut url = format!(
            "https://{}.blob.core.windows.net/{}/{}",
            account, container, blob_name
        );
        if let Some(token) = sas_token.map(|t| t.trim_start_matches('?')).filter(|t| !t.is_empty()) {
            url.push('?');
            url.push_str(token);
        }
        Self {
            url,
            blob_name: blob_name.to_string(),
        }
    }

    /// Read the location from the process environment.
    ///
    /// `BLOB_URL` wins when set. Otherwise `STORAGE_ACCOUNT` and
    /// `CONTAINER_NAME` are required, `BLOB_NAME` defaults to
    /// [`DEFAULT_BLOB_NAME`] and `AZURE_STORAGE_SAS_TOKEN` is optional.
    pub fn from_env() -> Result<Self> {
        if let Ok(url) = env::var("BLOB_URL")
            && !url.trim().is_empty()
        {
            return Ok(Self::from_url(url.trim()));
        }

        let account = required_var("STORAGE_ACCOUNT")?;
        let container = required_var("CONTAINER_NAME")?;
        let blob_name = env::var("BLOB_NAME").unwrap_or_else(|_| DEFAULT_BLOB_NAME.to_string());
        let sas = env::var("AZURE_STORAGE_SAS_TOKEN").ok();

        Ok(Self::from_parts(&account, &container, &blob_name, sas.as_deref()))
    }

    /// The download URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The blob file name.
    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    /// Download the blob and decode it as UTF-8 text.
    #[cfg(feature = "remote")]
    pub fn fetch_text(&self) -> Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let response = client.get(&self.url).send()?.error_for_status()?;
        let text = response.text()?;

        info!("Successfully downloaded blob: {}", self.blob_name);
        Ok(text)
    }

    /// Download the blob and decode it as UTF-8 text.
    #[cfg(not(feature = "remote"))]
    pub fn fetch_text(&self) -> Result<String> {
        info!("Blob download requested for {}", self.blob_name);
        Err(ProcessingError::Configuration(
            "blob download requires the 'remote' feature".to_string(),
        ))
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            ProcessingError::Configuration(format!("environment variable {} is not set", name))
        })
}
