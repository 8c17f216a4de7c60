//! Outbound call to the i2OCR web form.
//!
//! The upstream has no API; we replay what its upload page submits over
//! XHR. Field names and values below are what the site expects for Bengali
//! text with engine 3 and a single-column layout, and are not caller-tunable.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{header, StatusCode};
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("upstream responded with {0}")]
    Status(StatusCode),

    #[error("upstream request failed")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout(err)
        } else {
            RelayError::Transport(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
    referer: String,
}

impl RelayClient {
    pub fn new(endpoint: impl Into<String>, referer: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            referer: referer.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        Self::new(
            config.upstream_url.clone(),
            config.upstream_referer.clone(),
            config.upstream_timeout,
        )
    }

    /// Submits the image and returns the raw response page.
    pub async fn submit(&self, file_name: &str, image: Vec<u8>) -> Result<String, RelayError> {
        let form = build_form(file_name, image)?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-requested-with", "XMLHttpRequest")
            .header(header::REFERER, &self.referer)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        log::debug!("Upstream {} responded with {}", self.endpoint, status);
        if !status.is_success() {
            return Err(RelayError::Status(status));
        }

        Ok(response.text().await?)
    }
}

fn build_form(file_name: &str, image: Vec<u8>) -> Result<Form, RelayError> {
    let file = Part::bytes(image)
        .file_name(file_name.to_string())
        .mime_str("image/jpeg")?;

    Ok(Form::new()
        .text("i2ocr_languages", "bd,ben")
        .text("engine_options", "engine_3")
        .text("layout_options", "single_column")
        .part("i2ocr_uploadedfile", file)
        .text("ocr_type", "1")
        .text("ly", "single_column")
        .text("en", "3")
        .text("g-recaptcha-response", ""))
}
