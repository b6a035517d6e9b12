//! HTTP client for the Huami account and Mi Fit data servers

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{AppToken, Details, Listing, TrackId};

use super::{payload, MifitApi};

const LOGIN_PATH: &str = "/v2/client/login";
const HISTORY_PATH: &str = "/v1/sport/run/history.json";
const DETAIL_PATH: &str = "/v1/sport/run/detail.json";
const APP_NAME: &str = "com.xiaomi.hm.health";

/// Async HTTP client for the Mi Fit API
pub struct MifitClient {
    config: ApiConfig,
    http_client: reqwest::Client,
    account_url: String,
    api_url: String,
}

impl MifitClient {
    /// Create a new client from configuration
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;

        let account_url = config.account_url.trim_end_matches('/').to_string();
        let api_url = config.api_url.trim_end_matches('/').to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            account_url,
            api_url,
        })
    }

    /// Exchange a Google authorization code for a Mi Fit app token
    pub async fn login(&self, code: &str) -> Result<AppToken> {
        let url = format!("{}{}", self.account_url, LOGIN_PATH);
        let form = self.login_form(code);

        tracing::debug!(url = %url, "Requesting app token");

        let response = self
            .http_client
            .post(&url)
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Authentication(format!(
                "login rejected ({}): {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("failed to parse response: {}", e)))?;
        payload::app_token(&body)
    }

    /// Fetch the activity history
    pub async fn history(&self, token: &AppToken) -> Result<Listing> {
        let url = format!("{}{}", self.api_url, HISTORY_PATH);
        let sources = self.config.sources.join(",");
        let body = self.get_json(&url, token, &[("source", sources.as_str())]).await?;
        payload::listing(body)
    }

    /// Fetch the full record of one track
    pub async fn detail(&self, token: &AppToken, id: TrackId, source: &str) -> Result<Details> {
        let url = format!("{}{}", self.api_url, DETAIL_PATH);
        let trackid = id.to_string();
        let body = self
            .get_json(&url, token, &[("trackid", trackid.as_str()), ("source", source)])
            .await?;
        payload::details(body)
    }

    async fn get_json(&self, url: &str, token: &AppToken, query: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http_client
            .get(url)
            .headers(app_token_headers(token)?)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::RemoteFetch(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::RemoteFetch(format!("failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::RemoteFetch(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    fn login_form<'a>(&'a self, code: &'a str) -> [(&'static str, &'a str); 8] {
        [
            ("app_version", self.config.app_version.as_str()),
            ("country_code", self.config.country_code.as_str()),
            ("device_id", "0"),
            ("third_name", "google"),
            ("device_model", self.config.device_model.as_str()),
            ("app_name", APP_NAME),
            ("code", code),
            ("grant_type", "request_token"),
        ]
    }
}

fn app_token_headers(token: &AppToken) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "apptoken",
        HeaderValue::from_str(token.as_str())
            .map_err(|e| Error::Authentication(format!("invalid app token: {}", e)))?,
    );
    Ok(headers)
}

/// Synchronous wrapper for [`MifitClient`]
///
/// Provides blocking methods for use in synchronous code.
pub struct BlockingMifitClient {
    inner: MifitClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingMifitClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            inner: MifitClient::new(config)?,
            runtime,
        })
    }
}

impl MifitApi for BlockingMifitClient {
    fn exchange_code(&self, code: &str) -> Result<AppToken> {
        self.runtime.block_on(self.inner.login(code))
    }

    fn fetch_listing(&self, token: &AppToken) -> Result<Listing> {
        self.runtime.block_on(self.inner.history(token))
    }

    fn fetch_detail(&self, token: &AppToken, id: TrackId, source: &str) -> Result<Details> {
        self.runtime.block_on(self.inner.detail(token, id, source))
    }
}
