//! link4m 短链 API 实现
//!
//! GET {api}?api={token}&url={long_url}
//! 成功：{"status": "success", "shortenedUrl": "https://link4m.com/xxxx"}
//! 失败：{"status": "error", "message": "..."}

use async_trait::async_trait;
use serde::Deserialize;
use ureq::Agent;

use super::channel::LinkShortener;
use super::http::{build_agent, run_blocking};
use crate::config::DeliveryConfig;
use crate::errors::{KeywardError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortenResponse {
    status: String,
    #[serde(default)]
    shortened_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ShortenResponse {
    fn into_url(self) -> Result<String> {
        match (self.status.as_str(), self.shortened_url) {
            ("success", Some(url)) if !url.is_empty() => Ok(url),
            (status, _) => Err(KeywardError::delivery(format!(
                "shortener returned status '{}': {}",
                status,
                self.message.unwrap_or_default()
            ))),
        }
    }
}

pub struct Link4mShortener {
    agent: Agent,
    api_url: String,
    token: String,
}

impl Link4mShortener {
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            agent: build_agent(config.timeout_secs),
            api_url: config.shortener_api_url.clone(),
            token: config.shortener_api_token.clone(),
        }
    }

    fn shorten_sync(agent: Agent, api_url: String, token: String, url: String) -> Result<String> {
        let resp = agent
            .get(&api_url)
            .query("api", &token)
            .query("url", &url)
            .call()?;
        let body: ShortenResponse = resp.into_body().read_json()?;
        body.into_url()
    }
}

#[async_trait]
impl LinkShortener for Link4mShortener {
    async fn shorten(&self, url: &str) -> Result<String> {
        let agent = self.agent.clone();
        let api_url = self.api_url.clone();
        let token = self.token.clone();
        let url = url.to_string();

        run_blocking("link shorten", move || {
            Self::shorten_sync(agent, api_url, token, url)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "link4m"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String> {
        serde_json::from_str::<ShortenResponse>(json)
            .unwrap()
            .into_url()
    }

    #[test]
    fn test_success_payload() {
        assert_eq!(
            parse(r#"{"status":"success","shortenedUrl":"https://link4m.com/aB3"}"#).unwrap(),
            "https://link4m.com/aB3"
        );
    }

    #[test]
    fn test_error_payload() {
        let err = parse(r#"{"status":"error","message":"Invalid API token"}"#).unwrap_err();
        assert!(err.message().contains("Invalid API token"));
    }

    #[test]
    fn test_success_without_url_is_an_error() {
        assert!(parse(r#"{"status":"success"}"#).is_err());
        assert!(parse(r#"{"status":"success","shortenedUrl":""}"#).is_err());
    }
}
