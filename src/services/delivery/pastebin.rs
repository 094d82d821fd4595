//! Pastebin API 实现
//!
//! POST application/x-www-form-urlencoded 到 api_post.php，
//! 成功时响应体为纯文本 paste URL，失败时为 "Bad API request, ..."。

use async_trait::async_trait;
use tracing::trace;
use ureq::Agent;
use url::Url;

use super::channel::{PasteHost, PublishedPaste};
use super::http::{build_agent, run_blocking};
use crate::config::DeliveryConfig;
use crate::errors::{KeywardError, Result};

/// api_paste_private: 0 公开 / 1 不公开列出 / 2 私有
const PASTE_UNLISTED: &str = "1";

pub struct PastebinHost {
    agent: Agent,
    api_url: String,
    api_key: String,
    expire: String,
}

impl PastebinHost {
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            agent: build_agent(config.timeout_secs),
            api_url: config.paste_api_url.clone(),
            api_key: config.paste_api_key.clone(),
            expire: config.paste_expire.clone(),
        }
    }

    fn publish_sync(
        agent: Agent,
        api_url: String,
        api_key: String,
        expire: String,
        title: String,
        body: String,
    ) -> Result<PublishedPaste> {
        let resp = agent.post(&api_url).send_form([
            ("api_dev_key", api_key.as_str()),
            ("api_option", "paste"),
            ("api_paste_code", body.as_str()),
            ("api_paste_name", title.as_str()),
            ("api_paste_private", PASTE_UNLISTED),
            ("api_paste_expire_date", expire.as_str()),
        ])?;

        let text = resp.into_body().read_to_string()?;
        trace!("Pastebin response: {}", text);
        parse_paste_response(&text)
    }
}

/// Extracts `{id, url}` from the plain-text API response.
pub(super) fn parse_paste_response(text: &str) -> Result<PublishedPaste> {
    let text = text.trim();
    if text.starts_with("Bad API request") {
        return Err(KeywardError::delivery(format!(
            "paste host rejected request: {}",
            text
        )));
    }

    let url = Url::parse(text).map_err(|e| {
        KeywardError::delivery(format!("paste host returned a non-URL '{}': {}", text, e))
    })?;

    let id = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| KeywardError::delivery(format!("paste URL '{}' has no id", text)))?;

    Ok(PublishedPaste {
        id,
        url: url.to_string(),
    })
}

#[async_trait]
impl PasteHost for PastebinHost {
    async fn publish(&self, title: &str, body: &str) -> Result<PublishedPaste> {
        let agent = self.agent.clone();
        let api_url = self.api_url.clone();
        let api_key = self.api_key.clone();
        let expire = self.expire.clone();
        let title = title.to_string();
        let body = body.to_string();

        run_blocking("paste publish", move || {
            Self::publish_sync(agent, api_url, api_key, expire, title, body)
        })
        .await
    }

    fn name(&self) -> &'static str {
        "Pastebin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let paste = parse_paste_response("https://pastebin.com/UIFdu235s\n").unwrap();
        assert_eq!(paste.id, "UIFdu235s");
        assert_eq!(paste.url, "https://pastebin.com/UIFdu235s");
    }

    #[test]
    fn test_parse_error_response() {
        let err = parse_paste_response("Bad API request, invalid api_dev_key").unwrap_err();
        assert!(err.message().contains("invalid api_dev_key"));
    }

    #[test]
    fn test_parse_garbage_response() {
        assert!(parse_paste_response("<html>oops</html>").is_err());
        assert!(parse_paste_response("https://pastebin.com/").is_err());
    }
}
