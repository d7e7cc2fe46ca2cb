use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::COMMUNITY_BASE;
use crate::config::AppConfig;
use crate::error::{HistoryError, Result};

static COMMUNITY_URL: LazyLock<Url> = LazyLock::new(|| Url::parse(COMMUNITY_BASE).unwrap());

/// Build `https://steamcommunity.com/<segments...>` with each segment
/// percent-encoded.
pub fn community_url(segments: &[&str]) -> Url {
    let mut url = COMMUNITY_URL.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(segments);
    }
    url
}

/// Issues one request per page and hands back the raw body.
///
/// Session cookies, retries and timeouts all live behind this seam.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_text(&self, url: &Url) -> Result<String>;
}

/// Cookie-authenticated Steam Community client.
pub struct CommunityClient {
    http: reqwest::Client,
    steam_id: u64,
}

impl CommunityClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let cookie = format!(
            "sessionid={}; steamLoginSecure={}",
            config.account.session_id, config.account.login_secure
        );
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&cookie)?;
        value.set_sensitive(true);
        headers.insert(COOKIE, value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            steam_id: config.account.steam_id,
        })
    }

    /// `https://steamcommunity.com/profiles/<steamid>/` for the signed-in account.
    pub fn profile_url(&self) -> Url {
        community_url(&["profiles", &self.steam_id.to_string(), ""])
    }
}

#[async_trait]
impl PageFetcher for CommunityClient {
    async fn get_text(&self, url: &Url) -> Result<String> {
        debug!("GET {url}");
        let resp = self.http.get(url.as_str()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HistoryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}
