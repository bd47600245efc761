//! Blocking HTTP fetcher.

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use tracing::debug;

use crate::config::DownloadConfig;
use crate::error::{CurateError, Result};

use super::wrapper;
use super::Fetcher;

/// [`Fetcher`] over a shared `reqwest` blocking client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send()?;
        ensure_success(url, response)
    }
}

impl Fetcher for HttpFetcher {
    fn probe(&self, url: &str) -> Result<Option<u64>> {
        let response = self.client.head(url).send()?;
        let response = ensure_success(url, response)?;
        let size = content_length(response.headers());
        debug!(url, size = ?size, "Probed");
        Ok(size)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url)?;
        if !is_html(response.headers()) {
            return Ok(response.bytes()?.to_vec());
        }

        // Wrapper page: follow the embedded image.
        let page_url = response.url().clone();
        let html = response.text()?;
        let src = wrapper::find_image_src(&html)
            .ok_or_else(|| CurateError::NoImageInWrapper(url.to_string()))?;

        if wrapper::is_data_url(&src) {
            debug!(url, "Wrapper embeds inline image");
            return wrapper::decode_data_url(&src);
        }

        let target = page_url.join(&src).map_err(|e| CurateError::InvalidUrl {
            url: src.clone(),
            reason: e.to_string(),
        })?;
        debug!(url, target = %target, "Following wrapper page");
        let response = self.get(target.as_str())?;
        Ok(response.bytes()?.to_vec())
    }
}

fn ensure_success(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CurateError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Size from the `Content-Length` header, if present and numeric.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Whether the response body is an HTML page rather than raw bytes.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.starts_with("text/html") || v.starts_with("application/xhtml")
        })
        .unwrap_or(false)
}
