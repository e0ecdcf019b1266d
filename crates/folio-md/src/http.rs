//! Blocking HTTP transport with optional proxy support.

use std::time::Duration;

use tracing::debug;

use crate::provider::MdError;

/// A blocking HTTP client following redirects, optionally routed through a
/// proxy (`http://host:port`, `socks5://host:port`, ...).
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(proxy: Option<&str>) -> Result<Self, MdError> {
        let mut builder = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(Duration::from_secs(30));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|err| MdError::Transport(format!("bad proxy: {err}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| MdError::Transport(err.to_string()))?;
        Ok(HttpClient { client })
    }

    /// GET `url` and return the response body.
    pub fn get(&self, url: &str) -> Result<String, MdError> {
        debug!(url, "http get");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| MdError::Transport(err.to_string()))?;
        response
            .text()
            .map_err(|err| MdError::Transport(err.to_string()))
    }
}
