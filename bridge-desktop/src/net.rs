//! Native Network Stack Implementation using Reqwest
//!
//! Serves the segmented request/response contract of
//! [`NetEngine`](bridge_traits::net::NetEngine) with a blocking reqwest client.
//! The cookie jar is shared between both internal clients and exposed through
//! [`CookieStore`](bridge_traits::net::CookieStore).

use bridge_traits::{
    error::{BridgeError, Result},
    net::{CookieStore, NetEngine, NetMethod, NetRequest, NetResponseMeta, NATIVE_COST_HEADER},
};
use bytes::Bytes;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::cookie::{CookieStore as _, Jar};
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Reqwest-based native network stack
///
/// Uses the blocking client, so [`NetEngine::call`] must not be invoked from
/// inside an async runtime worker.
pub struct ReqwestNetEngine {
    client: Client,
    no_redirect_client: Client,
    jar: Arc<Jar>,
}

impl ReqwestNetEngine {
    /// Create a network stack with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a network stack with a custom overall request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let jar = Arc::new(Jar::default());

        let client = Self::builder(timeout, &jar)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;
        let no_redirect_client = Self::builder(timeout, &jar)
            .redirect(Policy::none())
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            no_redirect_client,
            jar,
        })
    }

    fn builder(timeout: Duration, jar: &Arc<Jar>) -> ClientBuilder {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .cookie_provider(Arc::clone(jar))
            .user_agent(concat!("native-bridge/", env!("CARGO_PKG_VERSION")))
    }

    /// Convert bridge NetMethod to reqwest Method
    fn convert_method(method: NetMethod) -> reqwest::Method {
        match method {
            NetMethod::Get => reqwest::Method::GET,
            NetMethod::Post => reqwest::Method::POST,
            NetMethod::Put => reqwest::Method::PUT,
            NetMethod::Patch => reqwest::Method::PATCH,
            NetMethod::Delete => reqwest::Method::DELETE,
            NetMethod::Head => reqwest::Method::HEAD,
            NetMethod::Options => reqwest::Method::OPTIONS,
        }
    }

    /// Flatten a header map, joining repeated names with `", "`.
    fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
        let mut out: HashMap<String, String> = HashMap::new();
        for (name, value) in headers {
            let Ok(value) = value.to_str() else {
                continue;
            };
            out.entry(name.to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        out
    }

    /// Final URL, reported only when it differs from the requested one.
    fn resolved_url(requested: &str, final_url: &Url) -> Option<String> {
        match Url::parse(requested) {
            Ok(parsed) if &parsed == final_url => None,
            _ => Some(final_url.to_string()),
        }
    }

    fn segments(meta: NetResponseMeta, body: Option<Bytes>) -> Vec<Bytes> {
        match meta.to_json() {
            Ok(json) => {
                let mut segments = vec![Bytes::from(json)];
                segments.extend(body);
                segments
            }
            Err(e) => {
                warn!(error = %e, "Failed to encode response metadata");
                Vec::new()
            }
        }
    }

    fn error_segments(error: String) -> Vec<Bytes> {
        let meta = NetResponseMeta {
            code: 500,
            error: Some(error),
            ..Default::default()
        };
        Self::segments(meta, None)
    }
}

impl NetEngine for ReqwestNetEngine {
    fn call(&self, request_json: &[u8], body: Option<&[u8]>) -> Vec<Bytes> {
        let started = Instant::now();

        let request = match NetRequest::from_json(request_json) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed net request");
                return Vec::new();
            }
        };

        let client = if request.follows_redirects() {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let mut builder = client.request(Self::convert_method(request.method), &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }

        debug!(method = request.method.as_str(), url = %request.url, "Executing native request");

        let response = match builder.send() {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, url = %request.url, "Native request failed");
                let error = if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    e.to_string()
                };
                return Self::error_segments(error);
            }
        };

        let status = response.status();
        let current_url = Self::resolved_url(&request.url, response.url());
        let mut headers = Self::collect_headers(response.headers());

        let body = match response.bytes() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, url = %request.url, "Failed to read response body");
                return Self::error_segments(format!("Failed to read body: {}", e));
            }
        };

        headers.insert(
            NATIVE_COST_HEADER.to_string(),
            started.elapsed().as_millis().to_string(),
        );

        let meta = NetResponseMeta {
            code: status.as_u16(),
            message: status.canonical_reason().map(str::to_string),
            error: None,
            headers,
            content_length: Some(body.len() as i64),
            current_url,
        };

        Self::segments(meta, Some(body))
    }
}

impl CookieStore for ReqwestNetEngine {
    fn get_cookie(&self, url: &str) -> Result<Option<String>> {
        let url = Url::parse(url)
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid URL {}: {}", url, e)))?;

        Ok(self
            .jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string)))
    }

    fn set_cookie(&self, url: &str, value: &str) -> Result<()> {
        let url = Url::parse(url)
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid URL {}: {}", url, e)))?;

        self.jar.add_cookie_str(value, &url);
        Ok(())
    }
}
