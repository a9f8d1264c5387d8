//! Native Network Abstraction
//!
//! Synchronous request/response calls into the native network stack plus
//! access to its cookie jar.
//!
//! ## Wire format
//!
//! A request crosses the boundary as UTF-8 JSON ([`NetRequest`]) with the
//! optional request body passed alongside as raw bytes. The response comes
//! back as a list of independently sized segments:
//!
//! | Segment | Content |
//! |---------|---------|
//! | 0 | UTF-8 JSON metadata ([`NetResponseMeta`]) |
//! | 1 | raw body bytes (optional) |
//!
//! A missing or empty segment 0 signals a transport-level failure.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{BridgeError, Result};

/// Response header carrying the time spent inside the native stack, in ms.
pub const NATIVE_COST_HEADER: &str = "x-native-cost";

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NetMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl NetMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetMethod::Get => "GET",
            NetMethod::Post => "POST",
            NetMethod::Put => "PUT",
            NetMethod::Patch => "PATCH",
            NetMethod::Delete => "DELETE",
            NetMethod::Head => "HEAD",
            NetMethod::Options => "OPTIONS",
        }
    }
}

/// Request metadata sent to the native stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetRequest {
    pub url: String,
    pub method: NetMethod,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Only transmitted when redirects must not be followed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    /// Travels as a separate raw buffer, never inside the JSON.
    #[serde(skip)]
    pub body: Option<Bytes>,
}

impl NetRequest {
    pub fn new(method: NetMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            follow_redirects: None,
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(NetMethod::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Bytes) -> Self {
        Self::new(NetMethod::Post, url).body(body)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Disable redirect following. Enabling is the native default and is
    /// therefore never sent explicitly.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = if follow { None } else { Some(false) };
        self
    }

    /// Whether the native stack should follow redirects for this request.
    pub fn follows_redirects(&self) -> bool {
        self.follow_redirects.unwrap_or(true)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })
    }

    pub fn from_json(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }
}

/// Response metadata returned in segment 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetResponseMeta {
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub content_length: Option<i64>,
    /// Final URL after redirects, when it differs from the requested one.
    #[serde(default)]
    pub current_url: Option<String>,
}

impl NetResponseMeta {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })
    }
}

/// Native network stack trait
///
/// [`call`](Self::call) blocks the calling thread for the whole exchange. It
/// never fails through `Result`: every failure is encoded in the returned
/// segments (empty list or error metadata).
pub trait NetEngine: Send + Sync {
    fn call(&self, request_json: &[u8], body: Option<&[u8]>) -> Vec<Bytes>;
}

/// Cookie jar owned by the native network stack.
pub trait CookieStore: Send + Sync {
    /// `Cookie` header value for `url`, if any cookie matches.
    fn get_cookie(&self, url: &str) -> Result<Option<String>>;

    /// Store a `Set-Cookie` style value for `url`.
    fn set_cookie(&self, url: &str, value: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_omits_default_redirect_flag() {
        let request = NetRequest::get("https://example.com").header("Accept", "*/*");
        let json: serde_json::Value =
            serde_json::from_slice(&request.to_json().unwrap()).unwrap();

        assert_eq!(json["url"], "https://example.com");
        assert_eq!(json["method"], "GET");
        assert_eq!(json["headers"]["Accept"], "*/*");
        assert!(json.get("followRedirects").is_none());
        assert!(json.get("body").is_none());
    }

    #[test]
    fn test_request_json_carries_disabled_redirects() {
        let request = NetRequest::get("https://example.com").follow_redirects(false);
        let json: serde_json::Value =
            serde_json::from_slice(&request.to_json().unwrap()).unwrap();

        assert_eq!(json["followRedirects"], false);
        assert!(!request.follows_redirects());
    }

    #[test]
    fn test_response_meta_tolerates_missing_fields() {
        let meta: NetResponseMeta = serde_json::from_str(r#"{"code":204}"#).unwrap();
        assert_eq!(meta.code, 204);
        assert!(meta.headers.is_empty());
        assert!(meta.error.is_none());
        assert!(meta.current_url.is_none());
    }

    #[test]
    fn test_response_meta_reads_camel_case() {
        let meta: NetResponseMeta = serde_json::from_str(
            r#"{"code":200,"message":"OK","contentLength":5,"currentUrl":"https://b.example"}"#,
        )
        .unwrap();
        assert_eq!(meta.message.as_deref(), Some("OK"));
        assert_eq!(meta.content_length, Some(5));
        assert_eq!(meta.current_url.as_deref(), Some("https://b.example"));
    }
}
