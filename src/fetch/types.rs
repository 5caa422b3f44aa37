//! Fetch request options and response shapes.

use serde::Serialize;

use crate::config::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS};
use crate::security::GuardPolicy;

/// HTTP method used by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchMethod {
    Get,
    Head,
}

impl From<FetchMethod> for reqwest::Method {
    fn from(method: FetchMethod) -> Self {
        match method {
            FetchMethod::Get => reqwest::Method::GET,
            FetchMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Options for a single logical fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: FetchMethod,
    /// Redirects followed before failing with `redirect_limit`
    pub max_redirects: usize,
    /// Body ceiling in bytes
    pub max_bytes: usize,
    /// Cut the body at the ceiling instead of failing with `size_exceeded`
    pub allow_truncation: bool,
    /// Retry once with GET when a HEAD request answers 405
    pub head_fallback: bool,
    pub guard: GuardPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: FetchMethod::Get,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_bytes: DEFAULT_MAX_BODY_BYTES,
            allow_truncation: false,
            head_fallback: false,
            guard: GuardPolicy::default(),
        }
    }
}

impl FetchOptions {
    /// HEAD with fallback to GET on 405.
    pub fn head() -> Self {
        Self {
            method: FetchMethod::Head,
            head_fallback: true,
            ..Self::default()
        }
    }

    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn allow_truncation(mut self, allow: bool) -> Self {
        self.allow_truncation = allow;
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn guard(mut self, guard: GuardPolicy) -> Self {
        self.guard = guard;
        self
    }
}

/// One followed redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectHop {
    /// 1-based position in the chain
    pub index: usize,
    /// The redirect target, resolved against the previous URL
    pub url: String,
    /// Status of the 3xx response that produced this hop
    pub status: u16,
}

/// A response header, value capped in length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

/// Result of a fetch. Any final status, including 4xx/5xx, is a result.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    #[serde(skip)]
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub final_url: String,
    pub status: u16,
    pub headers: Vec<HttpHeader>,
    pub redirects: Vec<RedirectHop>,
    /// Method of the request that produced this response
    pub method: FetchMethod,
    pub truncated: bool,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}
