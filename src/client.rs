//! Signed HTTP wire layer.
//!
//! Every operation opens one fresh connection: the client is built per
//! call with pooling disabled and a `none` redirect policy, and both
//! connect and read timeouts fixed from configuration.  The `Date` value
//! used for the header is the same string handed to the signer — a
//! mismatch would break signature verification.

use std::time::{Duration, SystemTime};

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST};
use reqwest::{Method, Url};
use tracing::debug;

use crate::config::StoreConfig;
use crate::errors::{classify_status, StatusClass, StoreError};
use crate::signer::{self, Realm};

/// One HTTP exchange, fully read.
#[derive(Debug)]
pub struct WireResponse {
    /// Request verb, kept for error context.
    pub verb: String,
    /// Full request URL.
    pub url: String,
    /// Response status code.
    pub status: u16,
    /// Canonical status text, empty when unknown.
    pub status_text: String,
    /// Response `Content-Type`, empty when absent.
    pub content_type: String,
    /// Response body; empty for HEAD, for unread success bodies, and when
    /// the error stream was unavailable.
    pub body: String,
}

impl WireResponse {
    /// Classify this response's status.
    pub fn class(&self) -> StatusClass {
        classify_status(self.status)
    }

    /// Build the store error for a non-2xx response.
    ///
    /// 404 maps to [`StoreError::NotFound`]; operations that treat 404 as
    /// a generic failure (writes) use [`WireResponse::request_error`]
    /// directly.
    pub fn store_error(self) -> StoreError {
        match self.class() {
            StatusClass::NotFound => StoreError::NotFound,
            StatusClass::Redirect => self.redirect_error(),
            _ => self.request_error(),
        }
    }

    /// The redirect-unsupported error for this response.
    pub fn redirect_error(&self) -> StoreError {
        StoreError::RedirectUnsupported {
            status: self.status,
            status_text: self.status_text.clone(),
        }
    }

    /// The generic request error for this response, carrying verb, URL,
    /// status, and error body.
    pub fn request_error(self) -> StoreError {
        StoreError::Request {
            verb: self.verb,
            url: self.url,
            status: self.status,
            status_text: self.status_text,
            body: self.body,
        }
    }
}

/// Per-operation signed request issuer.
pub struct WireClient<'a> {
    config: &'a StoreConfig,
    realm: Box<dyn Realm>,
}

impl<'a> WireClient<'a> {
    /// Create a wire client over read-only configuration.
    pub fn new(config: &'a StoreConfig) -> Self {
        Self {
            config,
            realm: signer::realm_for(&config.realm),
        }
    }

    /// Issue a signed request.
    ///
    /// `path` is relative to the endpoint (it may carry a query string,
    /// which is stripped for signing).  A `Some` body implies
    /// `Content-Type: application/json` and a computed `Content-Length`;
    /// a body-less PUT is the zero-length bucket-creation marker and
    /// carries `Content-Length: 0` with no content type.  Success bodies
    /// are only read when `read_body` is set; error bodies are always
    /// captured best-effort.
    pub fn execute(
        &self,
        verb: Method,
        path: &str,
        body: Option<String>,
        read_body: bool,
    ) -> Result<WireResponse, StoreError> {
        let url = self.request_url(path)?;
        let date = httpdate::fmt_http_date(SystemTime::now());
        let content_type = if body.is_some() { "application/json" } else { "" };

        let string_to_sign = signer::string_to_sign(
            verb.as_str(),
            "",
            content_type,
            &date,
            &self.config.bucket,
            path,
        );
        let authorization = self.realm.auth_header(
            &self.config.access_key,
            &self.config.secret_key,
            &string_to_sign,
        );

        let mut request = self
            .http()?
            .request(verb.clone(), url.clone())
            .header(DATE, &date)
            .header(AUTHORIZATION, authorization);
        if self.config.set_host_header {
            request = request.header(HOST, self.virtual_host()?);
        }
        match body {
            Some(b) => {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .header(CONTENT_LENGTH, b.len().to_string())
                    .body(b);
            }
            None if verb == Method::PUT => {
                request = request.header(CONTENT_LENGTH, "0");
            }
            None => {}
        }

        debug!(verb = %verb, url = %url, "issuing signed request");
        let response = request.send()?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();
        let response_content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Error bodies are read regardless of read_body so store errors
        // can carry the backend's diagnostic text.
        let wants_body = read_body || classify_status(status) != StatusClass::Success;
        let body = if verb == Method::HEAD || !wants_body {
            String::new()
        } else {
            response.text().unwrap_or_default()
        };

        Ok(WireResponse {
            verb: verb.to_string(),
            url: url.to_string(),
            status,
            status_text,
            content_type: response_content_type,
            body,
        })
    }

    /// Build a fresh blocking client: no pooling, no redirects, fixed
    /// connect/read timeouts.
    fn http(&self) -> Result<Client, StoreError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .timeout(Duration::from_secs(self.config.read_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(client)
    }

    /// Absolute request URL for a relative operation path.
    fn request_url(&self, path: &str) -> Result<Url, StoreError> {
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let full = if path.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&full).map_err(|e| StoreError::Config(format!("invalid base URL: {e}")))
    }

    /// The virtual-hosted `Host` value: `<bucket>.<endpoint host>`.
    fn virtual_host(&self) -> Result<String, StoreError> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| StoreError::Config(format!("invalid base URL: {e}")))?;
        let host = base
            .host_str()
            .ok_or_else(|| StoreError::Config("base URL has no host".to_string()))?;
        Ok(format!("{}.{}", self.config.bucket, host))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
