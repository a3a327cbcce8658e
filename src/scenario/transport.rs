//! HTTP transport used by the scenario runner

use async_trait::async_trait;
use reqwest::{redirect, Client, Method};
use std::collections::BTreeMap;

use crate::common::{Error, Result};

/// A fully rendered request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub cert_validate: bool,
}

/// A received response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Lower-cased header names; repeated headers are joined with ", "
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Sends one request and returns the response
///
/// Errors are transport failures only: any HTTP status is a response.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport backed by reqwest
///
/// Redirects are not followed so scenarios can assert on them and read
/// `$LOCATION`.
pub struct ReqwestTransport {
    verified: Client,
    unverified: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let build = |accept_invalid: bool| {
            Client::builder()
                .user_agent(concat!("telemetry-scenarios/", env!("CARGO_PKG_VERSION")))
                .redirect(redirect::Policy::none())
                .danger_accept_invalid_certs(accept_invalid)
                .build()
                .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))
        };
        Ok(Self {
            verified: build(false)?,
            unverified: build(true)?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = if request.cert_validate {
            &self.verified
        } else {
            &self.unverified
        };

        let mut builder = client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
