//! The outbound HTTP seam.
//!
//! The executor only needs "POST these bytes, tell me the status". Tests
//! swap in scripted transports; production uses [`ReqwestTransport`].

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// One outbound POST.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
    /// Upper bound for the whole exchange.
    pub timeout: Duration,
}

impl DeliveryRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Network(String),
}

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Send the request and return the response status code.
    ///
    /// Any status is `Ok`; interpreting it is the caller's job.
    async fn send(&self, request: DeliveryRequest) -> Result<u16, TransportError>;
}

/// `reqwest` backed transport sharing one connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryTransport for ReqwestTransport {
    async fn send(&self, request: DeliveryRequest) -> Result<u16, TransportError> {
        let mut builder = self
            .client
            .post(request.url)
            .timeout(request.timeout)
            .body(request.body);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Network(e.to_string())
            }
        })?;
        Ok(response.status().as_u16())
    }
}
