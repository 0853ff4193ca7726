//! Retrieval of the raw entry list.
//!
//! A [`TextSource`] runs an ordered list of [`RetrievalStrategy`] values over a
//! single [`Transport`]. Each strategy rewrites the canonical locator and
//! interprets the response body; the transport only performs the GET.

use crate::config::{RetrievalPolicy, ViewerConfig};
use crate::error::FetchError;
use crate::telemetry::Telemetry;
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("namegrid-rs/", env!("CARGO_PKG_VERSION"));

/// The HTTP primitive: fetch a URL and return its body as text.
///
/// Implementations return [`FetchError::Http`] for non-success statuses and
/// [`FetchError::Network`] when no response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// One way of reaching the canonical resource.
pub trait RetrievalStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Rewrites the canonical locator into the URL actually requested.
    fn locator(&self, canonical: &str) -> String;

    /// Extracts the entry text from a successful response body.
    fn parse(&self, body: String) -> Result<String, FetchError> {
        Ok(body)
    }
}

/// Requests the locator as-is.
#[derive(Debug, Clone, Default)]
pub struct Direct;

impl RetrievalStrategy for Direct {
    fn name(&self) -> &str {
        "direct"
    }

    fn locator(&self, canonical: &str) -> String {
        canonical.to_string()
    }
}

/// Proxy that takes the target URL as a path suffix.
#[derive(Debug, Clone)]
pub struct PathProxy {
    base: String,
}

impl PathProxy {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl RetrievalStrategy for PathProxy {
    fn name(&self) -> &str {
        "path-proxy"
    }

    fn locator(&self, canonical: &str) -> String {
        format!("{}{}", self.base, canonical)
    }
}

/// Proxy that takes the encoded target URL as a query value and answers with
/// a JSON envelope carrying the text in `contents`.
#[derive(Debug, Clone)]
pub struct EnvelopeProxy {
    base: String,
}

impl EnvelopeProxy {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

#[derive(Deserialize)]
struct Envelope {
    contents: Option<serde_json::Value>,
}

impl RetrievalStrategy for EnvelopeProxy {
    fn name(&self) -> &str {
        "envelope-proxy"
    }

    fn locator(&self, canonical: &str) -> String {
        format!(
            "{}{}",
            self.base,
            utf8_percent_encode(canonical, NON_ALPHANUMERIC)
        )
    }

    fn parse(&self, body: String) -> Result<String, FetchError> {
        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|err| FetchError::MalformedEnvelope(err.to_string()))?;
        match envelope.contents {
            Some(serde_json::Value::String(text)) => Ok(text),
            Some(_) => Err(FetchError::MalformedEnvelope(
                "`contents` is not a string".to_string(),
            )),
            None => Err(FetchError::MalformedEnvelope(
                "missing `contents` field".to_string(),
            )),
        }
    }
}

/// Ordered retrieval over one transport.
#[derive(Clone)]
pub struct TextSource {
    transport: Arc<dyn Transport>,
    policy: RetrievalPolicy,
    strategies: Arc<Vec<Box<dyn RetrievalStrategy>>>,
    telemetry: Option<Telemetry>,
}

impl TextSource {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: RetrievalPolicy,
        strategies: Vec<Box<dyn RetrievalStrategy>>,
    ) -> Self {
        Self {
            transport,
            policy,
            strategies: Arc::new(strategies),
            telemetry: None,
        }
    }

    /// A single direct request whose failure is reported unchanged.
    pub fn single_source(transport: Arc<dyn Transport>) -> Self {
        Self::new(transport, RetrievalPolicy::Single, vec![Box::new(Direct)])
    }

    /// Direct request, then the path proxy, then the envelope proxy.
    pub fn fallback_chain(
        transport: Arc<dyn Transport>,
        path_proxy: &str,
        envelope_proxy: &str,
    ) -> Self {
        Self::new(
            transport,
            RetrievalPolicy::Fallback,
            vec![
                Box::new(Direct),
                Box::new(PathProxy::new(path_proxy)),
                Box::new(EnvelopeProxy::new(envelope_proxy)),
            ],
        )
    }

    /// Builds the source described by `config` over `transport`.
    pub fn from_config(config: &ViewerConfig, transport: Arc<dyn Transport>) -> Self {
        match config.policy {
            RetrievalPolicy::Single => Self::single_source(transport),
            RetrievalPolicy::Fallback => {
                Self::fallback_chain(transport, &config.path_proxy, &config.envelope_proxy)
            }
        }
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Fetches the text behind `locator`.
    pub async fn resolve(&self, locator: &str) -> Result<String, FetchError> {
        match self.policy {
            RetrievalPolicy::Single => {
                let strategy = self
                    .strategies
                    .first()
                    .ok_or(FetchError::FetchExhausted { attempts: 0 })?;
                self.attempt(strategy.as_ref(), locator).await
            }
            RetrievalPolicy::Fallback => self.resolve_chain(locator).await,
        }
    }

    async fn resolve_chain(&self, locator: &str) -> Result<String, FetchError> {
        for strategy in self.strategies.iter() {
            match self.attempt(strategy.as_ref(), locator).await {
                Ok(text) if text.trim().is_empty() => {
                    debug!(strategy = strategy.name(), "empty payload, trying next strategy");
                }
                Ok(text) => return Ok(text),
                Err(err) => {
                    debug!(strategy = strategy.name(), error = %err, "strategy failed");
                }
            }
        }
        warn!(
            attempts = self.strategies.len(),
            locator, "every retrieval strategy failed"
        );
        Err(FetchError::FetchExhausted {
            attempts: self.strategies.len(),
        })
    }

    async fn attempt(
        &self,
        strategy: &dyn RetrievalStrategy,
        locator: &str,
    ) -> Result<String, FetchError> {
        let url = strategy.locator(locator);
        debug!(strategy = strategy.name(), %url, "requesting entry list");
        let result = match self.transport.get_text(&url).await {
            Ok(body) => strategy.parse(body),
            Err(err) => Err(err),
        };
        if let Some(telemetry) = &self.telemetry {
            let succeeded = matches!(&result, Ok(text) if !text.trim().is_empty());
            telemetry.record_strategy_attempt(strategy.name(), succeeded);
        }
        result
    }
}

/// [`Transport`] backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Network(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}
