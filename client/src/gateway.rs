//! Outbound requests with at most one live request per logical path.
//!
//! Issuing a request cancels whatever is still pending on the same path. A
//! response is applied only if its request is still the current one for that
//! path, checked under the registry lock right before the continuation runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("undecodable response body: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("unexpected response shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Result of a request that may have been overtaken by a newer one on the same path.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Superseded,
}

impl<T> Outcome<T> {
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool { matches!(self, Outcome::Superseded) }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, TransportError>;
}

/// JSON over HTTP relative to the API base URL.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut builder = Client::builder().user_agent(concat!("dumpview/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self { client: builder.build()?, base })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        let url = self.base.join(path).map_err(|e| TransportError::Http(e.to_string()))?;
        let req = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url).json(body.unwrap_or(&Value::Object(Default::default()))),
        };
        let resp = req.send().await.map_err(|e| TransportError::Http(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status: status.as_u16(), body });
        }
        resp.json::<Value>().await.map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[derive(Default)]
struct Slot {
    ticket: u64,
    token: CancellationToken,
    loading: bool,
}

#[derive(Default)]
struct Registry {
    slots: HashMap<String, Slot>,
    next_ticket: u64,
    loader_active: bool,
}

impl Registry {
    fn any_loading(&self) -> bool { self.slots.values().any(|s| s.loading) }
}

// Clears the loading flag of a request whose future is dropped before it finishes.
struct InFlight<'a> {
    registry: &'a Mutex<Registry>,
    key: &'a str,
    ticket: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed { return; }
        let mut reg = self.registry.lock();
        if let Some(slot) = reg.slots.get_mut(self.key).filter(|s| s.ticket == self.ticket) {
            slot.loading = false;
            slot.token.cancel();
        }
        reg.loader_active = reg.any_loading();
    }
}

/// Logical path of a request: the query string does not make a new slot.
pub fn slot_key(path: &str) -> &str { path.split('?').next().unwrap_or(path) }

pub struct Gateway {
    transport: Arc<dyn Transport>,
    registry: Mutex<Registry>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self { Self { transport, registry: Mutex::new(Registry::default()) } }

    pub fn http(base: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(base, timeout)?)))
    }

    pub fn is_loading(&self, path: &str) -> bool {
        self.registry.lock().slots.get(slot_key(path)).map_or(false, |s| s.loading)
    }

    /// Coarse busy indicator; dropped to false by any transport failure.
    pub fn loader_active(&self) -> bool { self.registry.lock().loader_active }

    /// Drop the coarse indicator after a response that arrived but could not be used.
    pub fn clear_loader(&self) { self.registry.lock().loader_active = false; }

    pub fn loading_snapshot(&self) -> HashMap<String, bool> {
        self.registry.lock().slots.iter().map(|(k, s)| (k.clone(), s.loading)).collect()
    }

    fn issue(&self, key: &str) -> (u64, CancellationToken) {
        let mut reg = self.registry.lock();
        reg.next_ticket += 1;
        let ticket = reg.next_ticket;
        let token = CancellationToken::new();
        let prev = reg.slots.insert(key.to_string(), Slot { ticket, token: token.clone(), loading: true });
        if let Some(prev) = prev {
            if prev.loading {
                debug!(path = key, ticket = prev.ticket, "cancelling superseded request");
            }
            prev.token.cancel();
        }
        reg.loader_active = true;
        (ticket, token)
    }

    /// Send a request and hand the decoded body to `apply` if this request is
    /// still current for its path. `apply` runs under the registry lock and
    /// must not call back into the gateway.
    pub async fn request_then<F, R>(&self, path: &str, method: Method, body: Option<Value>, apply: F) -> Result<Outcome<R>, GatewayError>
    where
        F: FnOnce(Value) -> R,
    {
        let key = slot_key(path);
        let (ticket, token) = self.issue(key);
        let mut guard = InFlight { registry: &self.registry, key, ticket, armed: true };

        let sent = tokio::select! {
            _ = token.cancelled() => {
                guard.armed = false;
                debug!(path, "[STOP] request superseded");
                return Ok(Outcome::Superseded);
            }
            r = self.transport.send(method, path, body.as_ref()) => r,
        };
        guard.armed = false;

        let mut reg = self.registry.lock();
        let Some(slot) = reg.slots.get_mut(key).filter(|s| s.ticket == ticket) else {
            debug!(path, "[STOP] response of superseded request discarded");
            return Ok(Outcome::Superseded);
        };
        slot.loading = false;
        match sent {
            Ok(value) => {
                reg.loader_active = reg.any_loading();
                Ok(Outcome::Done(apply(value)))
            }
            Err(e) => {
                reg.loader_active = false;
                warn!(path, error = %e, "[ERROR] request failed");
                Err(e.into())
            }
        }
    }

    pub async fn request(&self, path: &str, method: Method, body: Option<Value>) -> Result<Outcome<Value>, GatewayError> {
        self.request_then(path, method, body, |v| v).await
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<Outcome<R>, GatewayError> {
        match self.request(path, Method::Get, None).await? {
            Outcome::Done(v) => Ok(Outcome::Done(serde_json::from_value(v)?)),
            Outcome::Superseded => Ok(Outcome::Superseded),
        }
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<Outcome<R>, GatewayError> {
        let body = serde_json::to_value(body)?;
        match self.request(path, Method::Post, Some(body)).await? {
            Outcome::Done(v) => Ok(Outcome::Done(serde_json::from_value(v)?)),
            Outcome::Superseded => Ok(Outcome::Superseded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_key_drops_query() {
        assert_eq!(slot_key("dump/peek?term=abc"), "dump/peek");
        assert_eq!(slot_key("nlp/process"), "nlp/process");
    }

    #[test]
    fn http_transport_normalises_base() {
        let t = HttpTransport::new("http://localhost:9090/api/v1", None).unwrap();
        assert_eq!(t.base.join("dump/fetch").unwrap().as_str(), "http://localhost:9090/api/v1/dump/fetch");
    }
}
