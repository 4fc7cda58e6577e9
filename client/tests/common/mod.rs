#![allow(dead_code)]

use async_trait::async_trait;
use dumpview_client::{Method, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

type Responder = Box<dyn Fn(usize, &Call) -> (Duration, Result<Value, TransportError>) + Send + Sync>;

struct Route {
    prefix: String,
    hits: usize,
    respond: Arc<Responder>,
}

/// Scripted backend: each route answers by path prefix, after a chosen delay.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    routes: Mutex<Vec<Route>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn route<F>(&self, prefix: &str, respond: F)
    where
        F: Fn(usize, &Call) -> (Duration, Result<Value, TransportError>) + Send + Sync + 'static,
    {
        self.routes.lock().push(Route { prefix: prefix.to_string(), hits: 0, respond: Arc::new(Box::new(respond)) });
    }

    pub fn json(&self, prefix: &str, value: Value) {
        self.route(prefix, move |_, _| (Duration::from_millis(10), Ok(value.clone())));
    }

    pub fn calls(&self) -> Vec<Call> { self.calls.lock().clone() }

    pub fn paths(&self) -> Vec<String> { self.calls().into_iter().map(|c| c.path).collect() }
}

#[async_trait]
impl Transport for MockBackend {
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, TransportError> {
        let call = Call { method, path: path.to_string(), body: body.cloned() };
        self.calls.lock().push(call.clone());
        let found = {
            let mut routes = self.routes.lock();
            routes.iter_mut().find(|r| path.starts_with(&r.prefix)).map(|r| {
                r.hits += 1;
                (r.hits - 1, r.respond.clone())
            })
        };
        let Some((nth, respond)) = found else {
            return Err(TransportError::Status { status: 404, body: path.to_string() });
        };
        let (delay, reply) = respond(nth, &call);
        tokio::time::sleep(delay).await;
        reply
    }
}
