//! Shared fixtures for the engine integration tests.
//!
//! `ScriptedTransport` stands in for the network in the scenario tests;
//! `CaptureResponder` is the wiremock side for the reqwest transport tests.

#![allow(dead_code)]

use async_trait::async_trait;
use hookrelay_core::entities::subscription::{CreateSubscription, Subscription};
use hookrelay_core::events::TerminalFailure;
use hookrelay_core::framework::SubscriptionRegistry;
use hookrelay_core::processors::{Dispatcher, FailureNotifier};
use hookrelay_core::transport::{DeliveryRequest, DeliveryTransport, TransportError};
use kanau::processor::Processor;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use wiremock::{Request, Respond, ResponseTemplate};

pub const OWNER_A: &str = "owner-a";
pub const OWNER_B: &str = "owner-b";
pub const SECRET: &str = "whsec_test_secret_key_12345";

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    NetworkError,
    /// Never answers; only the attempt timeout ends the call.
    Hang,
}

/// A transport that plays back scripted replies, then repeats `fallback`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<(Instant, DeliveryRequest)>>,
}

impl ScriptedTransport {
    pub fn always(reply: Reply) -> Arc<Self> {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn requests(&self) -> Vec<DeliveryRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl DeliveryTransport for ScriptedTransport {
    async fn send(&self, request: DeliveryRequest) -> Result<u16, TransportError> {
        self.calls.lock().unwrap().push((Instant::now(), request));
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Status(status) => Ok(status),
            Reply::NetworkError => Err(TransportError::Network("connection refused".into())),
            Reply::Hang => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    failures: Mutex<Vec<TerminalFailure>>,
}

impl RecordingNotifier {
    pub fn failures(&self) -> Vec<TerminalFailure> {
        self.failures.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureNotifier for RecordingNotifier {
    async fn notify(&self, failure: TerminalFailure) {
        self.failures.lock().unwrap().push(failure);
    }
}

// ---------------------------------------------------------------------------
// Engine harness
// ---------------------------------------------------------------------------

pub struct Engine {
    pub dispatcher: Dispatcher,
    pub registry: SubscriptionRegistry,
    pub notifier: Arc<RecordingNotifier>,
    pub shutdown_tx: watch::Sender<bool>,
    pub worker: JoinHandle<()>,
}

impl Engine {
    /// Build an engine over `transport` and spawn its worker.
    pub fn start(transport: Arc<dyn DeliveryTransport>) -> Self {
        let registry = SubscriptionRegistry::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, worker) = Dispatcher::new(registry.clone(), transport, notifier.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(worker.run(shutdown_rx));
        Engine {
            dispatcher,
            registry,
            notifier,
            shutdown_tx,
            worker,
        }
    }

    /// Drop the dispatcher and wait until the worker has drained every
    /// queued job and pending retry.
    pub async fn drain(self) -> (SubscriptionRegistry, Arc<RecordingNotifier>) {
        let Engine {
            dispatcher,
            registry,
            notifier,
            shutdown_tx,
            worker,
        } = self;
        drop(dispatcher);
        worker.await.unwrap();
        drop(shutdown_tx);
        (registry, notifier)
    }

    pub async fn subscribe(&self, create: CreateSubscription) -> Subscription {
        self.registry.process(create).await.unwrap()
    }
}

pub fn create(owner: &str, url: &str, events: &[&str]) -> CreateSubscription {
    let mut create = CreateSubscription::new(
        owner,
        url,
        events.iter().map(|e| e.to_string()).collect(),
    );
    create.secret = Some(SECRET.to_string());
    create
}

// ---------------------------------------------------------------------------
// CaptureResponder - wiremock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

/// Captures every request and answers with a fixed status.
#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    response: ResponseTemplate,
}

impl CaptureResponder {
    pub fn with_status(status: u16) -> Self {
        Self::with_template(ResponseTemplate::new(status))
    }

    pub fn with_template(response: ResponseTemplate) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let captured = CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        };
        self.requests.lock().unwrap().push(captured);
        self.response.clone()
    }
}
