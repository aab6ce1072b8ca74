use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{GenerationError, GenerationRequest, Generator};
use crate::resilient::{ResilientClient, RetryPolicy};
use crate::types::{ClaimVerdict, Verdict};

type Handler = Box<dyn Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync>;

pub struct FakeGenerator {
    // maps each request to a reply or an upstream error
    handler: Handler,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(handler: impl Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self { handler: Box::new(handler), prompts: Mutex::new(Vec::new()) })
    }

    pub fn always(reply: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(reply.to_string()))
    }

    pub fn always_owned(reply: String) -> Arc<Self> {
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Every call fails with a quota error.
    pub fn unavailable() -> Arc<Self> {
        Self::new(|_| Err(GenerationError::with_status(429, "RESOURCE_EXHAUSTED: quota exceeded")))
    }

    pub fn resilient(self: Arc<Self>) -> ResilientClient {
        ResilientClient::new(self, RetryPolicy::default())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        (self.handler)(request)
    }
}

pub fn verdicts(labels: &[Verdict]) -> Vec<ClaimVerdict> {
    labels
        .iter()
        .enumerate()
        .map(|(i, v)| ClaimVerdict {
            claim: format!("claim number {i}"),
            verdict: *v,
            confidence: Some(0.7),
            explanation: format!("explanation {i}"),
            evidence_points: Vec::new(),
        })
        .collect()
}

/// Serves `app` on an ephemeral local port.
pub async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}
