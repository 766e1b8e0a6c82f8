//! Fakes and socket helpers shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use qualia::api::models::ModelsResponse;
use qualia::chunker::ChunkParams;
use qualia::config::Config;
use qualia::dispatch::gateway::build_client;
use qualia::dispatch::{AskRequest, Generate, TextStream};
use qualia::error::QualiaError;
use qualia::extract::Extractor;
use qualia::orchestrator::Orchestrator;
use qualia::prompts::PromptRegistry;
use qualia::server::AppState;
use qualia::summarize::Summarize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Gateway double: records every request and replays canned tokens.
pub struct FakeGateway {
    tokens: Vec<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<AskRequest>>,
}

impl FakeGateway {
    pub fn new(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AskRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Generate for FakeGateway {
    fn ask(&self, req: AskRequest) -> TextStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(req);
        Box::pin(futures_util::stream::iter(self.tokens.clone()))
    }
}

/// Summarizer double: the n-th call (1-based) fails when listed in `fail_on`.
pub struct FakeSummarizer {
    fail_on: HashSet<usize>,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn new() -> Arc<Self> {
        Self::failing_on(&[])
    }

    pub fn failing_on(calls: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            fail_on: calls.iter().copied().collect(),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarize for FakeSummarizer {
    async fn summarize(
        &self,
        text: &str,
        min_length: u32,
        max_length: u32,
    ) -> Result<String, QualiaError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.inputs.lock().unwrap().push(text.to_string());
        if self.fail_on.contains(&n) {
            return Err(QualiaError::Upstream {
                provider: "summarizer".to_string(),
                message: "boom".to_string(),
                status: None,
            });
        }
        Ok(format!("résumé {n} ({min_length}-{max_length})"))
    }
}

pub fn orchestrator(gateway: Arc<FakeGateway>, summarizer: Arc<FakeSummarizer>) -> Orchestrator {
    Orchestrator::new(
        gateway,
        summarizer,
        Arc::new(PromptRegistry::builtin()),
        ChunkParams::default(),
    )
}

/// App state wired to fakes, with no transcription or extraction services.
pub fn app_state(gateway: Arc<FakeGateway>, summarizer: Arc<FakeSummarizer>) -> AppState {
    let config = Config::default();
    let extractor = Extractor::new(
        build_client().unwrap(),
        None,
        None,
        Duration::from_secs(5),
    );
    AppState::new(
        orchestrator(gateway.clone(), summarizer.clone()),
        gateway,
        summarizer,
        Arc::new(extractor),
        ModelsResponse::from(&config),
    )
}

/// Bind the real router on an ephemeral port; returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        qualia::server::serve(listener, state, std::future::pending())
            .await
            .unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

pub async fn collect(stream: TextStream) -> Vec<String> {
    stream.collect().await
}

/// Bind a TCP listener on localhost and return (listener, port).
pub async fn mock_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Read one HTTP request (headers plus a Content-Length body) and return it as text.
pub async fn read_request(socket: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = vec![0u8; 8192];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

/// Accept one connection, capture its request, and reply with `response` verbatim.
pub fn serve_once(listener: TcpListener, response: Vec<u8>) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.ok();
        request
    })
}
