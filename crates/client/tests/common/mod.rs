//! Shared doubles for client integration tests
#![allow(dead_code)]

use airshipui_client::{
    ClientConfig, Connector, FrameSink, FrameSource, Level, Navigator, Notifier, Outbox,
};
use airshipui_common::{component, Channel, Envelope, Error, Result, PROTOCOL_VERSION};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(Level, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, text: &str) {
        self.seen.lock().push((level, text.to_string()));
    }
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<(Level, String)> {
        self.seen.lock().clone()
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, t)| t.clone())
            .collect()
    }
}

pub struct RecordingNavigator {
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(route: &str) -> Arc<Self> {
        Arc::new(Self {
            history: Mutex::new(vec![route.to_string()]),
        })
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn navigations(&self) -> usize {
        self.history.lock().len() - 1
    }
}

impl Navigator for RecordingNavigator {
    fn current_route(&self) -> String {
        self.history.lock().last().cloned().unwrap_or_default()
    }

    fn navigate(&self, route: &str) {
        self.history.lock().push(route.to_string());
    }
}

/// Outbox that only records
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<Envelope>>,
}

impl Outbox for RecordingOutbox {
    fn send(&self, envelope: Envelope) -> Result<String> {
        self.sent.lock().push(envelope);
        Ok(airshipui_common::new_request_id())
    }
}

impl RecordingOutbox {
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().clone()
    }
}

/// Backend side of one in-memory connection
pub struct ServerEnd {
    pub from_client: mpsc::UnboundedReceiver<String>,
    pub to_client: mpsc::UnboundedSender<String>,
}

impl ServerEnd {
    pub async fn recv(&mut self) -> Envelope {
        let text = self.from_client.recv().await.expect("client hung up");
        Envelope::from_json(&text).expect("client sent invalid json")
    }

    /// Everything already written by the client
    pub fn drain(&mut self) -> Vec<Envelope> {
        let mut out = Vec::new();
        while let Ok(text) = self.from_client.try_recv() {
            out.push(Envelope::from_json(&text).expect("client sent invalid json"));
        }
        out
    }

    pub fn push(&self, envelope: &Envelope) {
        self.push_raw(&envelope.to_json().unwrap());
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.to_client.send(text.to_string());
    }

    /// Answer the initialize request with `version`.
    pub async fn handshake(&mut self, version: Option<u32>) -> Envelope {
        let init = self.recv().await;
        assert_eq!(init.route_key().component, component::INITIALIZE);
        let mut reply = Envelope::new(Channel::Ui, component::INITIALIZE);
        reply.version = version;
        reply.session_id = Some("session-1".to_string());
        self.push(&reply);
        init
    }

    pub async fn accept(&mut self) -> Envelope {
        self.handshake(Some(PROTOCOL_VERSION)).await
    }
}

struct ChannelSink(Option<mpsc::UnboundedSender<String>>);

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        match &self.0 {
            Some(tx) => tx.send(text).map_err(|_| Error::ConnectionClosed),
            None => Err(Error::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.0 = None;
        Ok(())
    }
}

struct ChannelSource(mpsc::UnboundedReceiver<String>);

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_text(&mut self) -> Option<Result<String>> {
        self.0.recv().await.map(Ok)
    }
}

/// Connector handing each connection's backend side to the test
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<ServerEnd>,
    refusing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            accepted: tx,
            refusing: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        });
        (connector, rx)
    }

    pub fn refuse(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refusing.load(Ordering::SeqCst) {
            return Err(Error::WebSocket("connection refused".to_string()));
        }
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        self.accepted
            .send(ServerEnd {
                from_client: server_rx,
                to_client: server_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;
        Ok((
            Box::new(ChannelSink(Some(client_tx))),
            Box::new(ChannelSource(client_rx)),
        ))
    }
}

/// Defaults with quick reconnects
pub fn test_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.backoff.initial_ms = 10;
    config.backoff.max_ms = 100;
    config.backoff.jitter = 0.0;
    config
}
