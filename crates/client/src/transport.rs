//! The single backend connection
//!
//! `Transport` owns the socket and runs as one task: connect, handshake,
//! then a loop over inbound frames, the outbound queue and the keep-alive
//! timer. `TransportHandle` is the cheap cloneable side used by views.
//!
//! Sends are queued and never dropped. While disconnected they wait in the
//! queue; an envelope whose write failed is retried first on the next
//! connection.

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::config::TransportConfig;
use crate::router::Router;
use crate::session::SessionState;
use airshipui_common::{
    component, new_request_id, now_millis, Channel, Envelope, Error, Result, PROTOCOL_VERSION,
};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Connection state as seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Gave up for good, e.g. after a protocol mismatch
    Failed,
}

/// Write half of an open connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Read half of an open connection. `None` means the peer closed.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_text(&mut self) -> Option<Result<String>>;
}

/// Opens connections to the backend
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connector for `ws://` and `wss://` endpoints
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| Error::InvalidConfig(format!("endpoint {}: {}", endpoint, e)))?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)> {
        let (stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        let (writer, reader) = stream.split();
        Ok((Box::new(WsSink { writer }), Box::new(WsSource { reader })))
    }
}

struct WsSink {
    writer: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.writer
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))
    }
}

struct WsSource {
    reader: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.reader.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                Ok(Message::Ping(payload)) => trace!("ping ({} bytes)", payload.len()),
                Ok(Message::Pong(_)) | Ok(Message::Binary(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(Error::WebSocket(e.to_string()))),
            }
        }
    }
}

/// Stamp protocol version and correlation id, returning the id.
fn stamp_request(envelope: &mut Envelope) -> String {
    envelope.version = Some(PROTOCOL_VERSION);
    envelope
        .request_id
        .get_or_insert_with(new_request_id)
        .clone()
}

/// Anything that accepts outgoing envelopes
pub trait Outbox: Send + Sync {
    /// Queue `envelope` and return its correlation id.
    fn send(&self, envelope: Envelope) -> Result<String>;
}

/// Sending side of the transport
#[derive(Clone)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<Envelope>,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
}

impl TransportHandle {
    /// Queue an envelope for delivery and return its correlation id.
    pub fn send(&self, mut envelope: Envelope) -> Result<String> {
        if self.shutdown.is_cancelled() {
            return Err(Error::TransportClosed);
        }
        let request_id = stamp_request(&mut envelope);
        trace!("queue {} ({})", envelope.route_key(), envelope.sub());
        self.outbound
            .send(envelope)
            .map_err(|_| Error::TransportClosed)?;
        Ok(request_id)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until a connection is open.
    pub async fn wait_connected(&self) -> Result<()> {
        let mut state = self.state.clone();
        loop {
            match *state.borrow_and_update() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Failed => return Err(Error::TransportClosed),
                _ => {}
            }
            state.changed().await.map_err(|_| Error::TransportClosed)?;
        }
    }

    /// Stop the transport. Queued envelopes not yet written are discarded.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Outbox for TransportHandle {
    fn send(&self, envelope: Envelope) -> Result<String> {
        TransportHandle::send(self, envelope)
    }
}

enum Exit {
    Shutdown,
    Closed,
}

/// Connection owner. Consumed by `run`.
pub struct Transport {
    connector: Arc<dyn Connector>,
    router: Router,
    session: Arc<SessionState>,
    config: TransportConfig,
    backoff: Backoff,
    outbound: mpsc::UnboundedReceiver<Envelope>,
    pending: VecDeque<Envelope>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
    failures: u32,
}

impl Transport {
    pub fn new(
        connector: Arc<dyn Connector>,
        router: Router,
        session: Arc<SessionState>,
        config: &ClientConfig,
    ) -> (Self, TransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let shutdown = CancellationToken::new();

        let transport = Self {
            connector,
            router,
            session,
            config: config.transport.clone(),
            backoff: Backoff::new(config.backoff.clone()),
            outbound: outbound_rx,
            pending: VecDeque::new(),
            state: state_tx,
            shutdown: shutdown.clone(),
            failures: 0,
        };
        let handle = TransportHandle {
            outbound: outbound_tx,
            state: state_rx,
            shutdown,
        };
        (transport, handle)
    }

    /// Run the connection loop on its own task.
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Connect, serve, and reconnect until shut down or a terminal error.
    pub async fn run(mut self) -> Result<()> {
        let result = self.run_inner().await;
        self.shutdown.cancel();
        result
    }

    async fn run_inner(&mut self) -> Result<()> {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.connect() => result,
            };

            match connected {
                Ok((sink, source, early)) => {
                    self.failures = 0;
                    self.backoff.reset();
                    self.set_state(ConnectionState::Connected);
                    info!("Connected to backend");

                    let outcome = self.serve(sink, source, early).await;
                    self.set_state(ConnectionState::Disconnected);
                    match outcome {
                        Ok(Exit::Shutdown) => break,
                        Ok(Exit::Closed) => warn!("Backend closed the connection"),
                        Err(e) => warn!("Connection lost: {}", e),
                    }
                }
                Err(e) if e.is_terminal() => {
                    error!("Giving up on backend: {}", e);
                    self.set_state(ConnectionState::Failed);
                    self.router.notifier().error(&e.to_string());
                    return Err(e);
                }
                Err(e) => {
                    self.failures += 1;
                    warn!("Connect attempt {} failed: {}", self.failures, e);
                    self.set_state(ConnectionState::Disconnected);
                    if self.failures == self.config.notify_after_failures {
                        self.router.notifier().warning(&format!(
                            "Unable to reach the backend after {} attempts, still retrying",
                            self.failures
                        ));
                    }
                }
            }

            let delay = self.backoff.next_delay();
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!("Transport stopped");
        Ok(())
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Open the socket and complete the initialize handshake.
    ///
    /// Returns the envelopes that arrived before and including the
    /// initialize reply, in arrival order.
    async fn connect(
        &self,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>, Vec<Envelope>)> {
        let connect_timeout = self.config.connect_timeout();
        let (mut sink, mut source) = timeout(connect_timeout, self.connector.connect())
            .await
            .map_err(|_| timeout_error("connection", connect_timeout))??;

        let mut initialize = Envelope::new(Channel::Ui, component::INITIALIZE);
        stamp_request(&mut initialize);
        self.write(sink.as_mut(), &initialize).await?;

        let handshake_timeout = self.config.handshake_timeout();
        let mut early = Vec::new();
        let reply = timeout(
            handshake_timeout,
            self.read_initialize(source.as_mut(), &mut early),
        )
        .await
        .map_err(|_| timeout_error("initialize reply", handshake_timeout))??;

        if reply.version != Some(PROTOCOL_VERSION) {
            let _ = sink.close().await;
            return Err(Error::ProtocolMismatch {
                expected: PROTOCOL_VERSION,
                found: reply.version,
            });
        }
        if let Some(id) = &reply.session_id {
            self.session.set_session_id(id.clone());
        }
        early.push(reply);
        Ok((sink, source, early))
    }

    /// Read frames until the initialize reply, keeping anything earlier.
    async fn read_initialize(
        &self,
        source: &mut dyn FrameSource,
        early: &mut Vec<Envelope>,
    ) -> Result<Envelope> {
        loop {
            let text = match source.next_text().await {
                None => return Err(Error::ConnectionClosed),
                Some(Err(e)) => return Err(e),
                Some(Ok(text)) => text,
            };
            match Envelope::from_json(&text) {
                Ok(env) if env.channel == Channel::Ui && env.component == component::INITIALIZE => {
                    return Ok(env);
                }
                Ok(env) => early.push(env),
                Err(e) => self.unreadable(&text, &e),
            }
        }
    }

    async fn serve(
        &mut self,
        mut sink: Box<dyn FrameSink>,
        mut source: Box<dyn FrameSource>,
        early: Vec<Envelope>,
    ) -> Result<Exit> {
        for envelope in &early {
            self.deliver(envelope);
        }
        self.flush(sink.as_mut()).await?;

        let interval = self.config.keepalive_interval();
        let keepalive = sleep(interval);
        tokio::pin!(keepalive);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = sink.close().await;
                    return Ok(Exit::Shutdown);
                }
                frame = source.next_text() => match frame {
                    None => return Ok(Exit::Closed),
                    Some(Err(e)) => return Err(e),
                    Some(Ok(text)) => self.on_message(&text),
                },
                queued = self.outbound.recv() => match queued {
                    // every handle is gone, nobody can send any more
                    None => {
                        let _ = sink.close().await;
                        return Ok(Exit::Shutdown);
                    }
                    Some(envelope) => {
                        self.pending.push_back(envelope);
                        self.flush(sink.as_mut()).await?;
                    }
                },
                () = &mut keepalive => {
                    self.keep_alive(sink.as_mut()).await?;
                    keepalive.as_mut().reset(Instant::now() + interval);
                }
            }
        }
    }

    /// Write everything retained, oldest first. A failed write stays queued.
    async fn flush(&mut self, sink: &mut dyn FrameSink) -> Result<()> {
        while let Some(envelope) = self.pending.front() {
            let envelope = envelope.clone();
            self.write(sink, &envelope).await?;
            self.pending.pop_front();
        }
        Ok(())
    }

    async fn keep_alive(&self, sink: &mut dyn FrameSink) -> Result<()> {
        let mut envelope = Envelope::new(Channel::Ui, component::KEEPALIVE);
        stamp_request(&mut envelope);
        debug!("Sending keep-alive");
        self.write(sink, &envelope).await
    }

    /// Stamp transport metadata and put one envelope on the wire.
    async fn write(&self, sink: &mut dyn FrameSink, envelope: &Envelope) -> Result<()> {
        let mut envelope = envelope.clone();
        envelope.timestamp = Some(now_millis());
        if let Some(session_id) = self.session.session_id() {
            envelope.session_id = Some(session_id);
        }
        if envelope.token.is_none() {
            envelope.token = self.session.bearer();
        }
        let text = envelope.to_json()?;
        trace!("send {}", text);
        sink.send_text(text).await
    }

    fn on_message(&self, text: &str) {
        match Envelope::from_json(text) {
            Ok(envelope) => self.deliver(&envelope),
            Err(e) => self.unreadable(text, &e),
        }
    }

    fn deliver(&self, envelope: &Envelope) {
        if self.session.session_id().is_none() {
            if let Some(id) = &envelope.session_id {
                self.session.set_session_id(id.clone());
            }
        }
        let delivery = self.router.dispatch(envelope);
        trace!("{} -> {:?}", envelope.route_key(), delivery);
    }

    fn unreadable(&self, text: &str, e: &Error) {
        warn!("Unreadable frame ({}): {}", e, truncate(text, 200));
        self.router
            .notifier()
            .info(&format!("Received an unreadable message from the backend: {}", e));
    }
}

fn timeout_error(what: &str, after: Duration) -> Error {
    Error::Timeout {
        what: what.to_string(),
        millis: after.as_millis() as u64,
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_request_keeps_caller_id() {
        let mut env = Envelope::new(Channel::Ctl, component::SECRET).with_id("x");
        env.request_id = Some("caller".to_string());
        assert_eq!(stamp_request(&mut env), "caller");
        assert_eq!(env.version, Some(PROTOCOL_VERSION));

        let mut fresh = Envelope::new(Channel::Ctl, component::SECRET);
        let id = stamp_request(&mut fresh);
        assert_eq!(fresh.request_id.as_deref(), Some(id.as_str()));
        assert_eq!(id.len(), 36);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("äöü", 2), "äö");
        assert_eq!(truncate("ab", 5), "ab");
    }

    #[test]
    fn test_ws_connector_rejects_bad_endpoint() {
        assert!(WsConnector::new("not a url").is_err());
        let connector = WsConnector::new("ws://127.0.0.1:10443/ws").unwrap();
        assert_eq!(connector.url().port(), Some(10443));
    }
}
