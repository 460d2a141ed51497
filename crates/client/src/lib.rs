//! airshipUI Client Library
//!
//! Socket transport, message dispatch, session state, the authentication
//! guard, and the view models of the airshipUI operator console.

pub mod auth;
pub mod backoff;
pub mod client;
pub mod config;
pub mod notify;
pub mod router;
pub mod session;
pub mod transport;
pub mod views;

pub use auth::{Affordances, AuthGuard, AuthState, MemoryNavigator, NavigationEvent, Navigator};
pub use client::Client;
pub use config::ClientConfig;
pub use notify::{Level, Notifier, TracingNotifier};
pub use router::{Delivery, Receiver, Registration, Router};
pub use session::{CachedToken, FileTokenStore, MemoryTokenStore, SessionState, TokenStore};
pub use transport::{
    ConnectionState, Connector, FrameSink, FrameSource, Outbox, Transport, TransportHandle,
    WsConnector,
};
pub use views::{View, ViewContext};
