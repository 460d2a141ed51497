//! Feature view models
//!
//! Each view keeps its own state behind a mutex, sends requests through an
//! `Outbox`, and is fed replies by the router. A `Revision` counter stands
//! in for re-rendering: it bumps whenever visible state changes.

pub mod baremetal;
pub mod config;
pub mod document;
pub mod editor;
pub mod history;
pub mod image;
pub mod login;
pub mod phase;
pub mod secret;
pub mod shell;
pub mod task;
pub mod tree;

pub use baremetal::BaremetalView;
pub use config::ConfigView;
pub use document::DocumentView;
pub use editor::YamlEditor;
pub use history::HistoryView;
pub use image::ImageView;
pub use login::LoginView;
pub use phase::PhaseView;
pub use secret::SecretView;
pub use shell::ShellView;
pub use task::TaskTray;

use crate::notify::Notifier;
use crate::router::{Receiver, Registration, Router};
use crate::transport::Outbox;
use airshipui_common::{Envelope, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error};

/// A receiver with requests of its own to make when shown
pub trait View: Receiver {
    /// Send the initial requests
    fn on_activate(&self) -> Result<()> {
        Ok(())
    }
}

/// Register `view` and send its initial requests.
///
/// The view stays active until the returned registration is dropped.
pub fn activate<V: View + 'static>(router: &Router, view: Arc<V>) -> Result<Registration> {
    let registration = router.register(view.clone());
    view.on_activate()?;
    Ok(registration)
}

/// What every view needs to talk to the outside
#[derive(Clone)]
pub struct ViewContext {
    pub outbox: Arc<dyn Outbox>,
    pub notifier: Arc<dyn Notifier>,
}

impl ViewContext {
    pub fn new(outbox: Arc<dyn Outbox>, notifier: Arc<dyn Notifier>) -> Self {
        Self { outbox, notifier }
    }

    pub fn send(&self, envelope: Envelope) -> Result<String> {
        debug!("{} -> {}", envelope.route_key(), envelope.sub());
        self.outbox.send(envelope)
    }

    /// Show a backend failure as a notice
    pub fn show_error(&self, envelope: &Envelope) {
        if let Some(err) = &envelope.error {
            self.notifier.error(err);
        }
    }

    /// Show an envelope's text as an informational notice
    pub fn show(&self, envelope: &Envelope) {
        match &envelope.error {
            Some(err) => self.notifier.error(err),
            None => self.notifier.info(&envelope.summary()),
        }
    }

    /// Log an operation the view has no handling for
    pub fn unhandled(&self, view: &str, envelope: &Envelope) {
        error!("{} message sub component not handled: {:?}", view, envelope.sub());
    }
}

/// Change counter observers can wait on
#[derive(Clone)]
pub struct Revision {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for Revision {
    fn default() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }
}

impl Revision {
    pub fn bump(&self) {
        self.tx.send_modify(|rev| *rev += 1);
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

/// Whether `envelope` answers the request `waiting` for. Replies that do
/// not echo a request id are taken as answers.
pub(crate) fn answers(waiting: Option<&str>, envelope: &Envelope) -> bool {
    match (waiting, envelope.request_id.as_deref()) {
        (None, _) => false,
        (Some(expected), Some(echoed)) => expected == echoed,
        (Some(_), None) => true,
    }
}
