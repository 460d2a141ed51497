//! Source editor shared by the document and phase views
//!
//! A save is not trusted until the backend echoes the written content
//! back. Until then the save control stays disabled, and it stays disabled
//! after a failed write.

use airshipui_common::{new_request_id, sub, Channel, Envelope, Result};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct YamlEditor {
    doc_id: Option<String>,
    title: Option<String>,
    code: String,
    visible: bool,
    save_disabled: bool,
    awaiting: Option<String>,
}

impl YamlEditor {
    pub fn new() -> Self {
        Self {
            save_disabled: true,
            ..Default::default()
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }

    pub fn save_disabled(&self) -> bool {
        self.save_disabled
    }

    pub fn is_awaiting_echo(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Open a fetched document.
    pub fn load(&mut self, envelope: &Envelope) -> Result<()> {
        self.code = envelope.yaml_text()?.unwrap_or_default();
        self.doc_id = envelope.id.clone();
        self.title = envelope.name.clone();
        self.visible = true;
        self.save_disabled = true;
        self.awaiting = None;
        Ok(())
    }

    /// Local edit. Enables saving unless a save is still unconfirmed.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.code = text.into();
        if self.awaiting.is_none() {
            self.save_disabled = false;
        }
    }

    /// Build the write request and lock the editor until it is echoed.
    pub fn begin_save(&mut self, channel: Channel, component: &str) -> Option<Envelope> {
        if self.save_disabled || !self.visible {
            return None;
        }
        let request_id = new_request_id();
        let mut envelope = Envelope::request(channel, component, sub::YAML_WRITE)
            .with_yaml_text(&self.code);
        envelope.id = self.doc_id.clone();
        envelope.name = self.title.clone();
        envelope.request_id = Some(request_id.clone());
        self.awaiting = Some(request_id);
        self.save_disabled = true;
        Some(envelope)
    }

    /// Apply the backend's echo of a write. Returns false when no save is
    /// outstanding or the echo answers some other request.
    pub fn confirm(&mut self, envelope: &Envelope) -> Result<bool> {
        let Some(waiting) = &self.awaiting else {
            debug!("Ignoring write echo with no save outstanding");
            return Ok(false);
        };
        if let Some(echoed) = &envelope.request_id {
            if waiting != echoed {
                debug!("Ignoring write echo for request {}", echoed);
                return Ok(false);
            }
        }
        self.code = envelope.yaml_text()?.unwrap_or_default();
        if envelope.id.is_some() {
            self.doc_id = envelope.id.clone();
        }
        if envelope.name.is_some() {
            self.title = envelope.name.clone();
        }
        self.awaiting = None;
        self.save_disabled = true;
        Ok(true)
    }

    /// A write failed. Saving stays disabled until the next edit.
    pub fn fail(&mut self) {
        self.awaiting = None;
        self.save_disabled = true;
    }

    pub fn close(&mut self) {
        *self = Self::new();
    }
}
