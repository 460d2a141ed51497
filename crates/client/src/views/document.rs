//! Document pull, selection, rendering and source editing

use super::{answers, Revision, View, ViewContext, YamlEditor};
use crate::router::Receiver;
use airshipui_common::{
    component, new_request_id, sub, Channel, DocumentMode, Envelope, KustomNode, Result,
    RouteKey,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

/// Document selector as understood by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gvk: Option<Gvk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    /// Parse "group version kind", space separated.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace().map(str::to_string);
        Self {
            group: parts.next().unwrap_or_default(),
            version: parts.next().unwrap_or_default(),
            kind: parts.next().unwrap_or_default(),
        }
    }
}

impl Selector {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentState {
    pub status: String,
    pub pull_disabled: bool,
    pub target: Option<String>,
    pub selector_loading: bool,
    pub results: Vec<KustomNode>,
    pub rendered: Option<String>,
    /// request id of the outstanding rendered fetch
    pub rendering: Option<String>,
    pub editor: YamlEditor,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self {
            status: String::new(),
            pull_disabled: false,
            target: None,
            selector_loading: false,
            results: Vec::new(),
            rendered: None,
            rendering: None,
            editor: YamlEditor::new(),
        }
    }
}

pub struct DocumentView {
    ctx: ViewContext,
    state: Mutex<DocumentState>,
    revision: Revision,
}

impl DocumentView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(DocumentState::default()),
            revision: Revision::default(),
        }
    }

    pub fn snapshot(&self) -> DocumentState {
        self.state.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    fn request(sub: &str) -> Envelope {
        Envelope::request(Channel::Ctl, component::DOCUMENT, sub)
    }

    /// Pull the manifests. The pull control stays disabled until the reply.
    pub fn pull(&self) -> Result<Option<String>> {
        {
            let mut state = self.state.lock();
            if state.pull_disabled {
                return Ok(None);
            }
            state.pull_disabled = true;
            state.status.clear();
        }
        self.revision.bump();
        self.ctx.send(Self::request(sub::PULL)).map(Some)
    }

    pub fn get_target(&self) -> Result<String> {
        self.ctx.send(Self::request(sub::GET_TARGET))
    }

    pub fn get_documents_by_selector(&self, selector: &Selector) -> Result<String> {
        {
            let mut state = self.state.lock();
            state.selector_loading = true;
            state.results.clear();
        }
        self.ctx
            .send(Self::request(sub::GET_DOCUMENTS_BY_SELECTOR).with_message(selector.to_json()?))
    }

    /// Ask for the rendered form of a document for read-only viewing.
    pub fn view_rendered(&self, id: &str) -> Result<String> {
        let mut envelope = Self::request(sub::GET_YAML)
            .with_id(id)
            .with_mode(DocumentMode::Rendered);
        let request_id = new_request_id();
        envelope.request_id = Some(request_id.clone());
        {
            let mut state = self.state.lock();
            state.rendered = None;
            state.rendering = Some(request_id);
        }
        self.ctx.send(envelope)
    }

    /// Open a document's source in the editor.
    pub fn open_source(&self, id: &str) -> Result<String> {
        self.ctx.send(
            Self::request(sub::GET_YAML)
                .with_id(id)
                .with_mode(DocumentMode::Source),
        )
    }

    pub fn edit(&self, text: &str) {
        self.state.lock().editor.edit(text);
        self.revision.bump();
    }

    pub fn save(&self) -> Result<Option<String>> {
        let request = self
            .state
            .lock()
            .editor
            .begin_save(Channel::Ctl, component::DOCUMENT);
        self.revision.bump();
        match request {
            Some(envelope) => self.ctx.send(envelope).map(Some),
            None => Ok(None),
        }
    }

    pub fn close_editor(&self) {
        self.state.lock().editor.close();
        self.revision.bump();
    }

    fn on_error(&self, envelope: &Envelope) {
        self.ctx.show_error(envelope);
        let mut state = self.state.lock();
        match envelope.sub() {
            // the pull control stays disabled after a failed pull
            sub::PULL => {
                state.status = format!(
                    "Document pull failed: {}",
                    envelope.error.as_deref().unwrap_or_default()
                )
            }
            sub::YAML_WRITE => state.editor.fail(),
            sub::GET_DOCUMENTS_BY_SELECTOR => state.selector_loading = false,
            _ => {}
        }
    }

    fn on_reply(&self, envelope: &Envelope) -> Result<()> {
        let mut state = self.state.lock();
        match envelope.sub() {
            sub::PULL => {
                state.status = format!(
                    "Document pull was a {}",
                    envelope.message.as_deref().unwrap_or_default()
                );
                state.pull_disabled = false;
            }
            sub::GET_TARGET => state.target = envelope.message.clone(),
            sub::GET_DOCUMENTS_BY_SELECTOR => {
                state.selector_loading = false;
                state.results = envelope.data_as()?.unwrap_or_default();
            }
            sub::GET_YAML => match envelope.mode {
                Some(DocumentMode::Source) => state.editor.load(envelope)?,
                _ => {
                    if !answers(state.rendering.as_deref(), envelope) {
                        debug!("Ignoring stale rendered document");
                        return Ok(());
                    }
                    state.rendering = None;
                    state.rendered = envelope.yaml_text()?;
                }
            },
            sub::YAML_WRITE => {
                if state.editor.confirm(envelope)? {
                    drop(state);
                    self.ctx.show(envelope);
                }
            }
            _ => self.ctx.unhandled("Document", envelope),
        }
        Ok(())
    }
}

impl View for DocumentView {
    fn on_activate(&self) -> Result<()> {
        self.get_target().map(|_| ())
    }
}

impl Receiver for DocumentView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::DOCUMENT)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.on_error(envelope);
        } else if let Err(e) = self.on_reply(envelope) {
            warn!("Bad {} reply: {}", envelope.sub(), e);
            self.ctx.notifier.error(&format!("Unreadable {} reply: {}", envelope.sub(), e));
        }
        self.revision.bump();
    }
}
