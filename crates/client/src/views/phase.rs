//! Phase tree, phase viewer, source editor and phase runs

use super::document::Selector;
use super::{answers, tree, Revision, View, ViewContext, YamlEditor};
use crate::router::Receiver;
use airshipui_common::{
    component, new_request_id, sub, Channel, DocumentMode, Envelope, KustomNode, PhaseId, Result,
    RouteKey, RunOptions,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

pub const NO_PHASE_DETAILS: &str = "(Phase details not provided)";

/// Which document the phase viewer shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewerPane {
    #[default]
    Details,
    Bundle,
    Executor,
    Rendered,
}

#[derive(Debug, Clone, Default)]
pub struct PhaseViewer {
    /// JSON phase id as sent by the backend
    pub id: String,
    pub phase: Option<PhaseId>,
    pub name: String,
    pub details: String,
    pub bundle_yaml: String,
    pub executor_yaml: Option<String>,
    pub rendered: Option<String>,
    pub results: Vec<KustomNode>,
    pub results_loading: bool,
    pub pane: ViewerPane,
}

impl PhaseViewer {
    /// Text of the selected pane
    pub fn shown(&self) -> Option<&str> {
        match self.pane {
            ViewerPane::Details => Some(&self.details),
            ViewerPane::Bundle => Some(&self.bundle_yaml),
            ViewerPane::Executor => self.executor_yaml.as_deref(),
            ViewerPane::Rendered => self.rendered.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhaseState {
    pub loading: bool,
    pub tree: Vec<KustomNode>,
    pub viewer: Option<PhaseViewer>,
    pub editor: YamlEditor,
    /// node id -> request id of the outstanding subtree fetch
    pub expanding: HashMap<String, String>,
    /// request id of the outstanding rendered fetch
    pub rendering: Option<String>,
}

impl Default for PhaseState {
    fn default() -> Self {
        Self {
            loading: false,
            tree: Vec::new(),
            viewer: None,
            editor: YamlEditor::new(),
            expanding: HashMap::new(),
            rendering: None,
        }
    }
}

pub struct PhaseView {
    ctx: ViewContext,
    state: Mutex<PhaseState>,
    revision: Revision,
}

fn request(sub: &str) -> Envelope {
    Envelope::request(Channel::Ctl, component::PHASE, sub)
}

impl PhaseView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(PhaseState::default()),
            revision: Revision::default(),
        }
    }

    pub fn snapshot(&self) -> PhaseState {
        self.state.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn get_phase_tree(&self) -> Result<String> {
        self.state.lock().loading = true;
        self.ctx.send(request(sub::GET_PHASE_TREE))
    }

    /// Fetch the children of a lazily loaded node.
    pub fn expand(&self, node_id: &str) -> Result<Option<String>> {
        let mut envelope = request(sub::GET_PHASE_TREE).with_id(node_id);
        {
            let mut state = self.state.lock();
            let loadable = tree::find(&state.tree, node_id)
                .is_some_and(|n| n.can_load_children && !n.has_children());
            if !loadable || state.expanding.contains_key(node_id) {
                return Ok(None);
            }
            let request_id = new_request_id();
            envelope.request_id = Some(request_id.clone());
            state.expanding.insert(node_id.to_string(), request_id);
        }
        self.ctx.send(envelope).map(Some)
    }

    fn attach_subtree(&self, envelope: &Envelope, node_id: &str, nodes: Vec<KustomNode>) {
        let mut state = self.state.lock();
        let Some(expected) = state.expanding.get(node_id) else {
            debug!("Ignoring unrequested subtree for {}", node_id);
            return;
        };
        if envelope.request_id.as_deref().is_some_and(|got| got != expected) {
            debug!("Ignoring stale subtree for {}", node_id);
            return;
        }
        state.expanding.remove(node_id);
        if !tree::attach_children(&mut state.tree, node_id, nodes) {
            debug!("Subtree for {} arrived after the node went away", node_id);
        }
    }

    pub fn get_phase(&self, phase: &PhaseId) -> Result<String> {
        self.state.lock().loading = true;
        self.ctx.send(request(sub::GET_PHASE).with_json_id(phase)?)
    }

    pub fn validate_phase(&self, phase: &PhaseId) -> Result<String> {
        self.ctx.send(request(sub::VALIDATE_PHASE).with_json_id(phase)?)
    }

    /// Start a phase and mark its node running until the terminal reply.
    pub fn run_phase(&self, phase: &PhaseId, options: RunOptions) -> Result<String> {
        if let Some(node) = tree::find_phase_mut(&mut self.state.lock().tree, phase) {
            node.running = true;
        }
        self.revision.bump();
        self.ctx
            .send(request(sub::RUN).with_json_id(phase)?.with_data(&options)?)
    }

    /// Query the open phase's bundle with a selector.
    pub fn get_documents_by_selector(&self, selector: &Selector) -> Result<Option<String>> {
        let id = {
            let mut state = self.state.lock();
            let Some(viewer) = state.viewer.as_mut() else {
                return Ok(None);
            };
            viewer.results_loading = true;
            viewer.results.clear();
            viewer.id.clone()
        };
        self.ctx
            .send(
                request(sub::GET_DOCUMENTS_BY_SELECTOR)
                    .with_id(id)
                    .with_message(selector.to_json()?),
            )
            .map(Some)
    }

    pub fn view_rendered(&self, doc_id: &str) -> Result<String> {
        let mut envelope = request(sub::GET_YAML)
            .with_id(doc_id)
            .with_mode(DocumentMode::Rendered);
        let request_id = new_request_id();
        envelope.request_id = Some(request_id.clone());
        {
            let mut state = self.state.lock();
            state.rendering = Some(request_id);
            if let Some(viewer) = state.viewer.as_mut() {
                viewer.rendered = None;
                viewer.pane = ViewerPane::Rendered;
            }
        }
        self.ctx.send(envelope)
    }

    pub fn open_source(&self, doc_id: &str) -> Result<String> {
        self.ctx.send(
            request(sub::GET_YAML)
                .with_id(doc_id)
                .with_mode(DocumentMode::Source),
        )
    }

    pub fn set_pane(&self, pane: ViewerPane) {
        if let Some(viewer) = self.state.lock().viewer.as_mut() {
            viewer.pane = pane;
        }
        self.revision.bump();
    }

    pub fn close_viewer(&self) {
        self.state.lock().viewer = None;
        self.revision.bump();
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
            .begin_save(Channel::Ctl, component::PHASE);
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

    fn clear_running(&self, envelope: &Envelope) {
        match envelope.id_as::<PhaseId>() {
            Ok(Some(phase)) => {
                if let Some(node) = tree::find_phase_mut(&mut self.state.lock().tree, &phase) {
                    node.running = false;
                }
            }
            Ok(None) => debug!("Run reply without a phase id"),
            Err(e) => warn!("Unreadable phase id in run reply: {}", e),
        }
    }

    fn open_viewer(&self, envelope: &Envelope) -> Result<()> {
        let id = envelope.id.clone().unwrap_or_default();
        let bundle_yaml = envelope.yaml_text()?.unwrap_or_default();
        let details = envelope
            .details
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| NO_PHASE_DETAILS.to_string());
        let phase = envelope.id_as::<PhaseId>()?;
        let fetch_bundle = !bundle_yaml.is_empty();

        {
            let mut state = self.state.lock();
            state.loading = false;
            state.viewer = Some(PhaseViewer {
                id: id.clone(),
                phase,
                name: envelope.name.clone().unwrap_or_default(),
                details,
                bundle_yaml,
                results_loading: fetch_bundle,
                ..Default::default()
            });
        }

        self.ctx.send(request(sub::GET_EXECUTOR_DOC).with_id(id.clone()))?;
        if fetch_bundle {
            self.ctx.send(
                request(sub::GET_DOCUMENTS_BY_SELECTOR)
                    .with_id(id)
                    .with_message("{}"),
            )?;
        }
        Ok(())
    }

    fn on_error(&self, envelope: &Envelope) {
        self.ctx.show_error(envelope);
        self.state.lock().loading = false;
        match envelope.sub() {
            sub::RUN => self.clear_running(envelope),
            sub::GET_PHASE_TREE => {
                if let Some(node_id) = &envelope.id {
                    self.state.lock().expanding.remove(node_id);
                }
            }
            sub::YAML_WRITE => self.state.lock().editor.fail(),
            sub::GET_DOCUMENTS_BY_SELECTOR => {
                if let Some(viewer) = self.state.lock().viewer.as_mut() {
                    viewer.results_loading = false;
                }
            }
            _ => {}
        }
    }

    fn on_reply(&self, envelope: &Envelope) -> Result<()> {
        match envelope.sub() {
            sub::GET_PHASE_TREE => {
                let nodes: Vec<KustomNode> = envelope.data_as()?.unwrap_or_default();
                match envelope.id.as_deref() {
                    Some(node_id) if !node_id.is_empty() => {
                        self.attach_subtree(envelope, node_id, nodes)
                    }
                    _ => {
                        let mut state = self.state.lock();
                        state.loading = false;
                        state.expanding.clear();
                        state.tree = nodes;
                    }
                }
            }
            sub::GET_PHASE => self.open_viewer(envelope)?,
            sub::GET_EXECUTOR_DOC => {
                let text = envelope.yaml_text()?;
                if let Some(viewer) = self.state.lock().viewer.as_mut() {
                    viewer.executor_yaml = text;
                }
            }
            sub::GET_DOCUMENTS_BY_SELECTOR => {
                let results: Vec<KustomNode> = envelope.data_as()?.unwrap_or_default();
                if let Some(viewer) = self.state.lock().viewer.as_mut() {
                    viewer.results_loading = false;
                    viewer.results = results;
                }
            }
            sub::GET_YAML => match envelope.mode {
                Some(DocumentMode::Source) => self.state.lock().editor.load(envelope)?,
                _ => {
                    let text = envelope.yaml_text()?;
                    let mut state = self.state.lock();
                    if !answers(state.rendering.as_deref(), envelope) {
                        debug!("Ignoring stale rendered document");
                        return Ok(());
                    }
                    state.rendering = None;
                    if let Some(viewer) = state.viewer.as_mut() {
                        viewer.rendered = text;
                    }
                }
            },
            sub::YAML_WRITE => {
                if self.state.lock().editor.confirm(envelope)? {
                    self.ctx.show(envelope);
                }
            }
            sub::VALIDATE_PHASE => self.ctx.show(envelope),
            sub::RUN => self.clear_running(envelope),
            _ => self.ctx.unhandled("Phase", envelope),
        }
        Ok(())
    }
}

impl View for PhaseView {
    fn on_activate(&self) -> Result<()> {
        self.get_phase_tree().map(|_| ())
    }
}

impl Receiver for PhaseView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::PHASE)
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
