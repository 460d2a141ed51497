//! airshipctl configuration: contexts, manifests, encryption and
//! management settings

use super::{Revision, View, ViewContext};
use crate::router::Receiver;
use airshipui_common::{
    component, sub, Channel, Context, ContextOptions, EncryptionConfig, EncryptionConfigOptions,
    Envelope, ManagementConfig, Manifest, ManifestOptions, Result, RouteKey,
};
use parking_lot::Mutex;
use tracing::warn;

/// Lists fetched when the view is shown
pub const INITIAL_FETCHES: [&str; 6] = [
    sub::GET_AIRSHIP_CONFIG_PATH,
    sub::GET_CURRENT_CONTEXT,
    sub::GET_CONTEXTS,
    sub::GET_ENCRYPTION_CONFIGS,
    sub::GET_MANIFESTS,
    sub::GET_MANAGEMENT_CONFIGS,
];

/// An edit to one configuration entry
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    Context(ContextOptions),
    EncryptionConfig(EncryptionConfigOptions),
    Manifest(ManifestOptions),
    ManagementConfig(ManagementConfig),
}

impl ConfigChange {
    fn name(&self) -> &str {
        match self {
            ConfigChange::Context(o) => &o.name,
            ConfigChange::EncryptionConfig(o) => &o.name,
            ConfigChange::Manifest(o) => &o.name,
            ConfigChange::ManagementConfig(c) => &c.name,
        }
    }

    fn sub(&self) -> &'static str {
        match self {
            ConfigChange::Context(_) => sub::SET_CONTEXT,
            ConfigChange::EncryptionConfig(_) => sub::SET_ENCRYPTION_CONFIG,
            ConfigChange::Manifest(_) => sub::SET_MANIFEST,
            ConfigChange::ManagementConfig(_) => sub::SET_MANAGEMENT_CONFIG,
        }
    }

    fn to_envelope(&self) -> Result<Envelope> {
        let envelope = request(self.sub()).with_name(self.name());
        match self {
            ConfigChange::Context(o) => envelope.with_data(o),
            ConfigChange::EncryptionConfig(o) => envelope.with_data(o),
            ConfigChange::Manifest(o) => envelope.with_data(o),
            ConfigChange::ManagementConfig(c) => envelope.with_data(c),
        }
    }
}

/// The list to refetch after a successful change
fn refetch_for(op: &str) -> Option<&'static str> {
    match op {
        sub::SET_CONTEXT => Some(sub::GET_CONTEXTS),
        sub::USE_CONTEXT => Some(sub::GET_CURRENT_CONTEXT),
        sub::SET_ENCRYPTION_CONFIG => Some(sub::GET_ENCRYPTION_CONFIGS),
        sub::SET_MANIFEST => Some(sub::GET_MANIFESTS),
        sub::SET_MANAGEMENT_CONFIG => Some(sub::GET_MANAGEMENT_CONFIGS),
        sub::INIT | sub::SET_AIRSHIP_CONFIG => Some(sub::GET_AIRSHIP_CONFIG_PATH),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigState {
    pub airship_config_path: Option<String>,
    pub current_context: Option<String>,
    pub contexts: Vec<Context>,
    pub encryption_configs: Vec<EncryptionConfig>,
    pub manifests: Vec<Manifest>,
    pub management_configs: Vec<ManagementConfig>,
}

fn request(op: &str) -> Envelope {
    Envelope::request(Channel::Ctl, component::CONFIG, op)
}

pub struct ConfigView {
    ctx: ViewContext,
    state: Mutex<ConfigState>,
    revision: Revision,
}

impl ConfigView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(ConfigState::default()),
            revision: Revision::default(),
        }
    }

    pub fn snapshot(&self) -> ConfigState {
        self.state.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn refresh(&self) -> Result<()> {
        for op in INITIAL_FETCHES {
            self.ctx.send(request(op))?;
        }
        Ok(())
    }

    pub fn apply(&self, change: &ConfigChange) -> Result<String> {
        self.ctx.send(change.to_envelope()?)
    }

    pub fn use_context(&self, name: &str) -> Result<String> {
        self.ctx.send(request(sub::USE_CONTEXT).with_name(name))
    }

    /// Create a fresh airship config, optionally at `path`.
    pub fn init(&self, path: &str) -> Result<String> {
        self.ctx.send(request(sub::INIT).with_message(path))
    }

    /// Point the backend at an existing airship config.
    pub fn set_airship_config(&self, path: &str) -> Result<String> {
        self.ctx
            .send(request(sub::SET_AIRSHIP_CONFIG).with_message(path))
    }

    fn on_reply(&self, envelope: &Envelope) -> Result<()> {
        let op = envelope.sub();
        {
            let mut state = self.state.lock();
            match op {
                sub::GET_AIRSHIP_CONFIG_PATH => {
                    state.airship_config_path = envelope.message.clone();
                    return Ok(());
                }
                sub::GET_CURRENT_CONTEXT => {
                    state.current_context = envelope.message.clone();
                    return Ok(());
                }
                sub::GET_CONTEXTS => {
                    state.contexts = envelope.data_as()?.unwrap_or_default();
                    return Ok(());
                }
                sub::GET_ENCRYPTION_CONFIGS => {
                    state.encryption_configs = envelope.data_as()?.unwrap_or_default();
                    return Ok(());
                }
                sub::GET_MANIFESTS => {
                    state.manifests = envelope.data_as()?.unwrap_or_default();
                    return Ok(());
                }
                sub::GET_MANAGEMENT_CONFIGS => {
                    state.management_configs = envelope.data_as()?.unwrap_or_default();
                    return Ok(());
                }
                _ => {}
            }
        }

        match refetch_for(op) {
            Some(list) => {
                self.ctx.show(envelope);
                self.ctx.send(request(list))?;
            }
            None => self.ctx.unhandled("Config", envelope),
        }
        Ok(())
    }
}

impl View for ConfigView {
    fn on_activate(&self) -> Result<()> {
        self.refresh()
    }
}

impl Receiver for ConfigView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::CONFIG)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.ctx.show_error(envelope);
            return;
        }
        if let Err(e) = self.on_reply(envelope) {
            warn!("Bad config {} reply: {}", envelope.sub(), e);
        }
        self.revision.bump();
    }
}
