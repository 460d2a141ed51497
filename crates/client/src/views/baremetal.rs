//! Bare-metal host and phase actions

use super::{Revision, View, ViewContext};
use crate::router::Receiver;
use airshipui_common::{
    component, sub, ActionType, BaremetalDefaults, Channel, Envelope, Error, NodeInfo, PhaseInfo,
    Result, RouteKey,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Actions the backend can run against hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaremetalOperation {
    EjectMedia,
    PowerOff,
    PowerOn,
    PowerStatus,
    Reboot,
    RemoteDirect,
}

impl BaremetalOperation {
    pub const ALL: [BaremetalOperation; 6] = [
        BaremetalOperation::EjectMedia,
        BaremetalOperation::PowerOff,
        BaremetalOperation::PowerOn,
        BaremetalOperation::PowerStatus,
        BaremetalOperation::Reboot,
        BaremetalOperation::RemoteDirect,
    ];

    /// Sub-component name on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            BaremetalOperation::EjectMedia => "ejectmedia",
            BaremetalOperation::PowerOff => "poweroff",
            BaremetalOperation::PowerOn => "poweron",
            BaremetalOperation::PowerStatus => "powerstatus",
            BaremetalOperation::Reboot => "reboot",
            BaremetalOperation::RemoteDirect => "remotedirect",
        }
    }
}

impl fmt::Display for BaremetalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaremetalOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Internal(format!("unknown bare metal operation {}", s)))
    }
}

/// Which table is shown and targeted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Node,
    Phase,
}

#[derive(Debug, Clone, Default)]
pub struct BaremetalState {
    pub loaded: bool,
    pub nodes: Vec<NodeInfo>,
    pub phases: Vec<PhaseInfo>,
    pub display: Display,
    pub selected: BTreeSet<String>,
    pub operation: Option<BaremetalOperation>,
    pub filter: String,
}

impl BaremetalState {
    pub fn operation_enabled(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn run_enabled(&self) -> bool {
        self.operation_enabled() && self.operation.is_some()
    }

    fn names(&self) -> Vec<&str> {
        match self.display {
            Display::Node => self.nodes.iter().map(|n| n.name.as_str()).collect(),
            Display::Phase => self.phases.iter().map(|p| p.name.as_str()).collect(),
        }
    }

    pub fn all_selected(&self) -> bool {
        let names = self.names();
        !names.is_empty() && names.iter().all(|n| self.selected.contains(*n))
    }

    pub fn visible_nodes(&self) -> Vec<&NodeInfo> {
        let filter = self.filter.to_lowercase();
        self.nodes
            .iter()
            .filter(|n| {
                filter.is_empty()
                    || [&n.name, &n.id, &n.bmc_address]
                        .iter()
                        .any(|f| f.to_lowercase().contains(&filter))
            })
            .collect()
    }

    pub fn visible_phases(&self) -> Vec<&PhaseInfo> {
        let filter = self.filter.to_lowercase();
        self.phases
            .iter()
            .filter(|p| {
                filter.is_empty()
                    || [&p.name, &p.generate_name, &p.namespace, &p.cluster_name]
                        .iter()
                        .any(|f| f.to_lowercase().contains(&filter))
            })
            .collect()
    }

    /// Selected targets in table order
    fn targets(&self) -> Vec<String> {
        self.names()
            .into_iter()
            .filter(|n| self.selected.contains(*n))
            .map(str::to_string)
            .collect()
    }

    fn selection_changed(&mut self) {
        if self.selected.is_empty() {
            self.operation = None;
        }
    }
}

pub struct BaremetalView {
    ctx: ViewContext,
    state: Mutex<BaremetalState>,
    revision: Revision,
}

impl BaremetalView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(BaremetalState::default()),
            revision: Revision::default(),
        }
    }

    pub fn snapshot(&self) -> BaremetalState {
        self.state.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn refresh(&self) -> Result<String> {
        self.ctx.send(Envelope::request(
            Channel::Ctl,
            component::BAREMETAL,
            sub::GET_DEFAULTS,
        ))
    }

    /// Switch tables. Selection, filter and operation are cleared.
    pub fn set_display(&self, display: Display) {
        let mut state = self.state.lock();
        state.display = display;
        state.selected.clear();
        state.filter.clear();
        state.operation = None;
        drop(state);
        self.revision.bump();
    }

    pub fn set_filter(&self, filter: &str) {
        self.state.lock().filter = filter.trim().to_lowercase();
        self.revision.bump();
    }

    pub fn toggle(&self, name: &str) {
        let mut state = self.state.lock();
        if !state.selected.remove(name) && state.names().contains(&name) {
            state.selected.insert(name.to_string());
        }
        state.selection_changed();
        drop(state);
        self.revision.bump();
    }

    /// Select every row, or clear the selection when all are selected.
    pub fn toggle_all(&self) {
        let mut state = self.state.lock();
        if state.all_selected() {
            state.selected.clear();
        } else {
            let names: Vec<String> = state.names().into_iter().map(str::to_string).collect();
            state.selected.extend(names);
        }
        state.selection_changed();
        drop(state);
        self.revision.bump();
    }

    /// Choose the action. Ignored while nothing is selected.
    pub fn set_operation(&self, operation: Option<BaremetalOperation>) -> bool {
        let mut state = self.state.lock();
        if operation.is_some() && !state.operation_enabled() {
            return false;
        }
        state.operation = operation;
        drop(state);
        self.revision.bump();
        true
    }

    /// Run the chosen operation against the selection.
    pub fn run(&self) -> Result<Option<String>> {
        let envelope = {
            let state = self.state.lock();
            let Some(operation) = state.operation.filter(|_| state.run_enabled()) else {
                return Ok(None);
            };
            let mut envelope =
                Envelope::request(Channel::Ctl, component::BAREMETAL, operation.as_str());
            envelope.action_type = Some(match state.display {
                Display::Node => ActionType::Direct,
                Display::Phase => ActionType::Phase,
            });
            envelope.targets = Some(state.targets());
            envelope
        };
        self.ctx.send(envelope).map(Some)
    }

    fn push_data(&self, envelope: &Envelope) -> Result<()> {
        let defaults: BaremetalDefaults = envelope.data_as()?.unwrap_or_default();
        let mut state = self.state.lock();
        state.nodes = defaults.nodes;
        state.phases = defaults.phases;
        state.loaded = true;
        let names: BTreeSet<String> = state.names().into_iter().map(str::to_string).collect();
        state.selected.retain(|n| names.contains(n));
        state.selection_changed();
        Ok(())
    }
}

impl View for BaremetalView {
    fn on_activate(&self) -> Result<()> {
        self.refresh().map(|_| ())
    }
}

impl Receiver for BaremetalView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::BAREMETAL)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.ctx.show_error(envelope);
            return;
        }
        match envelope.sub() {
            sub::GET_DEFAULTS => {
                if let Err(e) = self.push_data(envelope) {
                    self.ctx.notifier.error(&format!("Unreadable bare metal defaults: {}", e));
                    return;
                }
                self.revision.bump();
            }
            other if BaremetalOperation::from_str(other).is_ok() => self.ctx.show(envelope),
            _ => self.ctx.unhandled("Baremetal", envelope),
        }
    }
}
