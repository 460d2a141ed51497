//! Root shell: log panel, dashboard links and the auth toggle

use super::{Revision, View, ViewContext};
use crate::auth::AuthGuard;
use crate::router::Receiver;
use airshipui_common::{component, Channel, Dashboard, Envelope, RouteKey};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

/// Lines kept in the log panel
pub const LOG_PANEL_LINES: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct ShellState {
    pub log: VecDeque<String>,
    /// Lines ever appended, including those rotated out
    pub total_lines: u64,
    pub dashboards: Vec<Dashboard>,
    pub session_id: Option<String>,
}

pub struct ShellView {
    ctx: ViewContext,
    state: Mutex<ShellState>,
    revision: Revision,
}

impl ShellView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(ShellState::default()),
            revision: Revision::default(),
        }
    }

    pub fn snapshot(&self) -> ShellState {
        self.state.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Log out when currently logged in. Returns whether anything happened.
    pub fn auth_toggle(&self, guard: &AuthGuard) -> bool {
        if guard.affordances().auth_button == "Logout" {
            guard.logout();
            true
        } else {
            false
        }
    }

    fn append_log(&self, line: &str) {
        let mut state = self.state.lock();
        if state.log.len() == LOG_PANEL_LINES {
            state.log.pop_front();
        }
        state.log.push_back(line.to_string());
        state.total_lines += 1;
    }

    fn update_dashboards(&self, dashboards: &[Dashboard]) {
        let mut state = self.state.lock();
        for dashboard in dashboards {
            match state.dashboards.iter_mut().find(|d| d.name == dashboard.name) {
                Some(existing) => *existing = dashboard.clone(),
                None => state.dashboards.push(dashboard.clone()),
            }
        }
    }
}

impl View for ShellView {}

impl Receiver for ShellView {
    fn route(&self) -> RouteKey {
        RouteKey::any(Channel::Ui)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.ctx.show_error(envelope);
            return;
        }
        match envelope.component.as_str() {
            component::LOG => {
                if let Some(line) = &envelope.message {
                    self.append_log(line);
                    self.revision.bump();
                }
            }
            component::INITIALIZE => {
                if let Some(id) = &envelope.session_id {
                    self.state.lock().session_id = Some(id.clone());
                }
                if let Some(dashboards) = &envelope.dashboards {
                    self.update_dashboards(dashboards);
                }
                self.revision.bump();
            }
            component::KEEPALIVE => debug!("Keepalive message received in shell"),
            other => debug!("Uncategorized message received in shell: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::context;

    #[test]
    fn test_log_panel_is_bounded() {
        let (ctx, _, _) = context();
        let shell = ShellView::new(ctx);
        for i in 0..(LOG_PANEL_LINES + 5) {
            shell.receive(
                &Envelope::new(Channel::Ui, component::LOG).with_message(format!("line {}", i)),
            );
        }
        let state = shell.snapshot();
        assert_eq!(state.log.len(), LOG_PANEL_LINES);
        assert_eq!(state.log.front().unwrap(), "line 5");
        assert_eq!(shell.revision().current(), (LOG_PANEL_LINES + 5) as u64);
    }

    #[test]
    fn test_initialize_records_dashboards_once() {
        let (ctx, _, _) = context();
        let shell = ShellView::new(ctx);
        let mut init = Envelope::new(Channel::Ui, component::INITIALIZE);
        init.dashboards = Some(vec![Dashboard {
            name: "grafana".to_string(),
            base_url: "http://grafana".to_string(),
            ..Default::default()
        }]);
        shell.receive(&init);
        shell.receive(&init);
        shell.receive(&Envelope::new(Channel::Ui, component::KEEPALIVE));
        assert_eq!(shell.snapshot().dashboards.len(), 1);
        assert_eq!(shell.revision().current(), 2);
    }
}
