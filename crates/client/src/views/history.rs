//! Operation history tables

use super::{Revision, View, ViewContext};
use crate::router::Receiver;
use airshipui_common::{component, sub, Channel, Envelope, HistoryRecord, Result, RouteKey};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

pub const DEFAULT_KIND: &str = "baremetal";

/// A history record formatted for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub sub_component: String,
    pub user: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub target: String,
    pub success: String,
    pub started: String,
    pub elapsed: String,
    pub stopped: String,
}

fn format_time(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_elapsed(millis: i64) -> String {
    if millis < 1000 {
        format!("{} ms", millis)
    } else {
        format!("{:.1} seconds", millis as f64 / 1000.0)
    }
}

impl From<HistoryRecord> for HistoryRow {
    fn from(record: HistoryRecord) -> Self {
        Self {
            sub_component: record.sub_component,
            user: record.user.unwrap_or_default(),
            action_type: record.action_type.unwrap_or_default(),
            target: record.target.unwrap_or_default(),
            success: if record.success { "Succeeded" } else { "Failed" }.to_string(),
            started: format_time(record.started),
            elapsed: format_elapsed(record.elapsed),
            stopped: format_time(record.stopped),
        }
    }
}

impl HistoryRow {
    fn matches(&self, needle: &str) -> bool {
        [
            &self.sub_component,
            &self.user,
            &self.action_type,
            &self.target,
            &self.success,
            &self.started,
            &self.elapsed,
            &self.stopped,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDisplay {
    Loading,
    Found,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct HistoryState {
    pub loading: bool,
    pub tables: BTreeMap<String, Vec<HistoryRow>>,
    pub selected: String,
    pub filter: String,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            loading: false,
            tables: BTreeMap::new(),
            selected: DEFAULT_KIND.to_string(),
            filter: String::new(),
        }
    }
}

impl HistoryState {
    pub fn display(&self) -> HistoryDisplay {
        if self.loading {
            HistoryDisplay::Loading
        } else if self.tables.contains_key(&self.selected) {
            HistoryDisplay::Found
        } else {
            HistoryDisplay::NotFound
        }
    }

    /// Rows of the selected kind passing the filter
    pub fn visible_rows(&self) -> Vec<&HistoryRow> {
        let needle = self.filter.trim().to_lowercase();
        self.tables
            .get(&self.selected)
            .map(|rows| rows.iter().filter(|r| r.matches(&needle)).collect())
            .unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

pub struct HistoryView {
    ctx: ViewContext,
    state: Mutex<HistoryState>,
    revision: Revision,
}

impl HistoryView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(HistoryState::default()),
            revision: Revision::default(),
        }
    }

    pub fn snapshot(&self) -> HistoryState {
        self.state.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn refresh(&self) -> Result<String> {
        self.state.lock().loading = true;
        self.revision.bump();
        self.ctx.send(Envelope::request(
            Channel::Ctl,
            component::HISTORY,
            sub::GET_DEFAULTS,
        ))
    }

    /// Switch tables; the filter is cleared.
    pub fn select(&self, kind: &str) {
        {
            let mut state = self.state.lock();
            state.selected = kind.to_string();
            state.filter.clear();
        }
        self.revision.bump();
    }

    pub fn set_filter(&self, filter: &str) {
        self.state.lock().filter = filter.to_string();
        self.revision.bump();
    }

    fn push_data(&self, envelope: &Envelope) -> Result<()> {
        let data: BTreeMap<String, Vec<HistoryRecord>> = envelope.data_as()?.unwrap_or_default();
        let mut state = self.state.lock();
        state.loading = false;
        for (kind, records) in data {
            let rows = records.into_iter().map(HistoryRow::from).collect();
            state.tables.insert(kind, rows);
        }
        Ok(())
    }
}

impl View for HistoryView {
    fn on_activate(&self) -> Result<()> {
        self.refresh().map(|_| ())
    }
}

impl Receiver for HistoryView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::HISTORY)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.ctx.show_error(envelope);
            self.state.lock().loading = false;
        } else {
            match envelope.sub() {
                sub::GET_DEFAULTS => {
                    if let Err(e) = self.push_data(envelope) {
                        warn!("Unreadable history data: {}", e);
                        self.state.lock().loading = false;
                    }
                }
                _ => self.ctx.unhandled("History", envelope),
            }
        }
        self.revision.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::context;
    use serde_json::json;

    fn loaded() -> HistoryView {
        let (ctx, outbox, _) = context();
        let view = HistoryView::new(ctx);
        view.on_activate().unwrap();
        assert_eq!(outbox.subs(), vec!["getDefaults"]);
        assert_eq!(view.snapshot().display(), HistoryDisplay::Loading);

        let mut reply = Envelope::request(Channel::Ctl, component::HISTORY, sub::GET_DEFAULTS);
        reply.data = Some(json!({
            "baremetal": [
                {"SubComponent": "poweron", "User": "admin", "ActionType": "direct",
                 "Target": "node-1", "Success": true, "Started": 0, "Elapsed": 250, "Stopped": 250},
                {"SubComponent": "reboot", "User": "ops", "ActionType": "phase",
                 "Target": "node-2", "Success": false, "Started": 0, "Elapsed": 2500, "Stopped": 2500}
            ]
        }));
        view.receive(&reply);
        view
    }

    #[test]
    fn test_rows_are_formatted() {
        let view = loaded();
        let state = view.snapshot();
        assert_eq!(state.display(), HistoryDisplay::Found);
        let rows = state.visible_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].success, "Succeeded");
        assert_eq!(rows[0].elapsed, "250 ms");
        assert_eq!(rows[0].started, "1970-01-01 00:00:00 UTC");
        assert_eq!(rows[1].success, "Failed");
        assert_eq!(rows[1].elapsed, "2.5 seconds");
    }

    #[test]
    fn test_filter_and_selection() {
        let view = loaded();
        view.set_filter("  OPS ");
        let state = view.snapshot();
        let rows = state.visible_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target, "node-2");

        view.select("phase");
        let state = view.snapshot();
        assert!(state.filter.is_empty());
        assert_eq!(state.display(), HistoryDisplay::NotFound);
        assert!(state.visible_rows().is_empty());
    }
}
