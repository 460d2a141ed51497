//! History Commands

use super::Globals;
use crate::output::{print_info, print_list, TableDisplay};
use airshipui_client::views::history::{HistoryDisplay, HistoryRow, DEFAULT_KIND};
use airshipui_client::views::HistoryView;
use anyhow::Result;
use clap::Args;
use std::sync::Arc;

const ROUTE: &str = "/history";

#[derive(Args)]
pub struct HistoryArgs {
    /// Table to show, e.g. baremetal or phase
    #[arg(long, default_value = DEFAULT_KIND)]
    pub kind: String,

    /// Only rows containing this text
    #[arg(long)]
    pub filter: Option<String>,
}

impl TableDisplay for HistoryRow {
    fn headers() -> Vec<&'static str> {
        vec!["Operation", "User", "Type", "Target", "Result", "Started", "Elapsed", "Stopped"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.sub_component.clone(),
            self.user.clone(),
            self.action_type.clone(),
            self.target.clone(),
            self.success.clone(),
            self.started.clone(),
            self.elapsed.clone(),
            self.stopped.clone(),
        ]
    }
}

pub async fn execute(args: HistoryArgs, globals: &Globals) -> Result<()> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(HistoryView::new(console.context()));
    let waiter = console.waiter(view.revision());
    console.activate(view.clone())?;
    let loaded = waiter
        .until("history", || !view.snapshot().loading)
        .await;
    console.close().await?;
    loaded?;

    view.select(&args.kind);
    if let Some(filter) = &args.filter {
        view.set_filter(filter);
    }
    let state = view.snapshot();
    match state.display() {
        HistoryDisplay::Found => {
            let rows: Vec<HistoryRow> = state.visible_rows().into_iter().cloned().collect();
            print_list(&rows, globals.format);
        }
        HistoryDisplay::NotFound => {
            print_info(&format!(
                "No {} history found. Available: {}",
                args.kind,
                state.kinds().join(", ")
            ));
        }
        HistoryDisplay::Loading => print_info("History is still loading"),
    }
    Ok(())
}
