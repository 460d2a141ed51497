//! Bare metal Commands

use super::Globals;
use crate::output::{print_list, print_success, TableDisplay};
use airshipui_client::views::baremetal::{BaremetalOperation, Display};
use airshipui_client::views::BaremetalView;
use airshipui_common::{NodeInfo, PhaseInfo};
use anyhow::{bail, Result};
use clap::Subcommand;
use std::str::FromStr;
use std::sync::Arc;

const ROUTE: &str = "/baremetal";

#[derive(Subcommand)]
pub enum BaremetalCommands {
    /// List hosts, or phases with --phases
    List {
        /// Show phases instead of hosts
        #[arg(long)]
        phases: bool,

        /// Only rows containing this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Run an operation against hosts or phases
    Run {
        /// ejectmedia, poweroff, poweron, powerstatus, reboot or remotedirect
        operation: String,

        /// Host or phase names
        #[arg(required = true)]
        targets: Vec<String>,

        /// Targets are phases
        #[arg(long)]
        phase: bool,
    },
}

impl TableDisplay for NodeInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "ID", "BMC Address"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.name.clone(), self.id.clone(), self.bmc_address.clone()]
    }
}

impl TableDisplay for PhaseInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Generate Name", "Namespace", "Cluster"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.generate_name.clone(),
            self.namespace.clone(),
            self.cluster_name.clone(),
        ]
    }
}

fn display_for(phase: bool) -> Display {
    if phase {
        Display::Phase
    } else {
        Display::Node
    }
}

/// Select `targets` and choose `operation`, rejecting unknown names.
fn prepare(
    view: &BaremetalView,
    operation: BaremetalOperation,
    targets: &[String],
    phase: bool,
) -> Result<()> {
    view.set_display(display_for(phase));
    let state = view.snapshot();
    for target in targets {
        let known = if phase {
            state.phases.iter().any(|p| &p.name == target)
        } else {
            state.nodes.iter().any(|n| &n.name == target)
        };
        if !known {
            bail!("Unknown {} {}", if phase { "phase" } else { "host" }, target);
        }
        if !view.snapshot().selected.contains(target) {
            view.toggle(target);
        }
    }
    if !view.set_operation(Some(operation)) {
        bail!("Nothing selected");
    }
    Ok(())
}

pub async fn execute(cmd: BaremetalCommands, globals: &Globals) -> Result<()> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(BaremetalView::new(console.context()));
    let waiter = console.waiter(view.revision());
    console.activate(view.clone())?;
    if let Err(e) = waiter
        .until("bare metal inventory", || view.snapshot().loaded)
        .await
    {
        console.close().await?;
        return Err(e);
    }

    let result = match cmd {
        BaremetalCommands::List { phases, filter } => {
            view.set_display(display_for(phases));
            if let Some(filter) = &filter {
                view.set_filter(filter);
            }
            let state = view.snapshot();
            if phases {
                let rows: Vec<PhaseInfo> = state.visible_phases().into_iter().cloned().collect();
                print_list(&rows, globals.format);
            } else {
                let rows: Vec<NodeInfo> = state.visible_nodes().into_iter().cloned().collect();
                print_list(&rows, globals.format);
            }
            Ok(())
        }
        BaremetalCommands::Run {
            operation,
            targets,
            phase,
        } => run(&console, &view, &operation, &targets, phase).await,
    };
    console.close().await?;
    result
}

async fn run(
    console: &crate::console::Console,
    view: &BaremetalView,
    operation: &str,
    targets: &[String],
    phase: bool,
) -> Result<()> {
    let operation = BaremetalOperation::from_str(operation)?;
    prepare(view, operation, targets, phase)?;

    let mark = console.notifier.notices();
    let waiter = console.notice_waiter();
    if view.run()?.is_none() {
        bail!("Nothing to run");
    }
    waiter
        .until(operation.as_str(), || console.notifier.notices() > mark)
        .await?;
    print_success(&format!("{} sent to {}", operation, targets.join(", ")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_match_headers() {
        let node = NodeInfo {
            name: "node-1".to_string(),
            id: "a".to_string(),
            bmc_address: "redfish+http://10.0.0.1".to_string(),
        };
        assert_eq!(node.row().len(), NodeInfo::headers().len());

        let phase = PhaseInfo {
            name: "remotedirect-ephemeral".to_string(),
            ..Default::default()
        };
        assert_eq!(phase.row().len(), PhaseInfo::headers().len());
        assert_eq!(phase.row()[0], "remotedirect-ephemeral");
    }
}
