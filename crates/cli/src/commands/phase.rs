//! Phase Commands

use super::Globals;
use crate::console::Console;
use crate::output::{print_success, OutputFormat};
use airshipui_client::views::phase::ViewerPane;
use airshipui_client::views::{tree, PhaseView};
use airshipui_common::{KustomNode, PhaseId, RunOptions};
use anyhow::{bail, Result};
use clap::{Subcommand, ValueEnum};
use std::sync::Arc;

const ROUTE: &str = "/phase";

#[derive(Subcommand)]
pub enum PhaseCommands {
    /// Show the phase tree
    Tree {
        /// Load the children of these lazily loaded nodes
        #[arg(long)]
        expand: Vec<String>,
    },

    /// Show one phase
    Show {
        name: String,

        #[arg(short, long, default_value = "")]
        namespace: String,

        /// What to print
        #[arg(long, value_enum, default_value = "details")]
        pane: Pane,
    },

    /// Validate a phase
    Validate {
        name: String,

        #[arg(short, long, default_value = "")]
        namespace: String,
    },

    /// Run a phase and wait for it to finish
    Run {
        name: String,

        #[arg(short, long, default_value = "")]
        namespace: String,

        #[arg(long)]
        debug: bool,

        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Pane {
    Details,
    Bundle,
    Executor,
}

impl From<Pane> for ViewerPane {
    fn from(pane: Pane) -> Self {
        match pane {
            Pane::Details => ViewerPane::Details,
            Pane::Bundle => ViewerPane::Bundle,
            Pane::Executor => ViewerPane::Executor,
        }
    }
}

/// Indented outline of the tree, one node per line.
fn outline(roots: &[KustomNode]) -> Vec<String> {
    tree::walk(roots)
        .into_iter()
        .map(|(depth, node)| {
            let mut line = format!("{}{}", "  ".repeat(depth), node.name);
            if node.is_phase_node {
                line.push_str(" [phase]");
            }
            if node.can_load_children {
                line.push_str(&format!(" (+ {})", node.id));
            }
            if node.has_error {
                line.push_str(" !");
            }
            line
        })
        .collect()
}

fn phase_id(name: String, namespace: String) -> PhaseId {
    PhaseId::new(name).with_namespace(namespace)
}

pub async fn execute(cmd: PhaseCommands, globals: &Globals) -> Result<()> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(PhaseView::new(console.context()));
    let waiter = console.waiter(view.revision());
    console.activate(view.clone())?;
    let result = match waiter
        .until("phase tree", || !view.snapshot().loading)
        .await
    {
        Ok(()) => run_command(cmd, &console, &view, globals.format).await,
        Err(e) => Err(e),
    };
    console.close().await?;
    result
}

async fn run_command(
    cmd: PhaseCommands,
    console: &Console,
    view: &PhaseView,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        PhaseCommands::Tree { expand } => {
            for node_id in &expand {
                let waiter = console.waiter(view.revision());
                if view.expand(node_id)?.is_none() {
                    bail!("Node {} cannot be expanded", node_id);
                }
                waiter
                    .until(node_id, || !view.snapshot().expanding.contains_key(node_id))
                    .await?;
            }
            let tree = view.snapshot().tree;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&tree)?),
                _ => {
                    for line in outline(&tree) {
                        println!("{}", line);
                    }
                }
            }
        }

        PhaseCommands::Show {
            name,
            namespace,
            pane,
        } => {
            let waiter = console.waiter(view.revision());
            view.get_phase(&phase_id(name.clone(), namespace))?;
            waiter
                .until(&name, || {
                    let state = view.snapshot();
                    match (&state.viewer, pane) {
                        (Some(viewer), Pane::Executor) => viewer.executor_yaml.is_some(),
                        (Some(_), _) => true,
                        (None, _) => false,
                    }
                })
                .await?;
            view.set_pane(pane.into());
            if let Some(viewer) = view.snapshot().viewer {
                println!("{}", viewer.shown().unwrap_or_default());
            }
        }

        PhaseCommands::Validate { name, namespace } => {
            let mark = console.notifier.notices();
            let waiter = console.notice_waiter();
            view.validate_phase(&phase_id(name.clone(), namespace))?;
            waiter
                .until("validation", || console.notifier.notices() > mark)
                .await?;
        }

        PhaseCommands::Run {
            name,
            namespace,
            debug,
            dry_run,
        } => {
            let phase = phase_id(name.clone(), namespace);
            // run_phase bumps once itself, the reply bumps again
            let mark = view.revision().current() + 1;
            let waiter = console.waiter(view.revision());
            view.run_phase(&phase, RunOptions { debug, dry_run })?;
            waiter
                .until(&name, || view.revision().current() > mark)
                .await?;
            print_success(&format!("Phase {} finished", name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_marks_nodes() {
        let roots = vec![KustomNode {
            id: "root".to_string(),
            name: "phases".to_string(),
            children: vec![
                KustomNode {
                    id: "a".to_string(),
                    name: "initinfra".to_string(),
                    is_phase_node: true,
                    ..Default::default()
                },
                KustomNode {
                    id: "b".to_string(),
                    name: "clusterctl".to_string(),
                    can_load_children: true,
                    has_error: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }];
        assert_eq!(
            outline(&roots),
            vec!["phases", "  initinfra [phase]", "  clusterctl (+ b) !"]
        );
    }
}
