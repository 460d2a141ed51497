//! Document Commands

use super::Globals;
use crate::output::{print_info, print_message, print_success};
use airshipui_client::views::document::{Gvk, Selector};
use airshipui_client::views::{tree, DocumentView};
use anyhow::Result;
use clap::Subcommand;
use std::sync::Arc;

const ROUTE: &str = "/documents";

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Pull the manifests
    Pull,

    /// Show the target path documents are read from
    Target,

    /// Find documents matching a selector
    Query {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        namespace: Option<String>,

        /// "group version kind", space separated
        #[arg(long)]
        gvk: Option<String>,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        annotation: Option<String>,
    },

    /// Print the rendered form of a document
    Render {
        /// Document id
        id: String,
    },
}

pub async fn execute(cmd: DocumentCommands, globals: &Globals) -> Result<()> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(DocumentView::new(console.context()));
    let waiter = console.waiter(view.revision());
    console.activate(view.clone())?;

    let result = match cmd {
        DocumentCommands::Target => waiter
            .until("target path", || view.snapshot().target.is_some())
            .await
            .map(|_| {
                print_message(
                    &view.snapshot().target.unwrap_or_default(),
                    globals.format,
                )
            }),

        DocumentCommands::Pull => {
            let waiter = console.waiter(view.revision());
            view.pull()?;
            waiter
                .until("document pull", || !view.snapshot().pull_disabled)
                .await
                .map(|_| print_success(&view.snapshot().status))
        }

        DocumentCommands::Query {
            name,
            namespace,
            gvk,
            kind,
            label,
            annotation,
        } => {
            let selector = Selector {
                name,
                namespace,
                gvk: gvk.as_deref().map(Gvk::parse),
                kind,
                label,
                annotation,
            };
            let waiter = console.waiter(view.revision());
            view.get_documents_by_selector(&selector)?;
            waiter
                .until("documents", || !view.snapshot().selector_loading)
                .await
                .map(|_| {
                    let results = view.snapshot().results;
                    if results.is_empty() {
                        print_info("No documents matched");
                    }
                    for (depth, node) in tree::walk(&results) {
                        println!("{}{} ({})", "  ".repeat(depth), node.name, node.id);
                    }
                })
        }

        DocumentCommands::Render { id } => {
            let waiter = console.waiter(view.revision());
            view.view_rendered(&id)?;
            waiter
                .until("rendered document", || view.snapshot().rendered.is_some())
                .await
                .map(|_| println!("{}", view.snapshot().rendered.unwrap_or_default()))
        }
    };
    console.close().await?;
    result
}
