//! Config Commands
//!
//! `show` and `init` manage the local client file; the rest talk to the
//! backend about airshipctl configuration.

use super::Globals;
use crate::output::{print_item, print_list, print_success, TableDisplay};
use airshipui_client::views::config::INITIAL_FETCHES;
use airshipui_client::views::ConfigView;
use airshipui_client::ClientConfig;
use airshipui_common::Context;
use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use std::sync::Arc;

const ROUTE: &str = "/config";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective client configuration as TOML
    Show,

    /// Write a default client configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List airshipctl contexts
    Contexts,

    /// Switch the current airshipctl context
    UseContext { name: String },
}

/// A context row, marked when current
#[derive(Serialize)]
pub struct ContextDisplay {
    pub current: bool,
    #[serde(flatten)]
    pub context: Context,
}

impl TableDisplay for ContextDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["", "Name", "Kubeconfig", "Manifest", "Encryption", "Management"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            if self.current { "*" } else { "" }.to_string(),
            self.context.name.clone(),
            self.context.context_kubeconf.clone(),
            self.context.manifest.clone(),
            self.context.encryption_config.clone(),
            self.context.management_configuration.clone(),
        ]
    }
}

/// Summary of the airshipctl side
#[derive(Serialize)]
pub struct AirshipConfigDisplay {
    pub path: String,
    pub current_context: String,
    pub manifests: usize,
    pub encryption_configs: usize,
    pub management_configs: usize,
}

impl TableDisplay for AirshipConfigDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Config Path", "Current Context", "Manifests", "Encryption", "Management"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.path.clone(),
            self.current_context.clone(),
            self.manifests.to_string(),
            self.encryption_configs.to_string(),
            self.management_configs.to_string(),
        ]
    }
}

pub async fn execute(cmd: ConfigCommands, globals: &Globals) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            print!("{}", toml::to_string_pretty(&globals.config)?);
            Ok(())
        }
        ConfigCommands::Init { force } => {
            if globals.config_path.exists() && !force {
                bail!(
                    "{} already exists, use --force to overwrite",
                    globals.config_path.display()
                );
            }
            ClientConfig::default().save(&globals.config_path)?;
            print_success(&format!("Wrote {}", globals.config_path.display()));
            Ok(())
        }
        ConfigCommands::Contexts => contexts(globals).await,
        ConfigCommands::UseContext { name } => use_context(globals, &name).await,
    }
}

async fn load(globals: &Globals) -> Result<(crate::console::Console, Arc<ConfigView>)> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(ConfigView::new(console.context()));
    let waiter = console.waiter(view.revision());
    console.activate(view.clone())?;
    let fetched = INITIAL_FETCHES.len() as u64;
    if let Err(e) = waiter
        .until("airship configuration", || view.revision().current() >= fetched)
        .await
    {
        console.close().await?;
        return Err(e);
    }
    Ok((console, view))
}

async fn contexts(globals: &Globals) -> Result<()> {
    let (console, view) = load(globals).await?;
    console.close().await?;

    let state = view.snapshot();
    let current = state.current_context.clone().unwrap_or_default();
    print_item(
        &AirshipConfigDisplay {
            path: state.airship_config_path.clone().unwrap_or_default(),
            current_context: current.clone(),
            manifests: state.manifests.len(),
            encryption_configs: state.encryption_configs.len(),
            management_configs: state.management_configs.len(),
        },
        globals.format,
    );
    let rows: Vec<ContextDisplay> = state
        .contexts
        .into_iter()
        .map(|context| ContextDisplay {
            current: context.name == current,
            context,
        })
        .collect();
    print_list(&rows, globals.format);
    Ok(())
}

async fn use_context(globals: &Globals, name: &str) -> Result<()> {
    let (console, view) = load(globals).await?;
    if !view.snapshot().contexts.iter().any(|c| c.name == name) {
        console.close().await?;
        bail!("Unknown context {}", name);
    }

    let waiter = console.waiter(view.revision());
    let switched = match view.use_context(name) {
        Ok(_) => {
            waiter
                .until("context switch", || {
                    view.snapshot().current_context.as_deref() == Some(name)
                })
                .await
        }
        Err(e) => Err(e.into()),
    };
    console.close().await?;
    switched?;
    print_success(&format!("Switched to context {}", name));
    Ok(())
}
