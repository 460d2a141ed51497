//! CLI Commands

pub mod auth;
pub mod baremetal;
pub mod config;
pub mod document;
pub mod history;
pub mod image;
pub mod phase;
pub mod secret;
pub mod watch;

use crate::console::Console;
use crate::output::OutputFormat;
use airshipui_client::ClientConfig;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every command
pub struct Globals {
    pub config: ClientConfig,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub timeout: Duration,
}

impl Globals {
    /// Connect and make sure `route` is usable before going further.
    pub async fn open(&self, route: &str) -> Result<Console> {
        let console = Console::connect(self.config.clone(), route, self.timeout).await?;
        if let Err(e) = console.require(route) {
            console.close().await?;
            return Err(e);
        }
        Ok(console)
    }
}
