//! Secret Commands

use super::Globals;
use crate::output::print_message;
use airshipui_client::views::secret::{decrypt_destination, encrypt_destination};
use airshipui_client::views::SecretView;
use anyhow::Result;
use clap::Subcommand;
use std::sync::Arc;

const ROUTE: &str = "/secret";

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Ask the backend to generate a secret
    Generate,

    /// Encrypt a secret file
    Encrypt {
        /// Source file
        src: String,

        /// Destination, defaults to the source with an `encrypted-` name
        dest: Option<String>,
    },

    /// Decrypt a secret file
    Decrypt {
        /// Source file
        src: String,

        /// Destination, defaults to the source without the `encrypted-` name
        dest: Option<String>,
    },
}

pub async fn execute(cmd: SecretCommands, globals: &Globals) -> Result<()> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(SecretView::new(console.context()));
    console.activate(view.clone())?;

    let result = match cmd {
        SecretCommands::Generate => {
            let waiter = console.waiter(view.revision());
            view.generate()?;
            waiter
                .until("generated secret", || view.generate_output().is_some())
                .await
                .map(|_| print_message(&view.generate_output().unwrap_or_default(), globals.format))
        }
        SecretCommands::Encrypt { src, dest } => {
            let dest = dest.unwrap_or_else(|| encrypt_destination(&src));
            view.encrypt(&src, &dest);
            Ok(())
        }
        SecretCommands::Decrypt { src, dest } => {
            let dest = dest.unwrap_or_else(|| decrypt_destination(&src));
            view.decrypt(&src, &dest);
            Ok(())
        }
    };
    console.close().await?;
    result
}
