//! Image Commands

use super::Globals;
use crate::output::print_success;
use airshipui_client::views::image::ImageStatus;
use airshipui_client::views::ImageView;
use anyhow::{bail, Result};
use std::sync::Arc;

const ROUTE: &str = "/image";

/// Generate the bootable ISO and wait for the result.
pub async fn generate(globals: &Globals) -> Result<()> {
    let mut console = globals.open(ROUTE).await?;
    let view = Arc::new(ImageView::new(console.context()));
    console.activate(view.clone())?;

    let waiter = console.waiter(view.revision());
    view.generate()?;
    let finished = waiter
        .until("image generation", || {
            matches!(view.status(), ImageStatus::Done(_) | ImageStatus::Failed(_))
        })
        .await;
    console.close().await?;
    finished?;

    match view.status() {
        ImageStatus::Done(message) => {
            print_success(&message);
            Ok(())
        }
        ImageStatus::Failed(err) => bail!("Image generation failed: {}", err),
        other => bail!("Image generation ended as {:?}", other),
    }
}
