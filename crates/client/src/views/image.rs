//! Bootable ISO generation

use super::{Revision, View, ViewContext};
use crate::router::Receiver;
use airshipui_common::{component, sub, Channel, Envelope, Result, RouteKey};
use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageStatus {
    #[default]
    Idle,
    Generating,
    Done(String),
    Failed(String),
}

pub struct ImageView {
    ctx: ViewContext,
    status: Mutex<ImageStatus>,
    revision: Revision,
}

impl ImageView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            status: Mutex::new(ImageStatus::Idle),
            revision: Revision::default(),
        }
    }

    pub fn status(&self) -> ImageStatus {
        self.status.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn generate(&self) -> Result<String> {
        *self.status.lock() = ImageStatus::Generating;
        self.revision.bump();
        self.ctx.send(Envelope::request(
            Channel::Ctl,
            component::IMAGE,
            sub::GENERATE,
        ))
    }
}

impl View for ImageView {}

impl Receiver for ImageView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::IMAGE)
    }

    fn receive(&self, envelope: &Envelope) {
        let next = match &envelope.error {
            Some(err) => {
                self.ctx.show_error(envelope);
                ImageStatus::Failed(err.clone())
            }
            None => {
                debug!("Message received in image: {}", envelope.summary());
                ImageStatus::Done(envelope.message.clone().unwrap_or_default())
            }
        };
        *self.status.lock() = next;
        self.revision.bump();
    }
}
