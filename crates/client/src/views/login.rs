//! Login form

use super::ViewContext;
use crate::router::Receiver;
use airshipui_common::{component, sub, Authentication, Channel, Envelope, Result, RouteKey};

/// Sends credentials. Replies go to the auth guard, so this view is never
/// registered with the router.
pub struct LoginView {
    ctx: ViewContext,
}

impl LoginView {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx }
    }

    pub fn submit(&self, id: &str, password: &str) -> Result<String> {
        let mut envelope = Envelope::request(Channel::Ui, component::AUTH, sub::AUTHENTICATE);
        envelope.authentication = Some(Authentication {
            id: id.to_string(),
            password: password.to_string(),
        });
        self.ctx.send(envelope)
    }
}

impl Receiver for LoginView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ui, component::AUTH)
    }

    fn receive(&self, _envelope: &Envelope) {
        unimplemented!("the login view never registers; auth replies belong to the guard")
    }
}
