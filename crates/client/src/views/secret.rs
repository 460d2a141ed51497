//! Secret generation and the encrypt/decrypt steppers

use super::{Revision, View, ViewContext};
use crate::router::Receiver;
use airshipui_common::{component, sub, Channel, Envelope, Result, RouteKey};
use parking_lot::Mutex;

pub const ENCRYPTED_PREFIX: &str = "encrypted-";
pub const ENCRYPT_UNAVAILABLE: &str = "Encrypt is currently not implemented in CTL";
pub const DECRYPT_UNAVAILABLE: &str = "Decrypt is currently not implemented in CTL";

/// Split a path into (directory with trailing slash, file name).
fn split_file(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    }
}

/// Destination offered for encrypting `src`: same directory, prefixed name.
pub fn encrypt_destination(src: &str) -> String {
    let (dir, file) = split_file(src);
    format!("{}{}{}", dir, ENCRYPTED_PREFIX, file)
}

/// Destination offered for decrypting `src`: the prefix dropped from the name.
pub fn decrypt_destination(src: &str) -> String {
    let (dir, file) = split_file(src);
    format!("{}{}", dir, file.replacen(ENCRYPTED_PREFIX, "", 1))
}

pub struct SecretView {
    ctx: ViewContext,
    generate_output: Mutex<Option<String>>,
    revision: Revision,
}

impl SecretView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            generate_output: Mutex::new(None),
            revision: Revision::default(),
        }
    }

    pub fn generate_output(&self) -> Option<String> {
        self.generate_output.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn generate(&self) -> Result<String> {
        self.ctx.send(Envelope::request(
            Channel::Ctl,
            component::SECRET,
            sub::GENERATE,
        ))
    }

    /// The backend cannot encrypt yet; tell the operator instead.
    pub fn encrypt(&self, _src: &str, _dest: &str) {
        self.ctx.notifier.info(ENCRYPT_UNAVAILABLE);
    }

    pub fn decrypt(&self, _src: &str, _dest: &str) {
        self.ctx.notifier.info(DECRYPT_UNAVAILABLE);
    }
}

impl View for SecretView {}

impl Receiver for SecretView {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::SECRET)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.ctx.show_error(envelope);
            return;
        }
        match envelope.sub() {
            sub::GENERATE => {
                *self.generate_output.lock() = Some(envelope.message.clone().unwrap_or_default());
                self.revision.bump();
            }
            _ => self.ctx.unhandled("Secret", envelope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::testing::context;

    #[test]
    fn test_generate_output_is_verbatim() {
        let (ctx, outbox, notices) = context();
        let view = SecretView::new(ctx);
        view.generate().unwrap();
        assert_eq!(outbox.subs(), vec!["generate"]);

        let text = "  s3cr3t <b>not html</b>\n";
        view.receive(
            &Envelope::request(Channel::Ctl, component::SECRET, sub::GENERATE).with_message(text),
        );
        assert_eq!(view.generate_output().as_deref(), Some(text));
        assert!(notices.texts().is_empty());
    }

    #[test]
    fn test_encrypt_and_decrypt_only_notify() {
        let (ctx, outbox, notices) = context();
        let view = SecretView::new(ctx);
        view.encrypt("/tmp/a.yaml", "/tmp/encrypted-a.yaml");
        view.decrypt("/tmp/encrypted-a.yaml", "/tmp/a.yaml");
        assert!(outbox.take().is_empty());
        assert_eq!(notices.texts(), vec![ENCRYPT_UNAVAILABLE, DECRYPT_UNAVAILABLE]);
    }

    #[test]
    fn test_destination_suggestions() {
        assert_eq!(encrypt_destination("/site/secrets/a.yaml"), "/site/secrets/encrypted-a.yaml");
        assert_eq!(encrypt_destination("a.yaml"), "encrypted-a.yaml");
        assert_eq!(
            decrypt_destination("/site/encrypted-x/encrypted-a.yaml"),
            "/site/encrypted-x/a.yaml"
        );
        assert_eq!(decrypt_destination("plain.yaml"), "plain.yaml");
    }
}
