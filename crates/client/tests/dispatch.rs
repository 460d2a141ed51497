//! Routing of inbound envelopes

mod common;

use airshipui_client::{Delivery, Level, Receiver, Router};
use airshipui_common::{component, Channel, Envelope, RouteKey};
use common::RecordingNotifier;
use parking_lot::Mutex;
use std::sync::Arc;

struct Probe {
    key: RouteKey,
    seen: Mutex<Vec<Envelope>>,
}

impl Probe {
    fn new(channel: Channel, component: &str) -> Arc<Self> {
        Arc::new(Self {
            key: RouteKey::new(channel, component),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<Envelope> {
        self.seen.lock().clone()
    }
}

impl Receiver for Probe {
    fn route(&self) -> RouteKey {
        self.key.clone()
    }

    fn receive(&self, envelope: &Envelope) {
        self.seen.lock().push(envelope.clone());
    }
}

struct Exploder;

impl Receiver for Exploder {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ctl, component::IMAGE)
    }

    fn receive(&self, _envelope: &Envelope) {
        panic!("handler bug");
    }
}

fn router() -> (Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    (Router::new(notifier.clone()), notifier)
}

#[test]
fn alert_is_shown_without_lookup() {
    let (router, notifier) = router();
    let any_alert = Probe::new(Channel::Alert, component::ANY);
    let exact_alert = Probe::new(Channel::Alert, "cluster");
    let _a = router.register(any_alert.clone());
    let _b = router.register(exact_alert.clone());

    let alert = Envelope::new(Channel::Alert, "cluster").with_message("disk almost full");
    assert_eq!(router.dispatch(&alert), Delivery::Alert);
    assert_eq!(notifier.all(), vec![(Level::Warning, "disk almost full".to_string())]);
    assert!(any_alert.seen().is_empty());
    assert!(exact_alert.seen().is_empty());
}

#[test]
fn exact_handler_receives_once_and_unmodified() {
    let (router, notifier) = router();
    let secret = Probe::new(Channel::Ctl, component::SECRET);
    let fallback = Probe::new(Channel::Ctl, component::ANY);
    let _a = router.register(secret.clone());
    let _b = router.register(fallback.clone());

    let env = Envelope::from_json(
        r#"{"type":"ctl","component":"secret","subComponent":"generate","message":"abc"}"#,
    )
    .unwrap();
    assert_eq!(
        router.dispatch(&env),
        Delivery::Handled(RouteKey::new(Channel::Ctl, component::SECRET))
    );
    assert_eq!(secret.seen(), vec![env]);
    assert!(fallback.seen().is_empty());
    assert!(notifier.all().is_empty());
}

#[test]
fn any_handler_catches_the_rest_of_its_channel() {
    let (router, _) = router();
    let fallback = Probe::new(Channel::Ui, component::ANY);
    let _a = router.register(fallback.clone());

    let log = Envelope::new(Channel::Ui, component::LOG).with_message("line");
    assert_eq!(
        router.dispatch(&log),
        Delivery::Fallback(RouteKey::any(Channel::Ui))
    );
    assert_eq!(fallback.seen().len(), 1);

    // other channels are not caught
    let ctl = Envelope::new(Channel::Ctl, component::LOG);
    assert_eq!(router.dispatch(&ctl), Delivery::Unrouted);
    assert_eq!(fallback.seen().len(), 1);
}

#[test]
fn unrouted_envelope_becomes_a_notice() {
    let (router, notifier) = router();
    let env = Envelope::new(Channel::Other("mystery".to_string()), "thing").with_message("hello");
    assert_eq!(router.dispatch(&env), Delivery::Unrouted);

    let failed = Envelope::new(Channel::Ctl, component::PHASE).with_error("boom");
    assert_eq!(router.dispatch(&failed), Delivery::Unrouted);

    assert_eq!(
        notifier.all(),
        vec![
            (Level::Info, "hello".to_string()),
            (Level::Error, "boom".to_string())
        ]
    );
}

#[test]
fn registering_twice_keeps_only_the_second() {
    let (router, _) = router();
    let first = Probe::new(Channel::Ctl, component::HISTORY);
    let second = Probe::new(Channel::Ctl, component::HISTORY);
    let _a = router.register(first.clone());
    let _b = router.register(second.clone());
    assert_eq!(router.len(), 1);

    router.dispatch(&Envelope::new(Channel::Ctl, component::HISTORY));
    assert!(first.seen().is_empty());
    assert_eq!(second.seen().len(), 1);
}

#[test]
fn dropping_registration_deregisters() {
    let (router, _) = router();
    let probe = Probe::new(Channel::Ctl, component::CONFIG);
    let registration = router.register(probe.clone());
    assert!(registration.is_active());
    drop(registration);
    assert!(router.is_empty());
    assert_eq!(
        router.dispatch(&Envelope::new(Channel::Ctl, component::CONFIG)),
        Delivery::Unrouted
    );
}

#[test]
fn panicking_handler_does_not_stop_dispatch() {
    let (router, _) = router();
    let _bad = router.register(Arc::new(Exploder));
    let good = Probe::new(Channel::Ctl, component::SECRET);
    let _good = router.register(good.clone());

    assert_eq!(
        router.dispatch(&Envelope::new(Channel::Ctl, component::IMAGE)),
        Delivery::Panicked(RouteKey::new(Channel::Ctl, component::IMAGE))
    );
    router.dispatch(&Envelope::new(Channel::Ctl, component::SECRET));
    assert_eq!(good.seen().len(), 1);
}
