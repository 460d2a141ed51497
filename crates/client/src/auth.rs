//! Authentication guard
//!
//! Gates route activation on the cached token and reacts to `ui/auth`
//! replies. Decisions are synchronous and read only local state; the
//! backend's verdict arrives later through `receive` and may log the
//! operator out after the fact.

use crate::config::AuthConfig;
use crate::notify::Notifier;
use crate::router::Receiver;
use crate::session::SessionState;
use crate::transport::Outbox;
use airshipui_common::{component, now_millis, sub, Channel, Envelope, RouteKey};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Where navigation happens
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> String;
    fn navigate(&self, route: &str);
}

/// Navigator that only remembers where it has been
#[derive(Default)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(start: &str) -> Self {
        Self {
            history: Mutex::new(vec![start.to_string()]),
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_route(&self) -> String {
        self.history.lock().last().cloned().unwrap_or_default()
    }

    fn navigate(&self, route: &str) {
        self.history.lock().push(route.to_string());
    }
}

/// Router lifecycle events the guard listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    Start(String),
    End(String),
    Cancel,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    PendingValidation,
    Authenticated,
}

/// Auth-dependent bits of the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordances {
    /// "Login" or "Logout"
    pub auth_button: &'static str,
    pub show_log_panel: bool,
}

impl Affordances {
    fn for_state(authenticated: bool) -> Self {
        if authenticated {
            Self {
                auth_button: "Logout",
                show_log_panel: true,
            }
        } else {
            Self {
                auth_button: "Login",
                show_log_panel: false,
            }
        }
    }
}

struct GuardState {
    state: AuthState,
    validation_requested: bool,
    navigating: bool,
    redirect_pending: bool,
}

/// Side effects decided under the lock and run after it is released
enum Action {
    Send(Envelope),
    Navigate(String),
}

pub struct AuthGuard {
    outbox: Arc<dyn Outbox>,
    session: Arc<SessionState>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    config: AuthConfig,
    state: Mutex<GuardState>,
    affordances: watch::Sender<Affordances>,
}

impl AuthGuard {
    pub fn new(
        outbox: Arc<dyn Outbox>,
        session: Arc<SessionState>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        config: AuthConfig,
    ) -> Arc<Self> {
        let (affordances, _) = watch::channel(Affordances::for_state(false));
        Arc::new(Self {
            outbox,
            session,
            navigator,
            notifier,
            config,
            state: Mutex::new(GuardState {
                state: AuthState::Unauthenticated,
                validation_requested: false,
                navigating: false,
                redirect_pending: false,
            }),
            affordances,
        })
    }

    pub fn state(&self) -> AuthState {
        self.state.lock().state
    }

    pub fn affordances(&self) -> Affordances {
        self.affordances.borrow().clone()
    }

    pub fn watch_affordances(&self) -> watch::Receiver<Affordances> {
        self.affordances.subscribe()
    }

    /// Decide whether `route` may be shown. Never waits on the network.
    pub fn can_activate(&self, route: &str) -> bool {
        let mut actions = Vec::new();
        let allowed = {
            let mut guard = self.state.lock();

            if !guard.validation_requested {
                if let Some(cached) = self.session.token() {
                    guard.validation_requested = true;
                    if guard.state == AuthState::Unauthenticated {
                        guard.state = AuthState::PendingValidation;
                    }
                    let mut validate =
                        Envelope::request(Channel::Ui, component::AUTH, sub::VALIDATE);
                    validate.token = Some(cached.token);
                    validate.refresh_token = cached.refresh_token;
                    actions.push(Action::Send(validate));
                }
            }

            let authenticated = self.session.is_authenticated_at(now_millis());
            self.set_affordances(authenticated);

            if route == self.config.login_route {
                if authenticated {
                    actions.push(Action::Navigate(self.config.home_route.clone()));
                    false
                } else {
                    true
                }
            } else if authenticated {
                true
            } else {
                if guard.navigating {
                    guard.redirect_pending = true;
                } else {
                    actions.push(Action::Navigate(self.config.login_route.clone()));
                }
                false
            }
        };
        debug!("can_activate({}) = {}", route, allowed);
        self.run(actions);
        allowed
    }

    /// Track navigation so a forced redirect never clobbers one in flight.
    pub fn on_navigation(&self, event: &NavigationEvent) {
        let replay = {
            let mut guard = self.state.lock();
            match event {
                NavigationEvent::Start(_) => {
                    guard.navigating = true;
                    false
                }
                NavigationEvent::End(_) => {
                    guard.navigating = false;
                    std::mem::take(&mut guard.redirect_pending)
                }
                NavigationEvent::Cancel | NavigationEvent::Error => {
                    guard.navigating = false;
                    false
                }
            }
        };
        if replay {
            self.navigator.navigate(&self.config.login_route);
        }
    }

    /// Drop credentials and return to the login view. The redirect waits
    /// for a navigation in flight.
    pub fn logout(&self) {
        let redirect_now = {
            let mut guard = self.state.lock();
            guard.state = AuthState::Unauthenticated;
            guard.validation_requested = false;
            if guard.navigating {
                guard.redirect_pending = true;
            }
            !guard.navigating
        };
        if let Err(e) = self.session.clear_token() {
            warn!("Failed to clear cached token: {}", e);
        }
        self.set_affordances(false);
        if redirect_now {
            self.navigator.navigate(&self.config.login_route);
        }
    }

    fn approve(&self, envelope: &Envelope) {
        let Some(token) = envelope.token.clone() else {
            warn!("Auth approval without a token");
            self.logout();
            return;
        };
        let refresh = envelope
            .refresh_token
            .clone()
            .or_else(|| self.session.token().and_then(|t| t.refresh_token));
        if let Err(e) = self
            .session
            .store_token(token, refresh, self.config.token_ttl_secs)
        {
            warn!("Failed to persist token: {}", e);
        }
        {
            let mut guard = self.state.lock();
            guard.state = AuthState::Authenticated;
            guard.validation_requested = true;
        }
        self.set_affordances(true);
        if self.navigator.current_route() == self.config.login_route {
            self.navigator.navigate(&self.config.home_route);
        }
    }

    fn set_affordances(&self, authenticated: bool) {
        self.affordances.send_if_modified(|current| {
            let next = Affordances::for_state(authenticated);
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn run(&self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Send(envelope) => {
                    if let Err(e) = self.outbox.send(envelope) {
                        warn!("Could not queue token validation: {}", e);
                    }
                }
                Action::Navigate(route) => self.navigator.navigate(&route),
            }
        }
    }
}

impl Receiver for AuthGuard {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ui, component::AUTH)
    }

    fn receive(&self, envelope: &Envelope) {
        if let Some(err) = &envelope.error {
            error!("Auth error from backend: {}", err);
            self.notifier.error(err);
            self.logout();
            return;
        }
        match envelope.sub() {
            sub::APPROVED => {
                debug!("Auth approved");
                self.approve(envelope);
            }
            sub::DENIED => {
                debug!("Auth denied");
                self.logout();
            }
            sub::REFRESH => match &envelope.refresh_token {
                Some(refresh) => {
                    if let Err(e) = self.session.update_refresh_token(refresh.clone()) {
                        warn!("Failed to persist refresh token: {}", e);
                    }
                }
                None => debug!("Refresh without a refresh token"),
            },
            other => {
                debug!("Unknown auth message {:?}", other);
                self.logout();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affordances_follow_auth() {
        assert_eq!(Affordances::for_state(true).auth_button, "Logout");
        assert!(Affordances::for_state(true).show_log_panel);
        assert_eq!(Affordances::for_state(false).auth_button, "Login");
        assert!(!Affordances::for_state(false).show_log_panel);
    }

    #[test]
    fn test_memory_navigator() {
        let nav = MemoryNavigator::new("/");
        nav.navigate("/login");
        assert_eq!(nav.current_route(), "/login");
        assert_eq!(nav.history(), vec!["/", "/login"]);
    }
}
