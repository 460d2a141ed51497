//! Terminal front end of the client: notices, navigation and waiting

use crate::output::{print_error, print_info, print_warning};
use airshipui_client::views::{Revision, ShellView, TaskTray};
use airshipui_client::{
    Client, ClientConfig, Level, Navigator, Notifier, Registration, View, ViewContext,
};
use anyhow::{anyhow, bail, Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::debug;

/// Prints notices and counts them so a waiting command can react
pub struct ConsoleNotifier {
    notices: watch::Sender<u64>,
    errors: watch::Sender<u64>,
    last_error: Mutex<Option<String>>,
}

impl ConsoleNotifier {
    pub fn new() -> Arc<Self> {
        let (notices, _) = watch::channel(0);
        let (errors, _) = watch::channel(0);
        Arc::new(Self {
            notices,
            errors,
            last_error: Mutex::new(None),
        })
    }

    pub fn notices(&self) -> u64 {
        *self.notices.borrow()
    }

    pub fn subscribe_notices(&self) -> watch::Receiver<u64> {
        self.notices.subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<u64> {
        self.errors.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: Level, text: &str) {
        match level {
            Level::Info => print_info(text),
            Level::Warning => print_warning(text),
            Level::Error => {
                print_error(text);
                *self.last_error.lock() = Some(text.to_string());
                self.errors.send_modify(|n| *n += 1);
            }
        }
        self.notices.send_modify(|n| *n += 1);
    }
}

/// Records routes instead of rendering them
pub struct ConsoleNavigator {
    history: watch::Sender<Vec<String>>,
}

impl ConsoleNavigator {
    pub fn new(start: &str) -> Arc<Self> {
        let (history, _) = watch::channel(vec![start.to_string()]);
        Arc::new(Self { history })
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.history.subscribe()
    }
}

impl Navigator for ConsoleNavigator {
    fn current_route(&self) -> String {
        self.history.borrow().last().cloned().unwrap_or_default()
    }

    fn navigate(&self, route: &str) {
        debug!("navigate to {}", route);
        self.history.send_modify(|h| h.push(route.to_string()));
    }
}

/// Waits for a condition, failing on the first error notice.
///
/// Create it before sending the request so no change is missed.
pub struct Waiter {
    changes: watch::Receiver<u64>,
    errors: watch::Receiver<u64>,
    notifier: Arc<ConsoleNotifier>,
    wait: Duration,
}

impl Waiter {
    pub async fn until(mut self, what: &str, mut done: impl FnMut() -> bool) -> Result<()> {
        let work = async {
            loop {
                if self.errors.has_changed().unwrap_or(false) {
                    break;
                }
                if done() {
                    return Ok(());
                }
                tokio::select! {
                    biased;
                    changed = self.errors.changed() => {
                        changed.map_err(|_| anyhow!("Client stopped while waiting for {}", what))?;
                        break;
                    }
                    changed = self.changes.changed() => {
                        changed.map_err(|_| anyhow!("Client stopped while waiting for {}", what))?;
                    }
                }
            }
            bail!(
                "{}",
                self.notifier
                    .last_error()
                    .unwrap_or_else(|| format!("{} failed", what))
            )
        };
        timeout(self.wait, work)
            .await
            .map_err(|_| anyhow!("Timed out waiting for {}", what))?
    }
}

/// A connected client with the shell and task tray attached
pub struct Console {
    pub client: Client,
    pub notifier: Arc<ConsoleNotifier>,
    pub navigator: Arc<ConsoleNavigator>,
    pub shell: Arc<ShellView>,
    pub tasks: Arc<TaskTray>,
    wait: Duration,
    registrations: Vec<Registration>,
}

impl Console {
    /// Start the client on `start_route` and wait for the connection.
    pub async fn connect(config: ClientConfig, start_route: &str, wait: Duration) -> Result<Self> {
        let endpoint = config.endpoint.clone();
        let notifier = ConsoleNotifier::new();
        let navigator = ConsoleNavigator::new(start_route);
        let client = Client::start(config, notifier.clone(), navigator.clone())
            .with_context(|| format!("Cannot start client for {}", endpoint))?;

        let shell = Arc::new(ShellView::new(client.view_context()));
        let tasks = Arc::new(TaskTray::new(client.view_context()));
        let registrations = vec![
            client.activate(shell.clone())?,
            client.activate(tasks.clone())?,
        ];

        match timeout(wait, client.handle().wait_connected()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => bail!("Cannot connect to {}: {}", endpoint, e),
            Err(_) => bail!("Timed out connecting to {}", endpoint),
        }

        Ok(Self {
            client,
            notifier,
            navigator,
            shell,
            tasks,
            wait,
            registrations,
        })
    }

    pub fn context(&self) -> ViewContext {
        self.client.view_context()
    }

    /// Register a view for the rest of the command.
    pub fn activate<V: View + 'static>(&mut self, view: Arc<V>) -> Result<()> {
        let registration = self.client.activate(view)?;
        self.registrations.push(registration);
        Ok(())
    }

    /// Ask the guard whether `route` may be used.
    pub fn require(&self, route: &str) -> Result<()> {
        if self.client.guard().can_activate(route) {
            Ok(())
        } else {
            bail!("Not logged in, run `airshipui login` first")
        }
    }

    /// Waiter woken by changes to one view.
    pub fn waiter(&self, revision: &Revision) -> Waiter {
        self.waiter_on(revision.subscribe())
    }

    /// Waiter woken by any notice, for replies that only show one.
    pub fn notice_waiter(&self) -> Waiter {
        self.waiter_on(self.notifier.subscribe_notices())
    }

    fn waiter_on(&self, changes: watch::Receiver<u64>) -> Waiter {
        Waiter {
            changes,
            errors: self.notifier.subscribe_errors(),
            notifier: self.notifier.clone(),
            wait: self.wait,
        }
    }

    /// Wait until the navigator has moved away from the start route.
    pub async fn wait_navigation(&self, what: &str) -> Result<String> {
        let mut history = self.navigator.subscribe();
        timeout(self.wait, history.wait_for(|h| h.len() > 1))
            .await
            .map_err(|_| anyhow!("Timed out waiting for {}", what))?
            .map_err(|_| anyhow!("Client stopped while waiting for {}", what))?;
        Ok(self.navigator.current_route())
    }

    pub async fn close(self) -> Result<()> {
        drop(self.registrations);
        Ok(self.client.shutdown().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_waiter_returns_once_condition_holds() {
        let notifier = ConsoleNotifier::new();
        let revision = Revision::default();
        let waiter = Waiter {
            changes: revision.subscribe(),
            errors: notifier.subscribe_errors(),
            notifier: notifier.clone(),
            wait: Duration::from_secs(5),
        };
        let flag = Arc::new(Mutex::new(false));
        let seen = flag.clone();
        let bump = revision.clone();
        tokio::spawn(async move {
            *flag.lock() = true;
            bump.bump();
        });
        waiter.until("flag", || *seen.lock()).await.unwrap();
    }

    #[tokio::test]
    async fn test_waiter_fails_on_error_notice() {
        let notifier = ConsoleNotifier::new();
        let revision = Revision::default();
        let waiter = Waiter {
            changes: revision.subscribe(),
            errors: notifier.subscribe_errors(),
            notifier: notifier.clone(),
            wait: Duration::from_secs(5),
        };
        notifier.error("backend exploded");
        let err = waiter.until("nothing", || false).await.unwrap_err();
        assert_eq!(err.to_string(), "backend exploded");
    }

    #[test]
    fn test_navigator_history() {
        let navigator = ConsoleNavigator::new("/login");
        navigator.navigate("/");
        assert_eq!(navigator.current_route(), "/");
        assert_eq!(navigator.subscribe().borrow().len(), 2);
    }
}
