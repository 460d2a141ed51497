//! Login, logout and session status

use super::Globals;
use crate::console::Console;
use crate::output::{print_item, print_success, TableDisplay};
use airshipui_client::views::LoginView;
use airshipui_client::{AuthState, FileTokenStore, SessionState};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Connection and credential summary
#[derive(Serialize)]
pub struct StatusDisplay {
    pub endpoint: String,
    pub connection: String,
    pub session_id: String,
    pub logged_in: bool,
    pub token_expires: String,
    pub dashboards: Vec<String>,
}

impl TableDisplay for StatusDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Endpoint", "Connection", "Session", "Logged In", "Token Expires", "Dashboards"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.endpoint.clone(),
            self.connection.clone(),
            self.session_id.clone(),
            if self.logged_in { "yes" } else { "no" }.to_string(),
            self.token_expires.clone(),
            self.dashboards.join(", "),
        ]
    }
}

fn format_expiry(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default()
}

pub async fn login(globals: &Globals, id: &str, password: &str) -> Result<()> {
    let login_route = globals.config.auth.login_route.clone();
    let console = Console::connect(globals.config.clone(), &login_route, globals.timeout).await?;

    let view = LoginView::new(console.context());
    view.submit(id, password)?;
    let outcome = console.wait_navigation("login reply").await;
    let state = console.client.guard().state();
    let last_error = console.notifier.last_error();
    console.close().await?;
    outcome?;

    if state == AuthState::Authenticated {
        print_success(&format!("Logged in as {}", id));
        Ok(())
    } else {
        bail!("{}", last_error.unwrap_or_else(|| "Login denied".to_string()))
    }
}

/// Forget the cached token. Needs no connection.
pub fn logout(globals: &Globals) -> Result<()> {
    let store = Arc::new(FileTokenStore::new(globals.config.token_store_path.clone()));
    let session = SessionState::init(store)?;
    session.clear_token()?;
    print_success("Logged out");
    Ok(())
}

pub async fn status(globals: &Globals) -> Result<()> {
    let console = Console::connect(globals.config.clone(), "/", globals.timeout).await?;
    console
        .waiter(console.shell.revision())
        .until("session id", || console.shell.snapshot().session_id.is_some())
        .await?;

    let shell = console.shell.snapshot();
    let token = console.client.session().token();
    let display = StatusDisplay {
        endpoint: globals.config.endpoint.clone(),
        connection: format!("{:?}", console.client.handle().state()),
        session_id: shell.session_id.unwrap_or_default(),
        logged_in: token.as_ref().is_some_and(|t| t.is_valid()),
        token_expires: token.map(|t| format_expiry(t.date)).unwrap_or_default(),
        dashboards: shell
            .dashboards
            .iter()
            .map(|d| format!("{} ({}{})", d.name, d.base_url, d.path))
            .collect(),
    };
    console.close().await?;
    print_item(&display, globals.format);
    Ok(())
}
