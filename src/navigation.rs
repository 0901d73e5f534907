//! Routing between the two screens and user-facing notifications.

use std::fmt;

use log::{info, warn};

/// The two screens of the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// The intake form collecting the profile.
    IntakeForm,
    /// The viewer rendering and exporting the stored profile.
    ProfileView,
}

impl Route {
    /// Path the route is mounted at.
    pub fn path(self) -> &'static str {
        match self {
            Route::IntakeForm => "/",
            Route::ProfileView => "/view",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Moves the application to another screen.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// Shows blocking messages to the user.
pub trait Notifier {
    /// Reports a failure the user has to act on.
    fn alert(&mut self, message: &str);

    /// Confirms a completed action.
    fn confirm(&mut self, message: &str);
}

/// Navigator that remembers the requested route until it is taken.
#[derive(Debug, Default)]
pub struct PendingRoute {
    next: Option<Route>,
}

impl PendingRoute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last requested route and resets the navigator.
    pub fn take(&mut self) -> Option<Route> {
        self.next.take()
    }

    /// Returns the last requested route without consuming it.
    pub fn peek(&self) -> Option<Route> {
        self.next
    }
}

impl Navigator for PendingRoute {
    fn navigate(&mut self, route: Route) {
        info!("navigating to {route}");
        self.next = Some(route);
    }
}

/// Notifier that keeps every message, in order.
#[derive(Debug, Default)]
pub struct MessageLog {
    alerts: Vec<String>,
    confirmations: Vec<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn confirmations(&self) -> &[String] {
        &self.confirmations
    }

    /// Most recent alert, if any.
    pub fn last_alert(&self) -> Option<&str> {
        self.alerts.last().map(String::as_str)
    }
}

impl Notifier for MessageLog {
    fn alert(&mut self, message: &str) {
        warn!("{message}");
        self.alerts.push(message.to_owned());
    }

    fn confirm(&mut self, message: &str) {
        info!("{message}");
        self.confirmations.push(message.to_owned());
    }
}
