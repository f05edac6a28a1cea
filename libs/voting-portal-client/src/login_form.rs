//! The login form: reads credentials, logs in, stores the session and
//! redirects, or shows what went wrong.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::client::Client;
use crate::context::SessionContext;
use crate::result::{Error, ErrorKind, Result};
use crate::session::Destination;
use crate::types::Credentials;

/// Shown when an error carries no message of its own.
const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Shown when a transport failure carries no message of its own.
const TRANSPORT_ERROR_MESSAGE: &str = "Login failed. Please try again.";

/// The parts of the page the login form talks to.
#[cfg_attr(test, mockall::automock)]
pub trait LoginView {
    /// Current contents of the voter ID and password fields.
    fn read_credentials(&self) -> Credentials;

    /// Whether the page has a region for inline error messages.
    fn has_error_region(&self) -> bool;

    fn show_error(&self, message: &str);
    fn hide_error(&self);

    /// Blocking alert, used when there is no error region.
    fn alert(&self, message: &str);

    /// Enable or disable the submit control.
    fn set_submitting(&self, submitting: bool);

    fn navigate(&self, destination: Destination);
}

/// Handles submissions of the login form.
#[derive(Debug)]
pub struct LoginForm<V> {
    client: Client,
    view: V,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<V: LoginView> LoginForm<V> {
    pub const fn new(client: Client, view: V) -> Self {
        Self {
            client,
            view,
            in_flight: AtomicBool::new(false),
        }
    }

    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Whether a submission is waiting on the server.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Handle one submission. On success the session is stored in `context`
    /// and the view is sent to the page for the session's role. On failure
    /// the error is shown in the view and also returned.
    ///
    /// A submission made while another is in flight is refused with
    /// [`Error::SubmitInProgress`] and leaves the view untouched.
    pub async fn submit(&self, context: &Mutex<SessionContext>) -> Result<Destination> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("ignoring login submission while another is in flight");
            return Err(Error::SubmitInProgress);
        };

        self.view.hide_error();
        self.view.set_submitting(true);
        let result = self.attempt(context).await;
        self.view.set_submitting(false);

        match result {
            Ok(destination) => {
                self.view.navigate(destination);
                Ok(destination)
            }
            Err(e) => {
                tracing::error!("Login error: {e}");
                self.show_error(&user_message(&e));
                Err(e)
            }
        }
    }

    async fn attempt(&self, context: &Mutex<SessionContext>) -> Result<Destination> {
        let credentials = self.view.read_credentials();
        let session = self.client.login(&credentials).await?;
        let destination = session.role().destination();
        context.lock().await.begin(session)?;
        Ok(destination)
    }

    fn show_error(&self, message: &str) {
        let message = if message.is_empty() {
            GENERIC_ERROR_MESSAGE
        } else {
            message
        };

        if self.view.has_error_region() {
            self.view.show_error(message);
        } else {
            self.view.alert(message);
        }
    }
}

fn user_message(error: &Error) -> String {
    message_for(error.kind(), error.to_string())
}

/// A transport or parse fault with no text of its own reads as a retry hint.
fn message_for(kind: ErrorKind, message: String) -> String {
    let is_fault = matches!(kind, ErrorKind::Transport | ErrorKind::MalformedResponse);
    if message.is_empty() && is_fault {
        TRANSPORT_ERROR_MESSAGE.to_owned()
    } else {
        message
    }
}
