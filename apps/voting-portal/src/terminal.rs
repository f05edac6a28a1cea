//! The login form, as seen from a terminal.

use std::cell::RefCell;

use voting_portal_client::{Credentials, Destination, LoginView};

/// Presents the login form on the terminal. Credentials come from the command
/// line, errors go to `stderr`, and redirects print the page URL.
#[derive(Debug)]
pub(crate) struct TerminalView {
    credentials: Credentials,
    frontend_url: reqwest::Url,
    redirected_to: RefCell<Option<reqwest::Url>>,
}

impl TerminalView {
    pub(crate) fn new(credentials: Credentials, frontend_url: reqwest::Url) -> Self {
        Self {
            credentials,
            frontend_url,
            redirected_to: RefCell::new(None),
        }
    }

    /// The page the last successful login redirected to.
    pub(crate) fn redirected_to(&self) -> Option<reqwest::Url> {
        self.redirected_to.borrow().clone()
    }

    fn page_url(&self, destination: Destination) -> reqwest::Url {
        self.frontend_url
            .join(destination.path())
            .unwrap_or_else(|_| self.frontend_url.clone())
    }
}

impl LoginView for TerminalView {
    fn read_credentials(&self) -> Credentials {
        self.credentials.clone()
    }

    fn has_error_region(&self) -> bool {
        true
    }

    #[allow(clippy::print_stderr)]
    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn hide_error(&self) {}

    #[allow(clippy::print_stderr)]
    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }

    fn set_submitting(&self, submitting: bool) {
        if submitting {
            tracing::debug!("submitting login for {}", self.credentials.voter_id);
        }
    }

    fn navigate(&self, destination: Destination) {
        let url = self.page_url(destination);
        tracing::info!("redirecting to {url}");
        *self.redirected_to.borrow_mut() = Some(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn navigate_resolves_against_frontend_url() {
        let view = TerminalView::new(
            Credentials::new("voter-1", "pw"),
            "http://127.0.0.1:8080/portal/".parse().unwrap(),
        );
        assert_eq!(view.redirected_to(), None);

        view.navigate(Destination::AdminPage);
        assert_eq!(
            view.redirected_to().map(String::from),
            Some("http://127.0.0.1:8080/portal/admin.html".to_owned())
        );

        view.navigate(Destination::VoterPage);
        assert_eq!(
            view.redirected_to().map(String::from),
            Some("http://127.0.0.1:8080/portal/index.html".to_owned())
        );
    }

    #[test]
    fn reads_credentials_given_on_the_command_line() {
        let view = TerminalView::new(
            Credentials::new("voter-1", "pw"),
            "http://127.0.0.1:8080/".parse().unwrap(),
        );
        assert_eq!(view.read_credentials(), Credentials::new("voter-1", "pw"));
    }
}
