//! Two-step login screen.

use async_trait::async_trait;
use tracing::info;

use crate::flow::{resolve_interstitial, FlowReport, LocationSelection};
use crate::fixtures::Credentials;
use crate::locator::{ElementDescriptor, TextMatch};
use crate::page::PageSurface;
use crate::result::TriageResult;
use crate::session::{Session, SessionConfig};

const NOTIFICATION: &str = ".cds--inline-notification";

/// Username, then password, then an optional location picker
#[derive(Debug, Clone)]
pub struct LoginPage {
    /// Username input
    pub username: ElementDescriptor,
    /// Continue to the password step
    pub continue_button: ElementDescriptor,
    /// Password input
    pub password: ElementDescriptor,
    /// Submit credentials
    pub login_button: ElementDescriptor,
    /// Error notification container
    pub error: ElementDescriptor,
    /// Error notification title
    pub error_title: ElementDescriptor,
    /// Error notification message
    pub error_subtitle: ElementDescriptor,
    location: LocationSelection,
}

impl LoginPage {
    /// Descriptors for the login screen; the location picker chooses
    /// `config.location`
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let error = ElementDescriptor::new("login error notification").css(NOTIFICATION);
        Self {
            username: ElementDescriptor::new("Username input")
                .role("textbox", TextMatch::exact("Username"))
                .label(TextMatch::exact("Username"))
                .attribute("id", "username"),
            continue_button: ElementDescriptor::new("Continue button")
                .role("button", TextMatch::exact("Continue")),
            // password inputs expose no textbox role in every engine
            password: ElementDescriptor::new("Password input")
                .role("textbox", TextMatch::exact("Password"))
                .label(TextMatch::exact("Password"))
                .attribute("id", "password"),
            login_button: ElementDescriptor::new("Log In button")
                .role("button", TextMatch::exact("Log In")),
            error_title: ElementDescriptor::new("login error title")
                .css(format!("{NOTIFICATION}__title"))
                .within(error.clone()),
            error_subtitle: ElementDescriptor::new("login error message")
                .css(format!("{NOTIFICATION}__subtitle"))
                .within(error.clone()),
            error,
            location: LocationSelection::new(&config.location, config.probe_timeout),
        }
    }

    /// Location picker handled after submission
    #[must_use]
    pub const fn location_selection(&self) -> &LocationSelection {
        &self.location
    }

    /// Open the login screen
    pub async fn open(&self, session: &Session) -> TriageResult<()> {
        self.navigate(session).await
    }

    /// Type the username
    pub async fn enter_username(&self, session: &Session, username: &str) -> TriageResult<()> {
        session.act().fill(&self.username, username).await
    }

    /// Advance to the password step
    pub async fn continue_to_password(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.continue_button).await
    }

    /// Type the password
    pub async fn enter_password(&self, session: &Session, password: &str) -> TriageResult<()> {
        session.act().fill(&self.password, password).await
    }

    /// Submit the credentials
    pub async fn submit(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.login_button).await
    }

    /// Handle the location picker if it shows up
    pub async fn handle_location_selection(&self, session: &Session) -> TriageResult<FlowReport> {
        resolve_interstitial(session, &self.location).await
    }

    /// Full login: both credential steps, then the optional location picker
    ///
    /// Completes without error when the credentials are rejected; callers
    /// assert on where the session ended up.
    pub async fn login(&self, session: &Session, credentials: &Credentials) -> TriageResult<FlowReport> {
        info!(username = %credentials.username, "login");
        self.enter_username(session, &credentials.username).await?;
        self.continue_to_password(session).await?;
        self.enter_password(session, &credentials.password).await?;
        self.submit(session).await?;
        self.handle_location_selection(session).await
    }

    /// Log In button is visible right now
    pub async fn is_login_button_visible(&self, session: &Session) -> TriageResult<bool> {
        session.act().is_visible(&self.login_button).await
    }

    /// Log In button caption
    pub async fn login_button_text(&self, session: &Session) -> TriageResult<String> {
        session.act().inner_text(&self.login_button).await
    }

    /// Error message is visible right now
    pub async fn is_error_visible(&self, session: &Session) -> TriageResult<bool> {
        session.act().is_visible(&self.error_subtitle).await
    }

    /// Error message text
    pub async fn error_text(&self, session: &Session) -> TriageResult<String> {
        session.act().inner_text(&self.error_subtitle).await
    }
}

#[async_trait]
impl PageSurface for LoginPage {
    fn name(&self) -> &str {
        "login"
    }

    fn path(&self) -> &str {
        "login"
    }

    fn descriptors(&self) -> Vec<&ElementDescriptor> {
        vec![
            &self.username,
            &self.continue_button,
            &self.password,
            &self.login_button,
            &self.error,
            &self.error_title,
            &self.error_subtitle,
        ]
    }

    fn ready_marker(&self) -> &ElementDescriptor {
        &self.username
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::flow::FlowOutcome;
    use crate::fixtures::CredentialSet;
    use crate::mock::{ClinicOptions, LocationScreen, MockClinic};
    use crate::result::TriageError;
    use std::sync::Arc;
    use std::time::Duration;

    fn clinic(options: ClinicOptions) -> (Session, LoginPage) {
        let config = SessionConfig::new().with_base_url(options.base_url.clone());
        let page = LoginPage::new(&config);
        let session = Session::new(Arc::new(MockClinic::surface(options)), Arc::new(config));
        (session, page)
    }

    mod login_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_login_through_location_picker() {
            let (session, page) = clinic(ClinicOptions::default());
            page.open(&session).await.unwrap();
            let report = page
                .login(&session, &CredentialSet::default().valid)
                .await
                .unwrap();
            assert_eq!(report.outcome, FlowOutcome::Present);
            let url = session.location().await.unwrap();
            assert!(url.ends_with("/spa/home"), "{url}");
        }

        #[tokio::test(start_paused = true)]
        async fn test_login_without_picker() {
            let options = ClinicOptions::default().with_location_screen(LocationScreen::Never);
            let (session, page) = clinic(options);
            page.open(&session).await.unwrap();
            let report = page
                .login(&session, &CredentialSet::default().valid)
                .await
                .unwrap();
            assert_eq!(report.outcome, FlowOutcome::Absent);
            assert!(!session.location().await.unwrap().contains("login"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_rejected_credentials_show_error() {
            let (session, page) = clinic(ClinicOptions::default());
            page.open(&session).await.unwrap();
            page.login(&session, &CredentialSet::default().invalid)
                .await
                .unwrap();
            assert!(page.is_error_visible(&session).await.unwrap());
            assert_eq!(
                page.error_text(&session).await.unwrap(),
                "Invalid username or password"
            );
            assert!(session.location().await.unwrap().contains("login"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_empty_username_blocks_password_step() {
            let (session, page) = clinic(ClinicOptions::default());
            page.open(&session).await.unwrap();
            page.continue_to_password(&session).await.unwrap();
            let err = page
                .enter_password(&session, "Admin123")
                .await
                .unwrap_err();
            assert!(matches!(err, TriageError::Timeout { .. }));
            assert!(!page.is_login_button_visible(&session).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_login_button_caption() {
            let (session, page) = clinic(ClinicOptions::default());
            page.open(&session).await.unwrap();
            page.enter_username(&session, "admin").await.unwrap();
            page.continue_to_password(&session).await.unwrap();
            assert_eq!(page.login_button_text(&session).await.unwrap(), "Log In");
            assert!(page.is_login_button_visible(&session).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_probe_bound_comes_from_config() {
            let config = SessionConfig::new().with_probe_timeout(Duration::from_secs(2));
            let page = LoginPage::new(&config);
            assert_eq!(
                crate::flow::Interstitial::probe_timeout(page.location_selection()),
                Duration::from_secs(2)
            );
        }
    }
}
