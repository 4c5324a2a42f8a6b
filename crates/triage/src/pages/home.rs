//! Home dashboard: header, user menu and side navigation.

use async_trait::async_trait;

use crate::actions::ElementCondition;
use crate::locator::{ElementDescriptor, TextMatch};
use crate::page::PageSurface;
use crate::result::TriageResult;
use crate::session::Session;
use crate::wait::LoadState;

/// Shell shown after login
#[derive(Debug, Clone)]
pub struct HomePage {
    /// Application logo in the header
    pub logo: ElementDescriptor,
    /// My Account button
    pub my_account: ElementDescriptor,
    /// User menu panel
    pub user_menu: ElementDescriptor,
    /// User entry
    pub user_menu_user: ElementDescriptor,
    /// Change language entry
    pub user_menu_change_language: ElementDescriptor,
    /// Change password entry
    pub user_menu_change_password: ElementDescriptor,
    /// Logout entry
    pub logout: ElementDescriptor,
    /// Add patient button in the header
    pub add_patient: ElementDescriptor,
    /// Service queues link
    pub service_queues_link: ElementDescriptor,
    /// Appointments link
    pub appointments_link: ElementDescriptor,
    /// Change button next to the current language
    pub change_language: ElementDescriptor,
    /// English choice in the language dialog
    pub english: ElementDescriptor,
}

impl Default for HomePage {
    fn default() -> Self {
        Self::new()
    }
}

impl HomePage {
    /// Descriptors for the dashboard shell
    #[must_use]
    pub fn new() -> Self {
        let user_menu = ElementDescriptor::new("user menu")
            .role("menu", TextMatch::exact("User menu options"));
        Self {
            logo: ElementDescriptor::new("OpenMRS logo").role("img", TextMatch::exact("OpenMRS Logo")),
            my_account: ElementDescriptor::new("My Account button")
                .role("button", TextMatch::exact("My Account"))
                .attribute("aria-label", "My Account"),
            user_menu_user: ElementDescriptor::new("User menu entry")
                .role("link", TextMatch::exact("User"))
                .within(user_menu.clone()),
            user_menu_change_language: ElementDescriptor::new("Change language menu entry")
                .role("link", TextMatch::exact("Change language"))
                .label(TextMatch::exact("Change language"))
                .within(user_menu.clone()),
            user_menu_change_password: ElementDescriptor::new("Change password menu entry")
                .role("link", TextMatch::exact("Change password"))
                .within(user_menu.clone()),
            logout: ElementDescriptor::new("Logout button").role("button", TextMatch::exact("Logout")),
            user_menu,
            add_patient: ElementDescriptor::new("Add patient button")
                .role("button", TextMatch::exact("Add patient")),
            service_queues_link: ElementDescriptor::new("Service queues link")
                .role("link", TextMatch::exact("Service queues")),
            appointments_link: ElementDescriptor::new("Appointments link")
                .role("link", TextMatch::exact("Appointments"))
                .text(TextMatch::exact("Appointments")),
            change_language: ElementDescriptor::new("Change language button")
                .role("button", TextMatch::exact("Change"))
                .within(ElementDescriptor::new("language entry").label(TextMatch::exact("Change language"))),
            english: ElementDescriptor::new("English option").role("button", TextMatch::exact("English")),
        }
    }

    /// Open the user menu; an open menu is left as is
    pub async fn open_user_menu(&self, session: &Session) -> TriageResult<()> {
        let act = session.act();
        if act.is_visible(&self.user_menu).await? {
            return Ok(());
        }
        act.click(&self.my_account).await?;
        act.wait_for(&self.user_menu, ElementCondition::Visible).await
    }

    /// User menu is open right now
    pub async fn is_user_menu_visible(&self, session: &Session) -> TriageResult<bool> {
        session.act().is_visible(&self.user_menu).await
    }

    /// Log out through the user menu
    pub async fn logout(&self, session: &Session) -> TriageResult<()> {
        self.open_user_menu(session).await?;
        session.act().click(&self.logout).await?;
        session.wait_for_load(LoadState::Load).await
    }

    /// Follow the Service queues link
    pub async fn go_to_service_queues(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.service_queues_link).await?;
        session.wait_for_load(LoadState::Load).await
    }

    /// Follow the Appointments link
    pub async fn go_to_appointments(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.appointments_link).await?;
        session.wait_for_load(LoadState::Load).await
    }

    /// Open patient registration from the header
    pub async fn open_patient_registration(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.add_patient).await?;
        session.wait_for_load(LoadState::Load).await
    }

    /// Add patient button is visible right now
    pub async fn is_add_patient_visible(&self, session: &Session) -> TriageResult<bool> {
        session.act().is_visible(&self.add_patient).await
    }

    /// Switch the interface to English
    pub async fn change_language(&self, session: &Session) -> TriageResult<()> {
        self.open_user_menu(session).await?;
        let act = session.act();
        act.click(&self.change_language).await?;
        act.click(&self.english).await?;
        act.wait_for(&self.english, ElementCondition::Hidden).await
    }
}

#[async_trait]
impl PageSurface for HomePage {
    fn name(&self) -> &str {
        "home"
    }

    fn path(&self) -> &str {
        "home"
    }

    fn descriptors(&self) -> Vec<&ElementDescriptor> {
        vec![
            &self.logo,
            &self.my_account,
            &self.user_menu,
            &self.user_menu_user,
            &self.user_menu_change_language,
            &self.user_menu_change_password,
            &self.logout,
            &self.add_patient,
            &self.service_queues_link,
            &self.appointments_link,
            &self.change_language,
            &self.english,
        ]
    }

    fn ready_marker(&self) -> &ElementDescriptor {
        &self.logo
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixtures::CredentialSet;
    use crate::mock::{ClinicOptions, LocationScreen, MockClinic, MockSurface};
    use crate::pages::LoginPage;
    use crate::session::SessionConfig;
    use std::sync::Arc;

    async fn logged_in() -> (Session, Arc<MockSurface>, HomePage) {
        let options = ClinicOptions::default().with_location_screen(LocationScreen::Never);
        let config = SessionConfig::new().with_base_url(options.base_url.clone());
        let surface = Arc::new(MockClinic::surface(options));
        let session = Session::new(surface.clone(), Arc::new(config.clone()));
        let login = LoginPage::new(&config);
        login.open(&session).await.unwrap();
        login
            .login(&session, &CredentialSet::default().valid)
            .await
            .unwrap();
        let home = HomePage::new();
        home.wait_until_loaded(&session).await.unwrap();
        (session, surface, home)
    }

    mod menu_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_user_menu_and_logout() {
            let (session, surface, home) = logged_in().await;
            assert!(!home.is_user_menu_visible(&session).await.unwrap());
            home.open_user_menu(&session).await.unwrap();
            assert!(home.is_user_menu_visible(&session).await.unwrap());
            assert_eq!(session.act().count(&home.user_menu_user).await.unwrap(), 1);
            home.logout(&session).await.unwrap();
            assert!(session.location().await.unwrap().ends_with("/login"));
            assert_eq!(surface.clicks_on("logout"), 1);
            assert_eq!(surface.clicks_on("my-account"), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_open_user_menu_twice_keeps_it_open() {
            let (session, surface, home) = logged_in().await;
            home.open_user_menu(&session).await.unwrap();
            home.open_user_menu(&session).await.unwrap();
            assert!(home.is_user_menu_visible(&session).await.unwrap());
            assert_eq!(surface.clicks_on("my-account"), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_change_language() {
            let (session, surface, home) = logged_in().await;
            home.change_language(&session).await.unwrap();
            assert_eq!(surface.clicks_on("change-language"), 1);
            assert_eq!(surface.clicks_on("language-english"), 1);
        }
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_links() {
            let (session, _surface, home) = logged_in().await;
            home.go_to_appointments(&session).await.unwrap();
            assert!(session.location().await.unwrap().contains("appointments"));
            home.go_to_service_queues(&session).await.unwrap();
            assert!(session.location().await.unwrap().contains("/home/service-queues"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_open_registration() {
            let (session, _surface, home) = logged_in().await;
            assert!(home.is_add_patient_visible(&session).await.unwrap());
            home.open_patient_registration(&session).await.unwrap();
            assert!(session.location().await.unwrap().contains("patient-registration"));
        }
    }
}
