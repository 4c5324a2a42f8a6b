//! Page surfaces of the clinic application.

mod home;
mod login;
mod queue;
mod register;

pub use home::HomePage;
pub use login::LoginPage;
pub use queue::{MetricCard, QueuePage, QUEUE_COLUMNS};
pub use register::{PatientDetails, RegisterPatientPage, Sex};

use crate::session::SessionConfig;

/// Every page surface, built once per scenario
#[derive(Debug, Clone)]
pub struct Pages {
    /// Login screen
    pub login: LoginPage,
    /// Home dashboard
    pub home: HomePage,
    /// Service queues
    pub queue: QueuePage,
    /// Patient registration
    pub register: RegisterPatientPage,
}

impl Pages {
    /// Pages configured from the session settings
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            login: LoginPage::new(config),
            home: HomePage::new(),
            queue: QueuePage::new(),
            register: RegisterPatientPage::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::page::PageSurface;
    use std::collections::HashSet;

    fn surfaces(pages: &Pages) -> Vec<&dyn PageSurface> {
        vec![&pages.login, &pages.home, &pages.queue, &pages.register]
    }

    #[test]
    fn test_descriptor_names_unique_per_page() {
        let pages = Pages::new(&SessionConfig::default());
        for page in surfaces(&pages) {
            let mut seen = HashSet::new();
            for d in page.descriptors() {
                assert!(seen.insert(d.name().to_string()), "{} repeats {}", page.name(), d.name());
            }
        }
    }

    #[test]
    fn test_every_descriptor_has_a_strategy() {
        let pages = Pages::new(&SessionConfig::default());
        for page in surfaces(&pages) {
            for d in page.descriptors() {
                assert!(!d.strategies().is_empty(), "{}", d.name());
            }
        }
    }

    #[test]
    fn test_ready_marker_is_owned() {
        let pages = Pages::new(&SessionConfig::default());
        for page in surfaces(&pages) {
            let marker = page.ready_marker().name();
            assert!(page.descriptors().iter().any(|d| d.name() == marker));
        }
    }

    #[test]
    fn test_paths_are_relative() {
        let pages = Pages::new(&SessionConfig::default());
        for page in surfaces(&pages) {
            assert!(!page.path().starts_with('/'));
        }
    }
}
