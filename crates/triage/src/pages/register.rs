//! Patient registration form.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::locator::{ElementDescriptor, TextMatch};
use crate::page::PageSurface;
use crate::result::{TriageError, TriageResult};
use crate::session::Session;

/// Sex options offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    /// Male
    Male,
    /// Female
    Female,
    /// Other
    Other,
    /// Unknown
    Unknown,
}

impl Sex {
    /// Every option in form order
    pub const ALL: [Self; 4] = [Self::Male, Self::Female, Self::Other, Self::Unknown];

    /// Label shown next to the radio
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sex {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sex| sex.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TriageError::Config {
                message: format!("invalid sex option: {s:?}"),
            })
    }
}

/// Values for one registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    /// Given name
    pub given_name: String,
    /// Middle name
    #[serde(default)]
    pub middle_name: Option<String>,
    /// Family name
    pub family_name: String,
    /// Sex
    pub sex: Sex,
    /// Birth date as `YYYY-MM-DD`
    pub date_of_birth: String,
    /// Phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// First address line
    #[serde(default)]
    pub address: Option<String>,
    /// Country
    #[serde(default)]
    pub country: Option<String>,
}

impl PatientDetails {
    /// Required fields only
    #[must_use]
    pub fn new(
        given_name: impl Into<String>,
        family_name: impl Into<String>,
        sex: Sex,
        date_of_birth: impl Into<String>,
    ) -> Self {
        Self {
            given_name: given_name.into(),
            middle_name: None,
            family_name: family_name.into(),
            sex,
            date_of_birth: date_of_birth.into(),
            phone: None,
            email: None,
            address: None,
            country: None,
        }
    }

    /// Set phone number
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set email
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

fn input(name: &str, caption: &str) -> ElementDescriptor {
    ElementDescriptor::new(format!("{caption} input")).attribute("name", name)
}

fn button(caption: &str) -> ElementDescriptor {
    ElementDescriptor::new(format!("{caption} button"))
        .role("button", TextMatch::exact(caption))
        .css_with_text("button", TextMatch::contains(caption))
}

fn header(caption: &str) -> ElementDescriptor {
    ElementDescriptor::new(format!("{caption} header")).text(TextMatch::exact(caption))
}

/// The registration form
#[derive(Debug, Clone)]
pub struct RegisterPatientPage {
    /// Given name
    pub given_name: ElementDescriptor,
    /// Middle name
    pub middle_name: ElementDescriptor,
    /// Family name
    pub family_name: ElementDescriptor,
    /// Birth date
    pub date_of_birth: ElementDescriptor,
    /// Phone number
    pub phone: ElementDescriptor,
    /// Email
    pub email: ElementDescriptor,
    /// Address line 1
    pub address: ElementDescriptor,
    /// Country
    pub country: ElementDescriptor,
    /// Sex heading
    pub sex_heading: ElementDescriptor,
    /// Patient name unknown checkbox
    pub unknown_patient: ElementDescriptor,
    /// Register Patient
    pub register: ElementDescriptor,
    /// Cancel
    pub cancel: ElementDescriptor,
    /// Clear Form
    pub clear_form: ElementDescriptor,
    /// Create new patient
    pub new_patient_header: ElementDescriptor,
    /// Basic Info
    pub basic_info_header: ElementDescriptor,
    /// Contact Details
    pub contact_header: ElementDescriptor,
    /// Relationships
    pub relationships_header: ElementDescriptor,
    sex_options: [ElementDescriptor; 4],
}

impl Default for RegisterPatientPage {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPatientPage {
    /// Descriptors for the registration form
    #[must_use]
    pub fn new() -> Self {
        Self {
            given_name: input("givenName", "First name"),
            middle_name: input("middleName", "Middle name"),
            family_name: input("familyName", "Family name"),
            date_of_birth: ElementDescriptor::new("Date of birth input")
                .attribute("name", "birthdate")
                .css("input[type=\"date\"][name=\"birthdate\"]"),
            phone: input("telephoneNumber", "Phone number"),
            email: input("email", "Email"),
            address: input("address1", "Address"),
            country: ElementDescriptor::new("Country input").role("textbox", TextMatch::exact("Country")),
            sex_heading: ElementDescriptor::new("Sex heading").role("heading", TextMatch::exact("Sex")),
            unknown_patient: ElementDescriptor::new("unknown patient checkbox")
                .attribute("name", "unknown")
                .css("input[type=\"checkbox\"][name=\"unknown\"]"),
            register: button("Register Patient"),
            cancel: button("Cancel"),
            clear_form: button("Clear Form"),
            new_patient_header: header("Create new patient"),
            basic_info_header: header("Basic Info"),
            contact_header: header("Contact Details"),
            relationships_header: header("Relationships"),
            sex_options: Sex::ALL.map(|sex| {
                ElementDescriptor::new(format!("{sex} option")).label(TextMatch::exact(sex.label()))
            }),
        }
    }

    /// Radio for `sex`
    #[must_use]
    pub const fn sex_option(&self, sex: Sex) -> &ElementDescriptor {
        &self.sex_options[sex as usize]
    }

    /// Type the given name
    pub async fn enter_given_name(&self, session: &Session, text: &str) -> TriageResult<()> {
        session.act().fill(&self.given_name, text).await
    }

    /// Type the middle name
    pub async fn enter_middle_name(&self, session: &Session, text: &str) -> TriageResult<()> {
        session.act().fill(&self.middle_name, text).await
    }

    /// Type the family name
    pub async fn enter_family_name(&self, session: &Session, text: &str) -> TriageResult<()> {
        session.act().fill(&self.family_name, text).await
    }

    /// Type the birth date
    pub async fn enter_date_of_birth(&self, session: &Session, date: &str) -> TriageResult<()> {
        session.act().fill(&self.date_of_birth, date).await
    }

    /// Type the phone number
    pub async fn enter_phone(&self, session: &Session, phone: &str) -> TriageResult<()> {
        session.act().fill(&self.phone, phone).await
    }

    /// Type the email
    pub async fn enter_email(&self, session: &Session, email: &str) -> TriageResult<()> {
        session.act().fill(&self.email, email).await
    }

    /// Type the first address line
    pub async fn enter_address(&self, session: &Session, address: &str) -> TriageResult<()> {
        session.act().fill(&self.address, address).await
    }

    /// Type the country
    pub async fn enter_country(&self, session: &Session, country: &str) -> TriageResult<()> {
        session.act().fill(&self.country, country).await
    }

    /// Choose a sex option
    pub async fn select_sex(&self, session: &Session, sex: Sex) -> TriageResult<()> {
        session.act().click(self.sex_option(sex)).await
    }

    /// Choose a sex option by its label; unknown labels are rejected
    pub async fn select_sex_named(&self, session: &Session, name: &str) -> TriageResult<()> {
        let sex: Sex = name.parse()?;
        self.select_sex(session, sex).await
    }

    /// Tick or untick the unknown-patient checkbox
    pub async fn set_unknown_patient(&self, session: &Session, unknown: bool) -> TriageResult<()> {
        session.act().set_checked(&self.unknown_patient, unknown).await
    }

    /// Unknown-patient checkbox state
    pub async fn is_unknown_patient(&self, session: &Session) -> TriageResult<bool> {
        session.act().is_checked(&self.unknown_patient).await
    }

    /// Submit the form
    pub async fn submit(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.register).await
    }

    /// Leave the form
    pub async fn cancel(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.cancel).await
    }

    /// Reset the form
    pub async fn clear(&self, session: &Session) -> TriageResult<()> {
        session.act().click(&self.clear_form).await
    }

    /// Given name as typed
    pub async fn given_name_value(&self, session: &Session) -> TriageResult<String> {
        session.act().input_value(&self.given_name).await
    }

    /// Family name as typed
    pub async fn family_name_value(&self, session: &Session) -> TriageResult<String> {
        session.act().input_value(&self.family_name).await
    }

    /// Register button is visible right now
    pub async fn is_register_visible(&self, session: &Session) -> TriageResult<bool> {
        session.act().is_visible(&self.register).await
    }

    /// Fill the required fields plus any optional ones, then submit
    pub async fn register_patient(&self, session: &Session, patient: &PatientDetails) -> TriageResult<()> {
        self.enter_given_name(session, &patient.given_name).await?;
        if let Some(middle) = &patient.middle_name {
            self.enter_middle_name(session, middle).await?;
        }
        self.enter_family_name(session, &patient.family_name).await?;
        self.select_sex(session, patient.sex).await?;
        self.enter_date_of_birth(session, &patient.date_of_birth).await?;
        if let Some(phone) = &patient.phone {
            self.enter_phone(session, phone).await?;
        }
        if let Some(email) = &patient.email {
            self.enter_email(session, email).await?;
        }
        if let Some(address) = &patient.address {
            self.enter_address(session, address).await?;
        }
        if let Some(country) = &patient.country {
            self.enter_country(session, country).await?;
        }
        self.submit(session).await
    }
}

#[async_trait]
impl PageSurface for RegisterPatientPage {
    fn name(&self) -> &str {
        "patient registration"
    }

    fn path(&self) -> &str {
        "patient-registration"
    }

    fn descriptors(&self) -> Vec<&ElementDescriptor> {
        let mut all = vec![
            &self.given_name,
            &self.middle_name,
            &self.family_name,
            &self.date_of_birth,
            &self.phone,
            &self.email,
            &self.address,
            &self.country,
            &self.sex_heading,
            &self.unknown_patient,
            &self.register,
            &self.cancel,
            &self.clear_form,
            &self.new_patient_header,
            &self.basic_info_header,
            &self.contact_header,
            &self.relationships_header,
        ];
        all.extend(self.sex_options.iter());
        all
    }

    fn ready_marker(&self) -> &ElementDescriptor {
        &self.new_patient_header
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixtures::CredentialSet;
    use crate::mock::{ClinicOptions, LocationScreen, MockClinic};
    use crate::pages::LoginPage;
    use crate::session::SessionConfig;
    use std::sync::Arc;

    mod sex_tests {
        use super::*;

        #[test]
        fn test_parse_is_case_insensitive() {
            assert_eq!("female".parse::<Sex>().unwrap(), Sex::Female);
            assert_eq!("UNKNOWN".parse::<Sex>().unwrap(), Sex::Unknown);
        }

        #[test]
        fn test_invalid_option_rejected() {
            let err = "robot".parse::<Sex>().unwrap_err();
            assert!(matches!(err, TriageError::Config { .. }));
            assert!(err.to_string().contains("robot"));
        }

        #[test]
        fn test_every_option_has_a_descriptor() {
            let page = RegisterPatientPage::new();
            for sex in Sex::ALL {
                assert_eq!(page.sex_option(sex).name(), format!("{sex} option"));
            }
        }
    }

    mod form_tests {
        use super::*;

        async fn on_form() -> (Session, RegisterPatientPage) {
            let options = ClinicOptions::default().with_location_screen(LocationScreen::Never);
            let config = SessionConfig::new().with_base_url(options.base_url.clone());
            let session = Session::new(Arc::new(MockClinic::surface(options)), Arc::new(config.clone()));
            let login = LoginPage::new(&config);
            login.open(&session).await.unwrap();
            login
                .login(&session, &CredentialSet::default().valid)
                .await
                .unwrap();
            let page = RegisterPatientPage::new();
            page.navigate(&session).await.unwrap();
            (session, page)
        }

        fn toast(text: &str) -> ElementDescriptor {
            ElementDescriptor::new("toast").role("status", TextMatch::exact(text))
        }

        #[tokio::test(start_paused = true)]
        async fn test_register_patient() {
            let (session, page) = on_form().await;
            let patient = PatientDetails::new("Jane", "Doe", Sex::Female, "1990-04-12")
                .with_phone("0712345678")
                .with_email("jane@example.com");
            page.register_patient(&session, &patient).await.unwrap();
            assert_eq!(page.given_name_value(&session).await.unwrap(), "Jane");
            assert_eq!(page.family_name_value(&session).await.unwrap(), "Doe");
            assert!(session.act().is_visible(&toast("New Patient Created")).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_fields_are_reported() {
            let (session, page) = on_form().await;
            page.enter_given_name(&session, "Jane").await.unwrap();
            page.submit(&session).await.unwrap();
            assert!(session
                .act()
                .is_visible(&toast("Please fill in all required fields"))
                .await
                .unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_unknown_patient_and_invalid_sex() {
            let (session, page) = on_form().await;
            page.set_unknown_patient(&session, true).await.unwrap();
            assert!(page.is_unknown_patient(&session).await.unwrap());
            page.set_unknown_patient(&session, false).await.unwrap();
            assert!(!page.is_unknown_patient(&session).await.unwrap());
            let err = page.select_sex_named(&session, "robot").await.unwrap_err();
            assert!(matches!(err, TriageError::Config { .. }));
            page.select_sex_named(&session, "male").await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_clear_form_resets_values() {
            let (session, page) = on_form().await;
            page.enter_given_name(&session, "Jane").await.unwrap();
            page.clear(&session).await.unwrap();
            page.wait_until_loaded(&session).await.unwrap();
            assert_eq!(page.given_name_value(&session).await.unwrap(), "");
            assert!(page.is_register_visible(&session).await.unwrap());
        }
    }
}
