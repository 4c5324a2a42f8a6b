//! In-memory model of the clinic web application.
//!
//! Covers the screens the scenario catalog drives: two-step login with an
//! optional location picker, the home dashboard and user menu, the service
//! queues listing with its metric tiles, appointments, and patient
//! registration. Routing guards mirror the live system: unauthenticated
//! visits land on the login screen and a pending location choice pins the
//! session to the picker.

use std::time::Duration;

use super::dom::{ElementId, MockDom, MockElement};
use super::{MockApp, MockPage, MockSurface};
use crate::pages::QUEUE_COLUMNS;

/// Whether and when the location picker appears after credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationScreen {
    /// Straight to the dashboard
    Never,
    /// Picker rendered with the page
    Shown,
    /// Picker content rendered after a delay
    Delayed(Duration),
}

/// One row of the service queue table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Patient name
    pub name: String,
    /// Referring location
    pub coming_from: String,
    /// Priority label
    pub priority: String,
    /// Status label
    pub status: String,
    /// Queue name
    pub queue: String,
    /// Wait time text
    pub wait_time: String,
}

impl QueueEntry {
    /// Entry with typical defaults
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coming_from: "Outpatient Clinic".into(),
            priority: "Not urgent".into(),
            status: "Waiting".into(),
            queue: "Triage".into(),
            wait_time: "12".into(),
        }
    }

    fn cells(&self) -> [&str; 7] {
        [
            &self.name,
            &self.coming_from,
            &self.priority,
            &self.status,
            &self.queue,
            &self.wait_time,
            "",
        ]
    }
}

/// Clinic model configuration
#[derive(Debug, Clone)]
pub struct ClinicOptions {
    /// Application root, ending in `/spa/`
    pub base_url: String,
    /// Registered accounts; usernames compare case-insensitively
    pub users: Vec<(String, String)>,
    /// Location picker behavior
    pub location_screen: LocationScreen,
    /// Locations offered by the picker
    pub locations: Vec<String>,
    /// Queue rows
    pub queue: Vec<QueueEntry>,
    /// Delay before a freshly visited screen renders
    pub render_delay: Duration,
    /// Delay before a visited document reports `load`
    pub load_time: Duration,
    /// Delay before metric tiles replace their placeholder
    pub metrics_delay: Duration,
}

impl Default for ClinicOptions {
    fn default() -> Self {
        Self {
            base_url: "http://clinic.test/openmrs/spa/".into(),
            users: vec![("admin".into(), "Admin123".into())],
            location_screen: LocationScreen::Shown,
            locations: vec![
                "Inpatient Ward".into(),
                "Outpatient Clinic".into(),
                "Pharmacy".into(),
            ],
            queue: vec![QueueEntry::new("John Doe"), QueueEntry::new("Mary Jane")],
            render_delay: Duration::from_millis(150),
            load_time: Duration::from_millis(100),
            metrics_delay: Duration::from_millis(400),
        }
    }
}

impl ClinicOptions {
    /// Default clinic
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set location picker behavior
    #[must_use]
    pub const fn with_location_screen(mut self, screen: LocationScreen) -> Self {
        self.location_screen = screen;
        self
    }

    /// Replace queue rows
    #[must_use]
    pub fn with_queue(mut self, queue: Vec<QueueEntry>) -> Self {
        self.queue = queue;
        self
    }

    /// Set render delay
    #[must_use]
    pub const fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Add an account
    #[must_use]
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.push((username.into(), password.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Login,
    Location,
    Home,
    ServiceQueues,
    Appointments,
    Registration,
    Other,
}

impl Route {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Location => "login/location",
            Self::Home | Self::Other => "home",
            Self::ServiceQueues => "home/service-queues",
            Self::Appointments => "home/appointments",
            Self::Registration => "patient-registration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginStep {
    Username,
    Password,
}

/// Clinic application behind a [`MockSurface`]
#[derive(Debug)]
pub struct MockClinic {
    options: ClinicOptions,
    route: Route,
    logged_in: bool,
    location_pending: bool,
    step: LoginStep,
    username: String,
    login_error: bool,
    selected_location: Option<String>,
    menu_open: bool,
    language_modal: bool,
    registration_message: Option<&'static str>,
}

impl MockClinic {
    /// Fresh, logged-out clinic
    #[must_use]
    pub fn new(options: ClinicOptions) -> Self {
        Self {
            options,
            route: Route::Other,
            logged_in: false,
            location_pending: false,
            step: LoginStep::Username,
            username: String::new(),
            login_error: false,
            selected_location: None,
            menu_open: false,
            language_modal: false,
            registration_message: None,
        }
    }

    /// Surface showing a blank page, driven by a fresh clinic
    #[must_use]
    pub fn surface(options: ClinicOptions) -> MockSurface {
        MockSurface::with_app("about:blank", Self::new(options))
    }

    fn route_of(&self, url: &str) -> Route {
        let path = url
            .strip_prefix(&self.options.base_url)
            .or_else(|| url.split_once("/spa/").map(|(_, rest)| rest))
            .unwrap_or("")
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .trim_matches('/');
        match path {
            "login" => Route::Login,
            "login/location" => Route::Location,
            "home" => Route::Home,
            "home/service-queues" => Route::ServiceQueues,
            "home/appointments" => Route::Appointments,
            "patient-registration" => Route::Registration,
            _ => Route::Other,
        }
    }

    fn guard(&self, route: Route) -> Route {
        if !self.logged_in {
            Route::Login
        } else if self.location_pending {
            Route::Location
        } else {
            match route {
                Route::Login | Route::Location | Route::Other => Route::Home,
                other => other,
            }
        }
    }

    fn show(&mut self, page: &mut MockPage, requested: Route, push: bool) {
        let route = self.guard(requested);
        let url = format!("{}{}", self.options.base_url, route.suffix());
        if push {
            page.visit(url, self.options.load_time);
        } else {
            page.replace(url, self.options.load_time);
        }
        self.route = route;
        self.menu_open = false;
        self.language_modal = false;
        self.registration_message = None;
        if route == Route::Login {
            self.step = LoginStep::Username;
            self.username.clear();
            self.login_error = false;
        }
        if route == Route::Location {
            self.selected_location = None;
        }
        self.render(&mut page.dom, self.options.render_delay);
    }

    fn rerender(&self, page: &mut MockPage) {
        page.dom.clear();
        self.render(&mut page.dom, Duration::ZERO);
    }

    fn authenticate(&self, username: &str, password: &str) -> bool {
        self.options
            .users
            .iter()
            .any(|(u, p)| u.eq_ignore_ascii_case(username) && p == password)
    }

    fn value_of(dom: &MockDom, key: &str) -> String {
        dom.find_key(key)
            .and_then(|id| dom.get(id))
            .map(|el| el.value.clone())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // rendering
    // -------------------------------------------------------------------------

    fn render(&self, dom: &mut MockDom, delay: Duration) {
        let mut p = Painter { dom, delay };
        match self.route {
            Route::Login => self.render_login(&mut p),
            Route::Location => self.render_location(&mut p),
            Route::Home | Route::Other => {
                self.render_chrome(&mut p);
                p.add(MockElement::new("h1").text("Home"));
            }
            Route::ServiceQueues => {
                self.render_chrome(&mut p);
                self.render_queues(&mut p);
            }
            Route::Appointments => {
                self.render_chrome(&mut p);
                p.add(MockElement::new("h1").text("Appointments"));
                p.add(MockElement::new("p").css_match("p").text("No appointments to display"));
            }
            Route::Registration => {
                self.render_chrome(&mut p);
                self.render_registration(&mut p);
            }
        }
    }

    fn render_login(&self, p: &mut Painter<'_>) {
        let form = p.add(MockElement::new("form").key("login-form"));
        p.child(form, MockElement::new("img").name("OpenMRS Logo"));
        p.child(
            form,
            MockElement::new("input")
                .key("username")
                .label("Username")
                .attr("id", "username")
                .attr("name", "username")
                .value(self.username.clone()),
        );
        match self.step {
            LoginStep::Username => {
                p.child(form, MockElement::new("button").key("continue").text("Continue"));
            }
            LoginStep::Password => {
                // password inputs carry no implicit textbox role
                p.child(
                    form,
                    MockElement::new("input")
                        .key("password")
                        .role("none")
                        .label("Password")
                        .attr("id", "password")
                        .attr("name", "password")
                        .attr("type", "password"),
                );
                p.child(form, MockElement::new("button").key("login-button").text("Log In"));
            }
        }
        if self.login_error {
            let note = p.add(
                MockElement::new("div")
                    .key("login-error")
                    .css_match(".cds--inline-notification"),
            );
            p.child(
                note,
                MockElement::new("div")
                    .css_match(".cds--inline-notification__title")
                    .text("Error logging in"),
            );
            p.child(
                note,
                MockElement::new("div")
                    .css_match(".cds--inline-notification__subtitle")
                    .text("Invalid username or password"),
            );
        }
    }

    fn render_location(&self, p: &mut Painter<'_>) {
        let extra = match self.options.location_screen {
            LocationScreen::Delayed(d) => d,
            LocationScreen::Shown | LocationScreen::Never => Duration::ZERO,
        };
        let picker = p.add(
            MockElement::new("div")
                .key("location-picker")
                .appear_after(p.delay.max(extra)),
        );
        p.child(picker, MockElement::new("h2").text("Welcome Super User"));
        for location in &self.options.locations {
            let selected = self.selected_location.as_deref() == Some(location.as_str());
            let mut option = MockElement::radio()
                .key(format!("location:{location}"))
                .attr("name", "location")
                .label(location.clone());
            option.checked = selected;
            p.child(picker, option);
            p.child(
                picker,
                MockElement::new("label")
                    .key(format!("location:{location}"))
                    .text(location.clone()),
            );
        }
        p.child(picker, MockElement::new("button").key("location-confirm").text("Confirm"));
    }

    fn render_chrome(&self, p: &mut Painter<'_>) {
        let header = p.add(MockElement::new("header").key("header"));
        p.child(header, MockElement::new("img").key("logo").name("OpenMRS Logo"));
        p.child(
            header,
            MockElement::new("button").key("add-patient").name("Add patient"),
        );
        p.child(
            header,
            MockElement::new("button")
                .key("my-account")
                .attr("aria-label", "My Account"),
        );
        let nav = p.add(MockElement::new("nav").key("side-nav"));
        p.child(
            nav,
            MockElement::new("a")
                .key("nav-service-queues")
                .text("Service queues"),
        );
        p.child(nav, MockElement::new("a").key("nav-appointments").text("Appointments"));

        if self.menu_open {
            let menu = p.add(
                MockElement::new("ul")
                    .key("user-menu")
                    .role("menu")
                    .name("User menu options"),
            );
            p.child(menu, MockElement::new("a").key("menu-user").text("User"));
            let language = p.child(
                menu,
                MockElement::new("div").key("menu-language").label("Change language"),
            );
            p.child(language, MockElement::new("span").text("English"));
            p.child(language, MockElement::new("button").key("change-language").text("Change"));
            p.child(
                menu,
                MockElement::new("a").key("menu-password").text("Change password"),
            );
            p.child(menu, MockElement::new("button").key("logout").text("Logout"));
        }
        if self.language_modal {
            let modal = p.add(MockElement::new("div").key("language-modal").role("dialog"));
            p.child(modal, MockElement::new("button").key("language-english").text("English"));
            p.child(modal, MockElement::new("button").key("language-french").text("Français"));
        }
    }

    fn render_queues(&self, p: &mut Painter<'_>) {
        let main = p.add(MockElement::new("main").key("queues"));
        p.child(main, MockElement::new("p").css_match("p").text("Clinic"));
        p.child(main, MockElement::new("p").css_match("p").text("Service queues"));

        let metrics_delay = self.options.metrics_delay;
        let checked_in = self.options.queue.len().to_string();
        let tile = p.child(main, MockElement::new("div").css_match(".cds--tile"));
        p.child(tile, MockElement::new("h3").text("Checked in patients"));
        p.child(tile, MockElement::new("span").css_match("span").text("Patients"));
        p.child(
            tile,
            MockElement::new("p")
                .css_match("p")
                .text("--")
                .text_after(metrics_delay, checked_in),
        );

        let tile = p.child(main, MockElement::new("div").css_match(".cds--tile"));
        p.child(tile, MockElement::new("label").css_match("label").text("Waiting for:"));
        p.child(
            tile,
            MockElement::new("select").name("Waiting for").value("Triage"),
        );
        p.child(
            tile,
            MockElement::new("p")
                .css_match("p")
                .text("--")
                .text_after(metrics_delay, self.options.queue.len().to_string()),
        );

        let tile = p.child(main, MockElement::new("div").css_match(".cds--tile"));
        p.child(tile, MockElement::new("h3").text("Average wait time today"));
        p.child(tile, MockElement::new("span").css_match("span").text("Minutes"));
        p.child(
            tile,
            MockElement::new("p")
                .css_match("p")
                .text("--")
                .text_after(metrics_delay, "12"),
        );

        p.child(main, MockElement::new("h4").text("Patients currently in queue"));
        p.child(
            main,
            MockElement::new("button")
                .key("add-to-queue")
                .attr("aria-label", "Search Patient Button")
                .css_match("button[aria-label=\"Search Patient Button\"]")
                .text("Add patient to queue"),
        );
        p.child(main, MockElement::new("label").text("Show patients with status"));
        p.child(main, MockElement::new("select").key("status-filter").label("Show patients with status"));
        p.child(
            main,
            MockElement::new("input")
                .key("queue-search")
                .attr("placeholder", "Search this list")
                .role("searchbox"),
        );
        p.child(main, MockElement::new("button").key("clear-queue").text("Clear queue"));

        let table = p.child(
            main,
            MockElement::new("table").css_match("table.cds--data-table"),
        );
        let head = p.child(table, MockElement::new("thead"));
        let head_row = p.child(head, MockElement::new("tr"));
        for column in QUEUE_COLUMNS {
            p.child(head_row, MockElement::new("th").text(column));
        }
        let body = p.child(table, MockElement::new("tbody"));
        for entry in &self.options.queue {
            let row = p.child(
                body,
                MockElement::new("tr").css_match("table.cds--data-table > tbody > tr"),
            );
            for cell in entry.cells() {
                p.child(row, MockElement::new("td").css_match("td").text(cell));
            }
        }
        if self.options.queue.is_empty() {
            p.child(
                main,
                MockElement::new("p")
                    .css_match("p")
                    .text("No patients to display"),
            );
        }
    }

    fn render_registration(&self, p: &mut Painter<'_>) {
        let form = p.add(MockElement::new("form").key("registration"));
        for header in ["Create new patient", "Basic Info", "Contact Details", "Relationships"] {
            p.child(form, MockElement::new("h3").text(header));
        }
        p.child(
            form,
            MockElement::checkbox()
                .key("unknown")
                .attr("name", "unknown")
                .label("Patient's Name is Unknown?"),
        );
        for (name, label) in [
            ("givenName", "First Name"),
            ("middleName", "Middle Name"),
            ("familyName", "Family Name"),
            ("telephoneNumber", "Phone number"),
            ("email", "Email"),
            ("address1", "Address line 1"),
        ] {
            p.child(
                form,
                MockElement::new("input")
                    .key(name)
                    .attr("name", name)
                    .label(label),
            );
        }
        p.child(
            form,
            MockElement::new("input")
                .key("birthdate")
                .attr("name", "birthdate")
                .attr("type", "date")
                .label("Date of Birth"),
        );
        p.child(form, MockElement::new("input").key("country").label("Country"));
        p.child(form, MockElement::new("h4").text("Sex"));
        for sex in ["Male", "Female", "Other", "Unknown"] {
            p.child(
                form,
                MockElement::radio()
                    .key(format!("sex:{sex}"))
                    .attr("name", "gender")
                    .label(sex),
            );
        }
        p.child(form, MockElement::new("button").key("register").text("Register Patient"));
        p.child(form, MockElement::new("button").key("cancel").text("Cancel"));
        p.child(form, MockElement::new("button").key("clear-form").text("Clear Form"));
        if let Some(message) = self.registration_message {
            p.add(MockElement::new("div").key("registration-toast").role("status").text(message));
        }
    }

    // -------------------------------------------------------------------------
    // events
    // -------------------------------------------------------------------------

    fn submit_password(&mut self, page: &mut MockPage) {
        let password = Self::value_of(&page.dom, "password");
        if password.is_empty() {
            return;
        }
        if self.authenticate(&self.username, &password) {
            self.logged_in = true;
            self.location_pending = self.options.location_screen != LocationScreen::Never;
            self.show(page, Route::Home, true);
        } else {
            self.login_error = true;
            self.rerender(page);
            if let Some(id) = page.dom.find_key("password") {
                if let Some(el) = page.dom.get_mut(id) {
                    el.value = password;
                }
            }
        }
    }

    fn register(&mut self, page: &mut MockPage) {
        let dom = &page.dom;
        let required = ["givenName", "familyName", "birthdate"]
            .iter()
            .all(|key| !Self::value_of(dom, key).is_empty());
        let sex_chosen = ["Male", "Female", "Other", "Unknown"].iter().any(|sex| {
            dom.find_key(&format!("sex:{sex}"))
                .and_then(|id| dom.get(id))
                .is_some_and(|el| el.checked)
        });
        self.registration_message = Some(if required && sex_chosen {
            "New Patient Created"
        } else {
            "Please fill in all required fields"
        });
        if let Some(toast) = page.dom.find_key("registration-toast") {
            page.dom.remove(toast);
        }
        if let Some(message) = self.registration_message {
            page.dom.add(
                MockElement::new("div")
                    .key("registration-toast")
                    .role("status")
                    .text(message),
            );
        }
    }
}

impl MockApp for MockClinic {
    fn navigate(&mut self, page: &mut MockPage, url: &str) {
        let route = self.route_of(url);
        self.show(page, route, true);
    }

    fn back(&mut self, page: &mut MockPage) {
        if let Some(previous) = page.history.pop() {
            let route = self.route_of(&previous);
            self.show(page, route, false);
        }
    }

    fn reload(&mut self, page: &mut MockPage) {
        let route = self.route_of(&page.url);
        self.show(page, route, false);
    }

    fn click(&mut self, page: &mut MockPage, id: ElementId) {
        let Some(element) = page.dom.get(id).cloned() else {
            return;
        };
        if element.checkable {
            let checked = element.attrs.get("type").map(String::as_str) == Some("radio") || !element.checked;
            page.dom.set_checked(id, checked);
        }
        let Some(key) = element.key else {
            return;
        };
        match key.as_str() {
            "continue" => {
                let username = Self::value_of(&page.dom, "username");
                if !username.is_empty() {
                    self.username = username;
                    self.step = LoginStep::Password;
                    self.login_error = false;
                    self.rerender(page);
                }
            }
            "login-button" => self.submit_password(page),
            "location-confirm" => {
                if self.selected_location.is_some() {
                    self.location_pending = false;
                    self.show(page, Route::Home, true);
                }
            }
            "my-account" => {
                self.menu_open = !self.menu_open;
                self.rerender(page);
            }
            "logout" => {
                self.logged_in = false;
                self.location_pending = false;
                self.show(page, Route::Login, true);
            }
            "change-language" => {
                self.menu_open = false;
                self.language_modal = true;
                self.rerender(page);
            }
            "language-english" | "language-french" => {
                self.language_modal = false;
                self.rerender(page);
            }
            "add-patient" => self.show(page, Route::Registration, true),
            "nav-service-queues" => self.show(page, Route::ServiceQueues, true),
            "nav-appointments" => self.show(page, Route::Appointments, true),
            "cancel" => self.show(page, Route::Home, true),
            "clear-form" => self.show(page, Route::Registration, false),
            "register" => self.register(page),
            other => {
                if let Some(location) = other.strip_prefix("location:") {
                    self.selected_location = Some(location.to_string());
                    // the radio is rendered before its text label
                    if let Some(radio) = page.dom.find_key(other) {
                        page.dom.set_checked(radio, true);
                    }
                }
            }
        }
    }
}

struct Painter<'a> {
    dom: &'a mut MockDom,
    delay: Duration,
}

impl Painter<'_> {
    fn add(&mut self, element: MockElement) -> ElementId {
        let element = if self.delay.is_zero() || element.appear_after.is_some() {
            element
        } else {
            element.appear_after(self.delay)
        };
        self.dom.add(element)
    }

    fn child(&mut self, parent: ElementId, element: MockElement) -> ElementId {
        self.dom.add_child(parent, element)
    }
}
