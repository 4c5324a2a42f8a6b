//! Credential fixtures.
//!
//! Values are opaque: they are passed to `fill` byte for byte, never trimmed,
//! escaped or validated. This is the only module that reads the process
//! environment.

use serde::{Deserialize, Serialize};

/// Environment variable overriding the valid username
pub const USERNAME_ENV: &str = "OPENMRS03_USERNAME";

/// Environment variable overriding the valid password
pub const PASSWORD_ENV: &str = "OPENMRS03_PASSWORD";

/// Username of the demo account
pub const DEFAULT_USERNAME: &str = "admin";

/// Password of the demo account
pub const DEFAULT_PASSWORD: &str = "Admin123";

/// Length of the oversized username variant
pub const LONG_USERNAME_LEN: usize = 500;

/// A username/password pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username, verbatim
    pub username: String,
    /// Password, verbatim
    pub password: String,
}

impl Credentials {
    /// Pair from any strings
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Named credential variants used by the authentication scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSet {
    /// Working account
    pub valid: Credentials,
    /// Unknown account
    pub invalid: Credentials,
    /// Both fields empty
    pub empty: Credentials,
    /// Empty username, valid password
    pub empty_username: Credentials,
    /// Valid username, empty password
    pub empty_password: Credentials,
    /// Username with symbols
    pub special_characters: Credentials,
    /// SQL injection in both fields
    pub sql_injection: Credentials,
    /// Script tag in the username
    pub script_injection: Credentials,
    /// Oversized username
    pub long_username: Credentials,
    /// Valid username in upper case
    pub uppercase_username: Credentials,
}

impl Default for CredentialSet {
    fn default() -> Self {
        Self::with_valid(Credentials::new(DEFAULT_USERNAME, DEFAULT_PASSWORD))
    }
}

impl CredentialSet {
    /// Variants built around a valid account
    #[must_use]
    pub fn with_valid(valid: Credentials) -> Self {
        let password = valid.password.clone();
        Self {
            invalid: Credentials::new("invaliduser", "wrongpassword"),
            empty: Credentials::new("", ""),
            empty_username: Credentials::new("", password.clone()),
            empty_password: Credentials::new(valid.username.clone(), ""),
            special_characters: Credentials::new("admin@#$%", password.clone()),
            sql_injection: Credentials::new("admin' OR '1'='1", "' OR '1'='1"),
            script_injection: Credentials::new("<script>alert('XSS')</script>", password.clone()),
            long_username: Credentials::new("a".repeat(LONG_USERNAME_LEN), password.clone()),
            uppercase_username: Credentials::new(valid.username.to_uppercase(), password),
            valid,
        }
    }

    /// Variants with the valid account taken from the environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Variants with the valid account taken from `lookup`, falling back to
    /// the demo account for missing or empty values
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self::with_valid(Credentials::new(
            value(USERNAME_ENV, DEFAULT_USERNAME),
            value(PASSWORD_ENV, DEFAULT_PASSWORD),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod variant_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let set = CredentialSet::default();
            assert_eq!(set.valid, Credentials::new("admin", "Admin123"));
            assert_eq!(set.uppercase_username.username, "ADMIN");
            assert_eq!(set.empty_password.password, "");
            assert_eq!(set.empty_username.password, "Admin123");
        }

        #[test]
        fn test_long_username_length() {
            let set = CredentialSet::default();
            assert_eq!(set.long_username.username.chars().count(), 500);
        }

        #[test]
        fn test_values_are_not_escaped() {
            let set = CredentialSet::default();
            assert_eq!(set.script_injection.username, "<script>alert('XSS')</script>");
            assert_eq!(set.sql_injection.password, "' OR '1'='1");
        }

        #[test]
        fn test_debug_redacts_password() {
            let rendered = format!("{:?}", Credentials::new("admin", "Admin123"));
            assert!(rendered.contains("admin"));
            assert!(!rendered.contains("Admin123"));
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_lookup_overrides_valid_account() {
            let set = CredentialSet::from_lookup(|key| match key {
                USERNAME_ENV => Some("nurse".into()),
                PASSWORD_ENV => Some("S3cret".into()),
                _ => None,
            });
            assert_eq!(set.valid, Credentials::new("nurse", "S3cret"));
            assert_eq!(set.uppercase_username.username, "NURSE");
            assert_eq!(set.special_characters.password, "S3cret");
        }

        #[test]
        fn test_empty_lookup_falls_back() {
            let set = CredentialSet::from_lookup(|_| Some(String::new()));
            assert_eq!(set.valid.username, DEFAULT_USERNAME);
        }
    }
}
