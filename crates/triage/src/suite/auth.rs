//! Login, logout and session handling.

use crate::assertion::{expect, expect_location};
use crate::fixtures::Credentials;
use crate::result::{TriageError, TriageResult};
use crate::scenario::{Scenario, ScenarioContext};

const MODULE: &str = "Authentication";

/// Log in with `credentials` and expect to stay on the login screen
async fn rejected(cx: &ScenarioContext, credentials: &Credentials) -> TriageResult<()> {
    cx.pages.login.login(&cx.session, credentials).await?;
    expect_location(&cx.session).to_contain("login").await
}

/// Open the login screen and try the invalid account once
async fn failed_attempt(cx: &ScenarioContext) -> TriageResult<()> {
    let login = &cx.pages.login;
    let invalid = &cx.credentials.invalid;
    login.open(&cx.session).await?;
    login.enter_username(&cx.session, &invalid.username).await?;
    login.continue_to_password(&cx.session).await?;
    login.enter_password(&cx.session, &invalid.password).await?;
    login.submit(&cx.session).await?;
    expect(&cx.session, &login.error_subtitle).to_be_visible().await?;
    expect_location(&cx.session).to_contain("login").await
}

fn open_login(scenario: Scenario) -> Scenario {
    scenario.step("Open the login page", |cx| {
        Box::pin(async move { cx.pages.login.open(&cx.session).await })
    })
}

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        open_login(Scenario::new(MODULE, "TC001: Successful login with valid credentials"))
            .step("Log in with the valid account", |cx| {
                Box::pin(async move {
                    cx.pages.login.login(&cx.session, &cx.credentials.valid).await?;
                    Ok(())
                })
            })
            .step("Verify the dashboard is shown", |cx| {
                Box::pin(async move {
                    let location = expect_location(&cx.session);
                    location.not_to_contain("login").await?;
                    location.to_contain("/spa/").await
                })
            }),
        open_login(Scenario::new(MODULE, "TC002: Login failure with invalid credentials"))
            .step("Log in with the invalid account", |cx| {
                Box::pin(async move { rejected(cx, &cx.credentials.invalid).await })
            })
            .step("Verify the error message", |cx| {
                Box::pin(async move {
                    let login = &cx.pages.login;
                    expect(&cx.session, &login.error_subtitle).to_be_visible().await?;
                    let message = login.error_text(&cx.session).await?;
                    if message.trim().is_empty() {
                        return Err(TriageError::assertion("error message is empty"));
                    }
                    expect_location(&cx.session).to_contain("login").await
                })
            }),
        open_login(Scenario::new(MODULE, "TC003: Login with empty username"))
            .step("Continue without a username", |cx| {
                Box::pin(async move {
                    let login = &cx.pages.login;
                    login.enter_username(&cx.session, &cx.credentials.empty_username.username).await?;
                    login.continue_to_password(&cx.session).await
                })
            })
            .step("Verify the username step is still shown", |cx| {
                Box::pin(async move {
                    expect(&cx.session, &cx.pages.login.continue_button).to_be_visible().await?;
                    expect_location(&cx.session).to_contain("login").await
                })
            }),
        open_login(Scenario::new(MODULE, "TC004: Login with empty password"))
            .step("Submit without a password", |cx| {
                Box::pin(async move {
                    let login = &cx.pages.login;
                    let credentials = &cx.credentials.empty_password;
                    login.enter_username(&cx.session, &credentials.username).await?;
                    login.continue_to_password(&cx.session).await?;
                    login.enter_password(&cx.session, &credentials.password).await?;
                    login.submit(&cx.session).await
                })
            })
            .step("Verify the password step is still shown", |cx| {
                Box::pin(async move {
                    expect(&cx.session, &cx.pages.login.login_button).to_be_visible().await?;
                    expect_location(&cx.session).to_contain("login").await
                })
            }),
        open_login(Scenario::new(MODULE, "TC005: Login with empty username and password"))
            .step("Continue with nothing entered", |cx| {
                Box::pin(async move {
                    let login = &cx.pages.login;
                    login.enter_username(&cx.session, &cx.credentials.empty.username).await?;
                    login.continue_to_password(&cx.session).await
                })
            })
            .step("Verify the login page is still shown", |cx| {
                Box::pin(async move {
                    expect(&cx.session, &cx.pages.login.continue_button).to_be_visible().await?;
                    expect_location(&cx.session).to_contain("login").await
                })
            }),
        open_login(Scenario::new(MODULE, "TC006: Login with special characters in username"))
            .step("Log in with special characters", |cx| {
                Box::pin(async move { rejected(cx, &cx.credentials.special_characters).await })
            })
            .step("Verify the error message", |cx| {
                Box::pin(async move {
                    expect(&cx.session, &cx.pages.login.error_subtitle).to_be_visible().await
                })
            }),
        open_login(Scenario::new(MODULE, "TC007: Login with SQL injection attempt"))
            .step("Log in with an injection payload", |cx| {
                Box::pin(async move { rejected(cx, &cx.credentials.sql_injection).await })
            }),
        open_login(Scenario::new(MODULE, "TC008: Login with script injection attempt"))
            .step("Log in with a script payload", |cx| {
                Box::pin(async move { rejected(cx, &cx.credentials.script_injection).await })
            }),
        open_login(Scenario::new(MODULE, "TC009: Login with very long username"))
            .step("Enter a 500 character username", |cx| {
                Box::pin(async move {
                    let long = &cx.credentials.long_username;
                    cx.pages.login.enter_username(&cx.session, &long.username).await
                })
            })
            .step("Verify the username is kept whole", |cx| {
                Box::pin(async move {
                    let login = &cx.pages.login;
                    let value = cx.session.act().input_value(&login.username).await?;
                    let expected = cx.credentials.long_username.username.chars().count();
                    if value.chars().count() != expected {
                        return Err(TriageError::assertion(format!(
                            "username field holds {} characters, expected {expected}",
                            value.chars().count()
                        )));
                    }
                    Ok(())
                })
            })
            .step("Submit and stay on the login page", |cx| {
                Box::pin(async move {
                    let login = &cx.pages.login;
                    let long = &cx.credentials.long_username;
                    login.continue_to_password(&cx.session).await?;
                    login.enter_password(&cx.session, &long.password).await?;
                    login.submit(&cx.session).await?;
                    login.handle_location_selection(&cx.session).await?;
                    expect_location(&cx.session).to_contain("login").await
                })
            }),
        open_login(Scenario::new(MODULE, "TC010: Username is case-insensitive"))
            .step("Log in with the upper-cased username", |cx| {
                Box::pin(async move {
                    cx.pages
                        .login
                        .login(&cx.session, &cx.credentials.uppercase_username)
                        .await?;
                    Ok(())
                })
            })
            .step("Verify the dashboard is shown", |cx| {
                Box::pin(async move { expect_location(&cx.session).not_to_contain("login").await })
            }),
        Scenario::new(MODULE, "TC011: Successful logout")
            .step("Log in", |cx| Box::pin(super::sign_in(cx)))
            .step("Log out from the user menu", |cx| {
                Box::pin(async move { cx.pages.home.logout(&cx.session).await })
            })
            .step("Verify the login page is shown", |cx| {
                Box::pin(async move {
                    expect(&cx.session, &cx.pages.login.username).to_be_visible().await?;
                    expect_location(&cx.session).to_contain("login").await
                })
            }),
        Scenario::new(MODULE, "TC012: Session survives a page refresh")
            .step("Log in", |cx| Box::pin(super::sign_in(cx)))
            .step("Reload the page", |cx| Box::pin(async move { cx.session.reload().await }))
            .step("Verify the session is kept", |cx| {
                Box::pin(async move { expect_location(&cx.session).not_to_contain("login").await })
            }),
        Scenario::new(MODULE, "TC014: Multiple failed login attempts")
            .step("Login attempt 1 with invalid credentials", |cx| Box::pin(failed_attempt(cx)))
            .step("Login attempt 2 with invalid credentials", |cx| Box::pin(failed_attempt(cx)))
            .step("Login attempt 3 with invalid credentials", |cx| Box::pin(failed_attempt(cx)))
            .step("Verify the account is not locked out", |cx| {
                Box::pin(async move {
                    expect_location(&cx.session).to_contain("login").await?;
                    expect(&cx.session, &cx.pages.login.username).to_be_visible().await
                })
            }),
        Scenario::new(MODULE, "TC015: Back button after logout")
            .step("Log in", |cx| Box::pin(super::sign_in(cx)))
            .step("Log out", |cx| Box::pin(async move { cx.pages.home.logout(&cx.session).await }))
            .step("Go back in history", |cx| Box::pin(async move { cx.session.go_back().await }))
            .step("Verify the login page is still shown", |cx| {
                Box::pin(async move {
                    expect_location(&cx.session).to_contain("login").await?;
                    expect(&cx.session, &cx.pages.login.username).to_be_visible().await
                })
            }),
    ]
}
