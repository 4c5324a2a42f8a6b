//! Patient registration form.

use crate::assertion::{expect, expect_location};
use crate::scenario::Scenario;

const MODULE: &str = "Registration";

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![Scenario::new(MODULE, "TC-08: Register patient page loads correctly")
        .step("Log in", |cx| Box::pin(super::sign_in(cx)))
        .step("Open registration from the header", |cx| {
            Box::pin(async move {
                cx.pages.home.open_patient_registration(&cx.session).await?;
                expect_location(&cx.session).to_match("patient-registration").await
            })
        })
        .step("Verify the form sections", |cx| {
            Box::pin(async move {
                let form = &cx.pages.register;
                for header in [
                    &form.new_patient_header,
                    &form.basic_info_header,
                    &form.contact_header,
                    &form.relationships_header,
                ] {
                    expect(&cx.session, header).to_be_visible().await?;
                }
                Ok(())
            })
        })
        .step("Verify the key fields", |cx| {
            Box::pin(async move {
                let form = &cx.pages.register;
                for field in [
                    &form.given_name,
                    &form.family_name,
                    &form.date_of_birth,
                    &form.sex_heading,
                    &form.register,
                ] {
                    expect(&cx.session, field).to_be_visible().await?;
                }
                Ok(())
            })
        })]
}
