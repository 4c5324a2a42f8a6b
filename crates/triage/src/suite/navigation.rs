//! Moving between dashboard modules.

use crate::assertion::{expect, expect_location};
use crate::page::PageSurface;
use crate::pages::{QueuePage, QUEUE_COLUMNS};
use crate::scenario::Scenario;

const MODULE: &str = "Navigation";

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(MODULE, "TC-04: Navigate to service queues from home")
            .step("Log in", |cx| Box::pin(super::sign_in(cx)))
            .step("Follow the service queues link", |cx| {
                Box::pin(async move { cx.pages.home.go_to_service_queues(&cx.session).await })
            })
            .step("Verify the service queues page", |cx| {
                Box::pin(async move {
                    expect_location(&cx.session).to_match("service-queues").await?;
                    cx.pages.queue.wait_until_loaded(&cx.session).await
                })
            }),
        Scenario::new(MODULE, "TC-05: Service queues page loads correctly")
            .step("Open service queues", |cx| Box::pin(super::open_service_queues(cx)))
            .step("Verify the queue actions", |cx| {
                Box::pin(async move {
                    let queue = &cx.pages.queue;
                    expect(&cx.session, &queue.add_to_queue).to_be_visible().await?;
                    expect(&cx.session, &queue.status_filter).to_be_visible().await
                })
            })
            .step("Verify the table columns", |cx| {
                Box::pin(async move {
                    for column in QUEUE_COLUMNS {
                        let header = QueuePage::column_header(column);
                        expect(&cx.session, &header).to_be_visible().await?;
                    }
                    Ok(())
                })
            }),
        Scenario::new(MODULE, "TC016: Navigate to service queues from another module")
            .step("Log in", |cx| Box::pin(super::sign_in(cx)))
            .step("Open appointments", |cx| {
                Box::pin(async move {
                    cx.pages.home.go_to_appointments(&cx.session).await?;
                    expect_location(&cx.session).to_match("appointments").await
                })
            })
            .step("Follow the service queues link", |cx| {
                Box::pin(async move {
                    cx.pages.home.go_to_service_queues(&cx.session).await?;
                    cx.pages.queue.wait_until_loaded(&cx.session).await
                })
            })
            .step("Verify the service queues page", |cx| {
                Box::pin(async move {
                    let queue = &cx.pages.queue;
                    expect(&cx.session, &queue.header).to_be_visible().await?;
                    expect(&cx.session, &queue.section).to_be_visible().await?;
                    expect_location(&cx.session).to_contain("/home/service-queues").await
                })
            }),
    ]
}
