//! Service queue listing and metrics.

use crate::assertion::expect;
use crate::pages::QUEUE_COLUMNS;
use crate::result::TriageError;
use crate::scenario::Scenario;

const MODULE: &str = "Service Queues";

pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(MODULE, "TC-06: View all available service queues")
            .step("Open service queues", |cx| Box::pin(super::open_service_queues(cx)))
            .step("Verify every row has one cell per column", |cx| {
                Box::pin(async move {
                    let rows = cx.pages.queue.queue_details(&cx.session).await?;
                    for (index, cells) in rows.iter().enumerate() {
                        if cells.len() != QUEUE_COLUMNS.len() {
                            return Err(TriageError::assertion(format!(
                                "row {index} has {} cells, expected {}",
                                cells.len(),
                                QUEUE_COLUMNS.len()
                            )));
                        }
                    }
                    Ok(())
                })
            }),
        Scenario::new(MODULE, "TC015: Service queues page initial load")
            .step("Open service queues", |cx| Box::pin(super::open_service_queues(cx)))
            .step("Verify header and breadcrumb", |cx| {
                Box::pin(async move {
                    let queue = &cx.pages.queue;
                    expect(&cx.session, &queue.header).to_be_visible().await?;
                    expect(&cx.session, &queue.breadcrumb).to_be_visible().await
                })
            })
            .step("Verify queue table content", |cx| {
                Box::pin(async move {
                    let queue = &cx.pages.queue;
                    if !queue.rows_or_empty_visible(&cx.session).await? {
                        return Err(TriageError::assertion(
                            "neither queue rows nor the empty message are visible",
                        ));
                    }
                    expect(&cx.session, &queue.section).to_be_visible().await
                })
            })
            .step("Verify action buttons", |cx| {
                Box::pin(async move {
                    let queue = &cx.pages.queue;
                    for descriptor in [
                        &queue.add_to_queue,
                        &queue.clear_queue,
                        &queue.status_filter,
                        &queue.search,
                    ] {
                        expect(&cx.session, descriptor).to_be_visible().await?;
                    }
                    Ok(())
                })
            }),
        Scenario::new(MODULE, "TC017: Checked in patients metric")
            .step("Open service queues", |cx| Box::pin(super::open_service_queues(cx)))
            .step("Locate the checked in card", |cx| {
                Box::pin(async move {
                    expect(&cx.session, &cx.pages.queue.checked_in.card).to_be_visible().await
                })
            })
            .step("Verify the Patients label", |cx| {
                Box::pin(async move {
                    let label = &cx.pages.queue.checked_in.label;
                    expect(&cx.session, label).to_be_visible().await?;
                    expect(&cx.session, label).to_have_text("Patients").await
                })
            })
            .step("Verify the count is a number", |cx| {
                Box::pin(async move {
                    let count = cx.pages.queue.checked_in_count(&cx.session).await?;
                    tracing::info!(count, "checked in patients");
                    Ok(())
                })
            }),
    ]
}
