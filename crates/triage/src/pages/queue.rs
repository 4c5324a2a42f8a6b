//! Service queues listing with its metric tiles.

use async_trait::async_trait;

use crate::actions::ElementCondition;
use crate::locator::{ElementDescriptor, TextMatch};
use crate::page::PageSurface;
use crate::result::{TriageError, TriageResult};
use crate::session::Session;
use crate::wait::LoadState;

/// Column headers of the queue table, in order
pub const QUEUE_COLUMNS: [&str; 7] = [
    "Name",
    "Coming from",
    "Priority",
    "Status",
    "Queue",
    "Wait time",
    "Actions",
];

const ROWS: &str = "table.cds--data-table > tbody > tr";

/// One metric card: container, caption and value
#[derive(Debug, Clone)]
pub struct MetricCard {
    /// Tile container
    pub card: ElementDescriptor,
    /// Caption inside the tile
    pub label: ElementDescriptor,
    /// Value paragraph inside the tile
    pub value: ElementDescriptor,
}

impl MetricCard {
    fn new(title: &str, label_tag: &str, label: &str) -> Self {
        let card = ElementDescriptor::new(format!("{title} card"))
            .css_with_text(".cds--tile", TextMatch::contains(title));
        Self {
            label: ElementDescriptor::new(format!("{title} label"))
                .css_with_text(label_tag, TextMatch::contains(label))
                .within(card.clone()),
            value: ElementDescriptor::new(format!("{title} value"))
                .css("p")
                .within(card.clone()),
            card,
        }
    }
}

/// The service queues screen
#[derive(Debug, Clone)]
pub struct QueuePage {
    /// Page header
    pub header: ElementDescriptor,
    /// Breadcrumb
    pub breadcrumb: ElementDescriptor,
    /// Section heading above the table
    pub section: ElementDescriptor,
    /// Add patient to queue
    pub add_to_queue: ElementDescriptor,
    /// Clear queue
    pub clear_queue: ElementDescriptor,
    /// Status filter caption
    pub status_filter: ElementDescriptor,
    /// Table search box
    pub search: ElementDescriptor,
    /// Table body rows
    pub rows: ElementDescriptor,
    /// Message shown instead of rows
    pub empty_message: ElementDescriptor,
    /// Checked in patients
    pub checked_in: MetricCard,
    /// Waiting for
    pub waiting_for: MetricCard,
    /// Queue chooser inside the waiting-for card
    pub waiting_for_filter: ElementDescriptor,
    /// Average wait time today
    pub average_wait: MetricCard,
}

impl Default for QueuePage {
    fn default() -> Self {
        Self::new()
    }
}

impl QueuePage {
    /// Descriptors for the service queues screen
    #[must_use]
    pub fn new() -> Self {
        let waiting_for = MetricCard::new("Waiting for:", "label", "Waiting for:");
        Self {
            header: ElementDescriptor::new("Service queues header")
                .css_with_text("p", TextMatch::exact("Service queues")),
            breadcrumb: ElementDescriptor::new("Clinic breadcrumb")
                .css_with_text("p", TextMatch::exact("Clinic")),
            section: ElementDescriptor::new("queue section heading")
                .role("heading", TextMatch::exact("Patients currently in queue")),
            add_to_queue: ElementDescriptor::new("Add patient to queue button")
                .css("button[aria-label=\"Search Patient Button\"]")
                .attribute("aria-label", "Search Patient Button"),
            clear_queue: ElementDescriptor::new("Clear queue button")
                .role("button", TextMatch::exact("Clear queue")),
            status_filter: ElementDescriptor::new("status filter caption")
                .text(TextMatch::contains("Show patients with status"))
                .first(),
            search: ElementDescriptor::new("queue search box")
                .attribute("placeholder", "Search this list"),
            rows: ElementDescriptor::new("queue rows").css(ROWS),
            empty_message: ElementDescriptor::new("empty queue message")
                .css_with_text("p", TextMatch::contains("No patients to display")),
            checked_in: MetricCard::new("Checked in patients", "span", "Patients"),
            waiting_for_filter: ElementDescriptor::new("waiting for queue chooser")
                .role_any("combobox")
                .within(waiting_for.card.clone()),
            waiting_for,
            average_wait: MetricCard::new("Average wait time today", "span", "Minutes"),
        }
    }

    /// Header cell for `column`
    #[must_use]
    pub fn column_header(column: &str) -> ElementDescriptor {
        ElementDescriptor::new(format!("{column} column"))
            .role("columnheader", TextMatch::exact(column))
            .css_with_text("th", TextMatch::exact(column))
    }

    fn row(index: usize) -> ElementDescriptor {
        ElementDescriptor::new(format!("queue row {index}"))
            .css(ROWS)
            .nth(index)
    }

    fn cell(index: usize, column: usize) -> ElementDescriptor {
        ElementDescriptor::new(format!("queue row {index} cell {column}"))
            .css("td")
            .nth(column)
            .within(Self::row(index))
    }

    /// Rows in the table; zero when the empty message shows
    pub async fn queue_count(&self, session: &Session) -> TriageResult<usize> {
        let act = session.act();
        if act.is_visible(&self.empty_message).await? {
            return Ok(0);
        }
        act.count(&self.rows).await
    }

    /// Cell texts of every row
    pub async fn queue_details(&self, session: &Session) -> TriageResult<Vec<Vec<String>>> {
        let act = session.act();
        let rows = self.queue_count(session).await?;
        let mut details = Vec::with_capacity(rows);
        for index in 0..rows {
            let cells = act
                .count(&ElementDescriptor::new("cells").css("td").within(Self::row(index)))
                .await?;
            let mut texts = Vec::with_capacity(cells);
            for column in 0..cells {
                texts.push(act.inner_text(&Self::cell(index, column)).await?);
            }
            details.push(texts);
        }
        Ok(details)
    }

    /// Header for `column` is visible right now
    pub async fn has_column(&self, session: &Session, column: &str) -> TriageResult<bool> {
        session.act().is_visible(&Self::column_header(column)).await
    }

    /// Checked-in patient count, once the tile shows a number
    pub async fn checked_in_count(&self, session: &Session) -> TriageResult<u64> {
        metric(session, &self.checked_in).await
    }

    /// Average wait in minutes, once the tile shows a number
    pub async fn average_wait(&self, session: &Session) -> TriageResult<u64> {
        metric(session, &self.average_wait).await
    }

    /// Either at least one row or the empty message is visible right now
    pub async fn rows_or_empty_visible(&self, session: &Session) -> TriageResult<bool> {
        let act = session.act();
        let first_row = self.rows.clone().first();
        Ok(act.is_visible(&first_row).await? || act.is_visible(&self.empty_message).await?)
    }
}

async fn metric(session: &Session, card: &MetricCard) -> TriageResult<u64> {
    crate::assertion::expect(session, &card.value)
        .to_match(r"^\d+$")
        .await?;
    let text = session.act().inner_text(&card.value).await?;
    text.trim()
        .parse()
        .map_err(|_| TriageError::assertion(format!("{} is not a number: {text:?}", card.value.name())))
}

#[async_trait]
impl PageSurface for QueuePage {
    fn name(&self) -> &str {
        "service queues"
    }

    fn path(&self) -> &str {
        "home/service-queues"
    }

    fn descriptors(&self) -> Vec<&ElementDescriptor> {
        vec![
            &self.header,
            &self.breadcrumb,
            &self.section,
            &self.add_to_queue,
            &self.clear_queue,
            &self.status_filter,
            &self.search,
            &self.rows,
            &self.empty_message,
            &self.checked_in.card,
            &self.checked_in.label,
            &self.checked_in.value,
            &self.waiting_for.card,
            &self.waiting_for.label,
            &self.waiting_for.value,
            &self.waiting_for_filter,
            &self.average_wait.card,
            &self.average_wait.label,
            &self.average_wait.value,
        ]
    }

    fn ready_marker(&self) -> &ElementDescriptor {
        &self.section
    }

    async fn wait_until_loaded(&self, session: &Session) -> TriageResult<()> {
        session.wait_for_load(LoadState::Load).await?;
        session
            .act()
            .with_timeout(session.config().navigation_timeout)
            .wait_for(&self.section, ElementCondition::Visible)
            .await
    }
}
