//! Setting one field of one row through the host's own widgets.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::config::{FillConfig, PollPolicy, Timings};
use crate::errors::FillError;
use crate::page::{HostPage, ListHandle, ListQuery, OptionClick, RowHandle, Target};
use crate::poll::poll_until;
use crate::record::DateTimeSpec;
use crate::resolver::{ListKind, ListResolver};
use crate::selectors::{CategoryField, Column, DateTimeField, SelectorRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Opening click on a row's date-time cell.
    Cell(Column),
    Date(DateTimeField),
    Hours(DateTimeField),
    Minutes(DateTimeField),
    AmPm(DateTimeField),
    Category(CategoryField),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Cell(column) => write!(f, "{column} cell"),
            FieldKind::Date(field) => write!(f, "{} date", field.column()),
            FieldKind::Hours(field) => write!(f, "{} hours", field.column()),
            FieldKind::Minutes(field) => write!(f, "{} minutes", field.column()),
            FieldKind::AmPm(field) => write!(f, "{} am/pm", field.column()),
            FieldKind::Category(field) => write!(f, "{}", field.column()),
        }
    }
}

/// Result of one field interaction. Failures are kept, not raised.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub field: FieldKind,
    pub value: String,
    pub result: Result<(), FillError>,
}

impl FieldOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub struct FieldSetter {
    page: Arc<dyn HostPage>,
    resolver: ListResolver,
    selectors: SelectorRegistry,
    timings: Timings,
    render_poll: PollPolicy,
}

impl FieldSetter {
    pub fn new(page: Arc<dyn HostPage>, config: &FillConfig) -> Self {
        Self {
            resolver: ListResolver::new(page.clone(), config.list_poll),
            page,
            selectors: config.selectors.clone(),
            timings: config.timings,
            render_poll: config.render_poll,
        }
    }

    fn time_lists(&self) -> ListQuery {
        ListQuery {
            selector: self.selectors.time_list.clone(),
            item_selector: self.selectors.list_item.clone(),
            visible_only: true,
        }
    }

    fn category_lists(&self) -> ListQuery {
        ListQuery {
            selector: self.selectors.category_list.clone(),
            item_selector: self.selectors.list_item.clone(),
            visible_only: false,
        }
    }

    /// Replaces a date input's text and fires the notifications the host
    /// listens for. No list is involved.
    pub async fn set_date(&self, selector: &str, value: &str) -> Result<(), FillError> {
        self.page
            .set_input_value(selector, value)
            .await
            .map_err(|e| relabel_missing(e, "date input".into()))
    }

    /// Opens a time picklist via its arrow trigger and clicks `value`.
    pub async fn set_time_part(
        &self,
        trigger: &str,
        kind: ListKind,
        value: &str,
    ) -> Result<(), FillError> {
        self.page
            .click(&Target::css(trigger))
            .await
            .map_err(|e| relabel_missing(e, format!("{kind} trigger")))?;

        let query = self.time_lists();
        let list = self.resolver.resolve(&query, &kind, None).await?;
        self.pick(&query, &list.handle, &kind.to_string(), value)
            .await
    }

    async fn pick(
        &self,
        query: &ListQuery,
        list: &ListHandle,
        field: &str,
        value: &str,
    ) -> Result<(), FillError> {
        match self.page.click_option(query, list, value).await? {
            OptionClick::Clicked => Ok(()),
            OptionClick::Missing { available } => Err(FillError::OptionNotFound {
                field: field.to_string(),
                value: value.to_string(),
                available,
            }),
            OptionClick::ListGone => Err(FillError::OptionNotFound {
                field: field.to_string(),
                value: value.to_string(),
                available: Vec::new(),
            }),
        }
    }

    /// Fills one date-time cell of `row`: date, then hours, minutes, am/pm.
    ///
    /// Each part is attempted even when an earlier one failed; only a missing
    /// cell stops the sequence, since nothing can be opened without it.
    #[instrument(level = "debug", skip(self, spec), fields(row = %row))]
    pub async fn set_date_time(
        &self,
        row: &RowHandle,
        field: DateTimeField,
        spec: &DateTimeSpec,
    ) -> Vec<FieldOutcome> {
        let column = field.column();
        let selectors = self.selectors.fields(field);
        let mut outcomes = Vec::with_capacity(4);

        debug!(%column, date = %spec.date, hours = %spec.hours, minutes = %spec.minutes, am_pm = %spec.am_pm, "Setting date time");
        let cell = Target::RowCell {
            row: row.clone(),
            column: self.selectors.column_for(column).to_string(),
        };
        if let Err(e) = self.page.click(&cell).await {
            let outcome = report(FieldKind::Cell(column), spec.date.clone(), Err(e));
            outcomes.push(outcome);
            return outcomes;
        }
        settle(self.timings.cell_click).await;

        let date = self.set_date(&selectors.date, &spec.date).await;
        outcomes.push(report(FieldKind::Date(field), spec.date.clone(), date));
        settle(self.timings.after_date).await;

        let am_pm = spec.am_pm.as_str().to_string();
        let parts = [
            (
                FieldKind::Hours(field),
                ListKind::Hours,
                &selectors.hour_trigger,
                &spec.hours,
            ),
            (
                FieldKind::Minutes(field),
                ListKind::Minutes,
                &selectors.minute_trigger,
                &spec.minutes,
            ),
            (
                FieldKind::AmPm(field),
                ListKind::AmPm,
                &selectors.am_pm_trigger,
                &am_pm,
            ),
        ];
        for (kind, list_kind, trigger, value) in parts {
            let result = self.set_time_part(trigger, list_kind, value).await;
            outcomes.push(report(kind, value.clone(), result));
            settle(self.timings.between_time_fields).await;
        }
        outcomes
    }

    /// Fills a picklist column for the row currently at `row_index`.
    ///
    /// Category cells are addressed by their position among all cells of the
    /// column, so the caller must pass a freshly resolved index.
    #[instrument(level = "debug", skip(self, value))]
    pub async fn set_category(
        &self,
        row_index: usize,
        field: CategoryField,
        value: &str,
    ) -> FieldOutcome {
        let result = self.try_set_category(row_index, field, value).await;
        report(FieldKind::Category(field), value.to_string(), result)
    }

    async fn try_set_category(
        &self,
        row_index: usize,
        field: CategoryField,
        value: &str,
    ) -> Result<(), FillError> {
        let column = field.column();
        let column_class = self.selectors.column_for(column).to_string();
        debug!(
            "Processing {:?} for row {}: {} cell(s) with class {:?}",
            column.label(),
            row_index + 1,
            self.page.count(&format!(".{column_class}")).await?,
            column_class
        );

        let cell = Target::NthCell {
            column: column_class,
            index: row_index,
        };
        self.page
            .click(&cell)
            .await
            .map_err(|e| relabel_missing(e, format!("{column} cell in row {}", row_index + 1)))?;
        settle(self.timings.cell_click).await;

        let editor = self.selectors.editor_for(field).to_string();
        let editor_target = Target::css(editor.clone());
        poll_until(&self.render_poll, "cell editor", || async {
            Ok(self.page.exists(&editor_target).await?.then_some(()))
        })
        .await?
        .or_timeout("cell editor")
        .map_err(|_| FillError::missing(format!("{column} editor"), editor.clone()))?;

        let arrow = Target::within(editor, self.selectors.editor_arrow_trigger.clone());
        self.page
            .click(&arrow)
            .await
            .map_err(|e| relabel_missing(e, format!("{column} list trigger")))?;
        settle(self.timings.trigger_click).await;

        let query = self.category_lists();
        debug!(
            lists = self.page.count(&query.selector).await?,
            selector = %query.selector,
            "Category lists present"
        );
        let kind = ListKind::Category(column.label().to_string());
        let list = self.resolver.resolve(&query, &kind, Some(value)).await?;
        debug!(list = %list.handle, available = ?list.items, "Available options in the found list");
        self.pick(&query, &list.handle, column.label(), value).await?;
        settle(self.timings.after_option).await;
        Ok(())
    }
}

fn relabel_missing(err: FillError, control: String) -> FillError {
    match err {
        FillError::MissingControl { selector, .. } => FillError::MissingControl { control, selector },
        other => other,
    }
}

fn report(field: FieldKind, value: String, result: Result<(), FillError>) -> FieldOutcome {
    match &result {
        Ok(()) => info!("✅ {field} set to {value:?}"),
        Err(e) => error!("❌ {field}: {e}"),
    }
    FieldOutcome {
        field,
        value,
        result,
    }
}
