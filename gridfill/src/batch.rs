//! One batch run: add rows to the grid, then fill them from the records.
//!
//! ```text
//! Idle -> RowsRequested -> RowsCreated -> Filling(0..K) -> Done
//! ```
//!
//! Filling ends early when the records run out. Nothing here is retried and
//! nothing is rolled back; field failures are collected in the report.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::FillConfig;
use crate::errors::FillError;
use crate::page::{HostPage, RowHandle, Target};
use crate::poll::poll_until;
use crate::record::RowRecord;
use crate::row::{RowOrchestrator, RowReport};
use crate::selectors::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    RowsRequested,
    RowsCreated,
    Filling { index: usize },
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Completed,
    /// The batch stopped before filling finished; already filled fields stay.
    Aborted(FillError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Rows the batch asked the grid to create.
    pub requested: usize,
    /// Records supplied for this run.
    pub records: usize,
    pub rows: Vec<RowReport>,
    /// New rows left empty because the records ran out.
    pub unfilled_rows: usize,
    /// Grid columns whose cells could not be found before filling.
    pub missing_columns: Vec<Column>,
    pub states: Vec<BatchState>,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    fn new(requested: usize, records: usize) -> Self {
        Self {
            requested,
            records,
            rows: Vec::new(),
            unfilled_rows: 0,
            missing_columns: Vec::new(),
            states: vec![BatchState::Idle],
            outcome: BatchOutcome::Completed,
        }
    }

    pub fn failed_fields(&self) -> usize {
        self.rows.iter().map(|r| r.failures().count()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == BatchOutcome::Completed && self.failed_fields() == 0
    }
}

pub struct BatchController {
    page: Arc<dyn HostPage>,
    config: FillConfig,
    orchestrator: RowOrchestrator,
}

impl BatchController {
    pub fn new(page: Arc<dyn HostPage>, config: FillConfig) -> Self {
        Self {
            orchestrator: RowOrchestrator::new(page.clone(), &config),
            page,
            config,
        }
    }

    /// Runs one batch with the records as they are right now.
    ///
    /// Never fails: errors that stop the batch are logged and returned in
    /// [`BatchReport::outcome`].
    #[instrument(skip(self, records), fields(batch_size = self.config.batch_size, records = records.len()))]
    pub async fn run(&self, records: &[RowRecord]) -> BatchReport {
        let records = records.to_vec();
        let mut report = BatchReport::new(self.config.batch_size, records.len());

        match self.execute(&records, &mut report).await {
            Ok(()) => {
                info!(
                    filled = report.rows.len(),
                    unfilled = report.unfilled_rows,
                    failed_fields = report.failed_fields(),
                    "✅ Batch finished"
                );
            }
            Err(e) => {
                error!("❌ Error creating/filling rows: {e}");
                report.outcome = BatchOutcome::Aborted(e);
            }
        }
        report
    }

    async fn execute(
        &self,
        records: &[RowRecord],
        report: &mut BatchReport,
    ) -> Result<(), FillError> {
        let selectors = &self.config.selectors;
        let batch_size = self.config.batch_size;

        let rows = self.create_rows(report).await?;
        self.verify_headers(report).await?;

        for (index, row) in rows.iter().enumerate() {
            let Some(record) = records.get(index) else {
                report.unfilled_rows = rows.len() - index;
                debug!(
                    unfilled = report.unfilled_rows,
                    "No more records; leaving remaining rows empty"
                );
                break;
            };
            transition(report, BatchState::Filling { index });
            info!("=== Filling row {}/{} ===", index + 1, batch_size);
            let row_report = self.orchestrator.fill(row, record).await;
            report.rows.push(row_report);
        }

        if let Some(blank) = &selectors.blank_cell {
            if let Err(e) = self.page.click(&Target::css(blank.clone())).await {
                warn!("Could not click blank cell to close the last editor: {e}");
            }
        }
        transition(report, BatchState::Done);
        Ok(())
    }

    /// Clicks the add-row control `batch_size` times, waits until that many
    /// new rows are rendered and tags them.
    async fn create_rows(&self, report: &mut BatchReport) -> Result<Vec<RowHandle>, FillError> {
        let selectors = &self.config.selectors;
        let batch_size = self.config.batch_size;
        let add_row = Target::css(selectors.add_row_button.clone());

        info!("🔨 Creating {batch_size} rows...");
        let before = self.page.count(&selectors.rows).await?;
        if !self.page.exists(&add_row).await? {
            let err = FillError::missing("Add Row button", selectors.add_row_button.clone());
            if let Err(alert_err) = self.page.alert("❌ Error: Add Row button not found").await {
                warn!("Could not show alert: {alert_err}");
            }
            return Err(err);
        }
        for _ in 0..batch_size {
            self.page.click(&add_row).await?;
        }
        transition(report, BatchState::RowsRequested);

        let expected = before + batch_size;
        let rendered = poll_until(&self.config.render_poll, "new grid rows", || async {
            let count = self.page.count(&selectors.rows).await?;
            Ok((count >= expected).then_some(count))
        })
        .await?
        .or_timeout("new grid rows")?;
        debug!(before, rendered, "Rows rendered");

        let tag = format!("gf-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let rows = self
            .page
            .tag_trailing_rows(&selectors.rows, batch_size, &tag)
            .await?;
        if rows.len() != batch_size {
            return Err(FillError::Script(format!(
                "expected {batch_size} new rows, tagged {}",
                rows.len()
            )));
        }
        transition(report, BatchState::RowsCreated);
        info!("✅ {batch_size} rows created successfully.");
        Ok(rows)
    }

    /// Checks that every configured column has cells; missing ones are only
    /// reported, their fields will fail individually.
    async fn verify_headers(&self, report: &mut BatchReport) -> Result<(), FillError> {
        debug!("Verifying headers...");
        for column in Column::ALL {
            let class = self.config.selectors.column_for(column);
            let cells = self.page.count(&format!(".{class}")).await?;
            if cells == 0 {
                warn!(%column, class, "❌ Column not found in grid");
                report.missing_columns.push(column);
            } else {
                debug!(%column, cells, "Column present");
            }
        }
        Ok(())
    }
}

fn transition(report: &mut BatchReport, next: BatchState) {
    if let Some(prev) = report.states.last() {
        debug!(from = ?prev, to = ?next, "Batch state");
    }
    report.states.push(next);
}
