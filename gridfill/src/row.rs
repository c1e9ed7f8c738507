use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::FillConfig;
use crate::errors::FillError;
use crate::field::{FieldKind, FieldOutcome, FieldSetter};
use crate::page::{HostPage, RowHandle, ROW_TAG_ATTRIBUTE};
use crate::record::RowRecord;
use crate::selectors::{CategoryField, DateTimeField};

/// What happened to one row of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RowReport {
    pub row: RowHandle,
    pub fields: Vec<FieldOutcome>,
}

impl RowReport {
    pub fn failures(&self) -> impl Iterator<Item = &FieldOutcome> {
        self.fields.iter().filter(|f| !f.is_ok())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Applies one record to one row: start, end, hour type, service type.
pub struct RowOrchestrator {
    page: Arc<dyn HostPage>,
    setter: FieldSetter,
    rows_selector: String,
}

impl RowOrchestrator {
    pub fn new(page: Arc<dyn HostPage>, config: &FillConfig) -> Self {
        Self {
            setter: FieldSetter::new(page.clone(), config),
            page,
            rows_selector: config.selectors.rows.clone(),
        }
    }

    #[instrument(level = "debug", skip(self, record), fields(row = %row))]
    pub async fn fill(&self, row: &RowHandle, record: &RowRecord) -> RowReport {
        let mut fields = Vec::with_capacity(10);

        fields.extend(
            self.setter
                .set_date_time(row, DateTimeField::Start, &record.start)
                .await,
        );
        fields.extend(
            self.setter
                .set_date_time(row, DateTimeField::End, &record.end)
                .await,
        );

        for (field, value) in [
            (CategoryField::HourType, &record.hour_type),
            (CategoryField::ServiceType, &record.serv_type),
        ] {
            // Rows can shift while editors open and close; look the index up again.
            let outcome = match self.current_index(row).await {
                Ok(index) => self.setter.set_category(index, field, value).await,
                Err(e) => {
                    error!("❌ {}: {e}", field.column());
                    FieldOutcome {
                        field: FieldKind::Category(field),
                        value: value.clone(),
                        result: Err(e),
                    }
                }
            };
            fields.push(outcome);
        }

        let report = RowReport {
            row: row.clone(),
            fields,
        };
        let failed = report.failures().count();
        if failed == 0 {
            info!(row = %row, "Row filled");
        } else {
            error!(row = %row, failed, "Row filled with failures");
        }
        report
    }

    async fn current_index(&self, row: &RowHandle) -> Result<usize, FillError> {
        self.page
            .row_position(&self.rows_selector, row)
            .await?
            .ok_or_else(|| {
                FillError::missing("grid row", format!("[{ROW_TAG_ATTRIBUTE}=\"{row}\"]"))
            })
    }
}
