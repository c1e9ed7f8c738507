//! Operator input for one batch: three rows of start/end date and time.
//!
//! This is the state behind the input form, kept free of any UI so the
//! editing rules can be driven from a terminal prompt or tested directly.
//! [`CollectorForm::save`] hands the finished records to the batch.

use chrono::NaiveDate;

use crate::datetime::{convert_24_to_12, format_mmddyyyy};
use crate::errors::FillError;
use crate::record::{
    validate_records, AmPm, DateTimeSpec, RowRecord, HOUR_TYPE_SERVICE, HOUR_TYPE_TRAVEL,
    SERVICE_TYPE_ON_SITE,
};
use crate::selectors::DateTimeField;

pub const FORM_ROWS: usize = 3;

/// Inputs accept at most two characters, like the form's text boxes.
const INPUT_MAX_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeInput {
    /// Raw text as entered; padded on save.
    pub hours: String,
    pub minutes: String,
    pub am_pm: AmPm,
}

impl TimeInput {
    fn new(hours: &str, minutes: &str, am_pm: AmPm) -> Self {
        Self {
            hours: hours.to_string(),
            minutes: minutes.to_string(),
            am_pm,
        }
    }

    fn to_spec(&self, date: NaiveDate) -> DateTimeSpec {
        DateTimeSpec {
            date: format_mmddyyyy(date),
            hours: pad2(&self.hours),
            minutes: pad2(&self.minutes),
            am_pm: self.am_pm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRow {
    pub start_date: NaiveDate,
    pub start: TimeInput,
    pub end_date: NaiveDate,
    pub end: TimeInput,
}

impl FormRow {
    fn time_mut(&mut self, side: DateTimeField) -> &mut TimeInput {
        match side {
            DateTimeField::Start => &mut self.start,
            DateTimeField::End => &mut self.end,
        }
    }
}

/// Result of typing into an hour box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HourInput {
    /// Not a number or outside 0..=23; the box is emptied.
    Cleared,
    /// 1..=12, kept as typed.
    Kept(String),
    /// 0 and 13..=23, rewritten to 12-hour form (`12 AM`, `01 PM`..`11 PM`).
    Converted { hours: String, am_pm: AmPm },
}

pub fn normalize_hour_input(raw: &str) -> HourInput {
    let text = truncate(raw);
    match text.parse::<u32>() {
        Ok(h) if h > 23 => HourInput::Cleared,
        Ok(h) if h > 12 || h == 0 => {
            let converted = convert_24_to_12(h);
            HourInput::Converted {
                hours: converted.hours,
                am_pm: converted.am_pm,
            }
        }
        Ok(_) => HourInput::Kept(text),
        Err(_) => HourInput::Cleared,
    }
}

/// Any numeric value above 59 becomes "59"; anything that is not a number
/// empties the box.
pub fn clamp_minutes_input(raw: &str) -> String {
    let text = truncate(raw);
    match text.parse::<u32>() {
        Ok(m) if m > 59 => "59".to_string(),
        Ok(_) => text,
        Err(_) => String::new(),
    }
}

fn truncate(raw: &str) -> String {
    raw.trim().chars().take(INPUT_MAX_LEN).collect()
}

fn pad2(value: &str) -> String {
    format!("{value:0>2}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorForm {
    rows: Vec<FormRow>,
}

impl CollectorForm {
    /// Three rows dated `today` with the usual travel/service/travel times.
    pub fn new(today: NaiveDate) -> Self {
        let row = |start: TimeInput, end: TimeInput| FormRow {
            start_date: today,
            start,
            end_date: today,
            end,
        };
        Self {
            rows: vec![
                row(
                    TimeInput::new("08", "00", AmPm::Am),
                    TimeInput::new("08", "30", AmPm::Am),
                ),
                row(
                    TimeInput::new("08", "30", AmPm::Am),
                    TimeInput::new("09", "00", AmPm::Pm),
                ),
                row(
                    TimeInput::new("09", "00", AmPm::Pm),
                    TimeInput::new("10", "00", AmPm::Pm),
                ),
            ],
        }
    }

    pub fn rows(&self) -> &[FormRow] {
        &self.rows
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut FormRow, FillError> {
        self.rows
            .get_mut(row)
            .ok_or_else(|| FillError::InvalidRecord(format!("form has no row {}", row + 1)))
    }

    /// A start date entered in any row becomes every row's start and end date.
    pub fn set_start_date(&mut self, row: usize, date: NaiveDate) -> Result<(), FillError> {
        self.row_mut(row)?;
        for r in &mut self.rows {
            r.start_date = date;
            r.end_date = date;
        }
        Ok(())
    }

    pub fn set_end_date(&mut self, row: usize, date: NaiveDate) -> Result<(), FillError> {
        self.row_mut(row)?.end_date = date;
        Ok(())
    }

    pub fn input_hours(
        &mut self,
        row: usize,
        side: DateTimeField,
        raw: &str,
    ) -> Result<HourInput, FillError> {
        let normalized = normalize_hour_input(raw);
        let time = self.row_mut(row)?.time_mut(side);
        match &normalized {
            HourInput::Cleared => time.hours.clear(),
            HourInput::Kept(hours) => time.hours = hours.clone(),
            HourInput::Converted { hours, am_pm } => {
                time.hours = hours.clone();
                time.am_pm = *am_pm;
            }
        }
        self.carry_end_time(row, side);
        Ok(normalized)
    }

    pub fn input_minutes(
        &mut self,
        row: usize,
        side: DateTimeField,
        raw: &str,
    ) -> Result<String, FillError> {
        let minutes = clamp_minutes_input(raw);
        self.row_mut(row)?.time_mut(side).minutes = minutes.clone();
        self.carry_end_time(row, side);
        Ok(minutes)
    }

    pub fn select_am_pm(
        &mut self,
        row: usize,
        side: DateTimeField,
        am_pm: AmPm,
    ) -> Result<(), FillError> {
        self.row_mut(row)?.time_mut(side).am_pm = am_pm;
        self.carry_end_time(row, side);
        Ok(())
    }

    /// An edited end time becomes the next row's start time.
    fn carry_end_time(&mut self, row: usize, side: DateTimeField) {
        if side != DateTimeField::End || row + 1 >= self.rows.len() {
            return;
        }
        let end = self.rows[row].end.clone();
        self.rows[row + 1].start = end;
    }

    /// Builds the batch records. The middle row is labelled "Service", the
    /// others "Travel"; every row is "On-Site Service".
    pub fn save(&self) -> Result<Vec<RowRecord>, FillError> {
        let records: Vec<RowRecord> = self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| RowRecord {
                start: row.start.to_spec(row.start_date),
                end: row.end.to_spec(row.end_date),
                hour_type: if index == 1 {
                    HOUR_TYPE_SERVICE
                } else {
                    HOUR_TYPE_TRAVEL
                }
                .to_string(),
                serv_type: SERVICE_TYPE_ON_SITE.to_string(),
            })
            .collect();
        validate_records(&records)?;
        Ok(records)
    }
}
