//! Row records: the values one grid row should end up with.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datetime::parse_mmddyyyy;
use crate::errors::FillError;

pub const HOUR_TYPE_TRAVEL: &str = "Travel";
pub const HOUR_TYPE_SERVICE: &str = "Service";
pub const SERVICE_TYPE_ON_SITE: &str = "On-Site Service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AmPm {
    #[default]
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl AmPm {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmPm::Am => "AM",
            AmPm::Pm => "PM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AM" => Some(AmPm::Am),
            "PM" => Some(AmPm::Pm),
            _ => None,
        }
    }
}

impl fmt::Display for AmPm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One date-time cell value, already in the grid's own text forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeSpec {
    /// `MM/DD/YYYY`
    pub date: String,
    /// Two digits, 12-hour clock.
    pub hours: String,
    /// Two digits.
    pub minutes: String,
    pub am_pm: AmPm,
}

impl DateTimeSpec {
    pub fn new(date: &str, hours: &str, minutes: &str, am_pm: AmPm) -> Self {
        Self {
            date: date.to_string(),
            hours: hours.to_string(),
            minutes: minutes.to_string(),
            am_pm,
        }
    }

    pub fn validate(&self) -> Result<(), FillError> {
        parse_mmddyyyy(&self.date)?;
        check_two_digit("hours", &self.hours, 1, 12)?;
        check_two_digit("minutes", &self.minutes, 0, 59)?;
        Ok(())
    }
}

fn check_two_digit(name: &str, value: &str, min: u32, max: u32) -> Result<(), FillError> {
    let in_range = value.len() == 2
        && value
            .parse::<u32>()
            .map(|v| (min..=max).contains(&v))
            .unwrap_or(false);
    if in_range {
        Ok(())
    } else {
        Err(FillError::InvalidRecord(format!(
            "{name} {value:?} must be two digits in {min:02}..={max:02}"
        )))
    }
}

/// The desired content of one grid row. Field names on the wire match the
/// page-side data (`hourType`, `servType`, `amPm`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRecord {
    pub start: DateTimeSpec,
    pub end: DateTimeSpec,
    pub hour_type: String,
    pub serv_type: String,
}

impl RowRecord {
    pub fn validate(&self) -> Result<(), FillError> {
        self.start.validate().map_err(|e| prefixed("start", e))?;
        self.end.validate().map_err(|e| prefixed("end", e))?;
        if self.hour_type.trim().is_empty() || self.serv_type.trim().is_empty() {
            return Err(FillError::InvalidRecord(
                "category labels must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn prefixed(prefix: &str, err: FillError) -> FillError {
    match err {
        FillError::InvalidRecord(msg) => FillError::InvalidRecord(format!("{prefix}: {msg}")),
        other => other,
    }
}

/// Validates every record, reporting the first bad one by its 1-based position.
pub fn validate_records(records: &[RowRecord]) -> Result<(), FillError> {
    for (i, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|e| prefixed(&format!("record {}", i + 1), e))?;
    }
    Ok(())
}

/// Records used when the operator has not supplied any.
pub fn default_records() -> Vec<RowRecord> {
    vec![
        RowRecord {
            start: DateTimeSpec::new("01/05/2022", "08", "00", AmPm::Am),
            end: DateTimeSpec::new("01/05/2022", "08", "30", AmPm::Am),
            hour_type: HOUR_TYPE_TRAVEL.into(),
            serv_type: SERVICE_TYPE_ON_SITE.into(),
        },
        RowRecord {
            start: DateTimeSpec::new("06/16/2023", "08", "30", AmPm::Am),
            end: DateTimeSpec::new("06/16/2023", "09", "30", AmPm::Pm),
            hour_type: HOUR_TYPE_SERVICE.into(),
            serv_type: SERVICE_TYPE_ON_SITE.into(),
        },
        RowRecord {
            start: DateTimeSpec::new("11/22/2024", "09", "30", AmPm::Pm),
            end: DateTimeSpec::new("11/22/2024", "10", "00", AmPm::Pm),
            hour_type: HOUR_TYPE_TRAVEL.into(),
            serv_type: SERVICE_TYPE_ON_SITE.into(),
        },
    ]
}
