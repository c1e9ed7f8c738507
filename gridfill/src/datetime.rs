//! Calendar and clock helpers used when turning operator input into grid values.
//!
//! Everything here is plain calendar arithmetic on [`NaiveDate`]; no timezone is
//! ever involved, so a date formatted and parsed back lands on the same day.

use chrono::NaiveDate;

use crate::errors::FillError;
use crate::record::AmPm;

/// Date format the host grid's date editors accept.
pub const GRID_DATE_FORMAT: &str = "%m/%d/%Y";
/// Date format produced by `<input type="date">` style sources.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// A 12-hour clock reading as the host's hour picklist shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwelveHour {
    /// Two digits, "01" through "12".
    pub hours: String,
    pub am_pm: AmPm,
}

/// Converts a 24-hour value to the picklist's 12-hour form.
///
/// `0` maps to `12 AM`, `12` to `12 PM`, and anything from 13 up drops by twelve
/// and becomes PM.
pub fn convert_24_to_12(hour: u32) -> TwelveHour {
    let am_pm = if hour >= 12 { AmPm::Pm } else { AmPm::Am };
    let twelve = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    TwelveHour {
        hours: format!("{twelve:02}"),
        am_pm,
    }
}

pub fn format_mmddyyyy(date: NaiveDate) -> String {
    date.format(GRID_DATE_FORMAT).to_string()
}

pub fn parse_mmddyyyy(value: &str) -> Result<NaiveDate, FillError> {
    NaiveDate::parse_from_str(value.trim(), GRID_DATE_FORMAT)
        .map_err(|e| FillError::InvalidRecord(format!("date {value:?} is not MM/DD/YYYY: {e}")))
}

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, FillError> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE_FORMAT)
        .map_err(|e| FillError::InvalidRecord(format!("date {value:?} is not YYYY-MM-DD: {e}")))
}

/// `2025-01-23` -> `01/23/2025`.
pub fn iso_to_mmddyyyy(value: &str) -> Result<String, FillError> {
    parse_iso_date(value).map(format_mmddyyyy)
}
