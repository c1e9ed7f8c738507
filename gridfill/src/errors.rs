use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FillError {
    /// A control the host page should render (button, trigger, input, cell) is absent.
    #[error("Missing control: {control} (selector {selector:?})")]
    MissingControl { control: String, selector: String },

    /// No candidate list matched before the poll budget ran out.
    #[error("List not found for {field} after {attempts} attempts ({waited:?})")]
    ListNotFound {
        field: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Option {value:?} not found for {field}. Available: {}", available.join(", "))]
    OptionNotFound {
        field: String,
        value: String,
        available: Vec<String>,
    },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Extension bridge error: {0}")]
    Bridge(String),

    #[error("Page script failed: {0}")]
    Script(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FillError {
    pub fn missing(control: impl Into<String>, selector: impl Into<String>) -> Self {
        FillError::MissingControl {
            control: control.into(),
            selector: selector.into(),
        }
    }

    /// True for the three per-field failure kinds that never abort sibling fields.
    pub fn is_field_level(&self) -> bool {
        matches!(
            self,
            FillError::MissingControl { .. }
                | FillError::ListNotFound { .. }
                | FillError::OptionNotFound { .. }
        )
    }
}
