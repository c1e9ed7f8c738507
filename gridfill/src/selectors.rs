//! CSS locators for the host grid's current markup.
//!
//! The ids baked into these defaults are generated by the host application's
//! widget framework and change between its releases. They are plain data so a
//! config file can replace any of them without a rebuild.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::FillError;

/// The two date-time cells of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeField {
    Start,
    End,
}

impl DateTimeField {
    pub fn column(self) -> Column {
        match self {
            DateTimeField::Start => Column::StartDateTime,
            DateTimeField::End => Column::EndDateTime,
        }
    }
}

/// The two picklist cells of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryField {
    HourType,
    ServiceType,
}

impl CategoryField {
    pub fn column(self) -> Column {
        match self {
            CategoryField::HourType => Column::HourType,
            CategoryField::ServiceType => Column::ServiceType,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    HourType,
    ServiceType,
    StartDateTime,
    EndDateTime,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::HourType,
        Column::ServiceType,
        Column::StartDateTime,
        Column::EndDateTime,
    ];

    /// Header text as the grid shows it.
    pub fn label(self) -> &'static str {
        match self {
            Column::HourType => "Hour Type",
            Column::ServiceType => "Service Type",
            Column::StartDateTime => "Start Date Time",
            Column::EndDateTime => "End Date Time",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Locators for one date-time editor (start or end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelectorSet {
    pub date: String,
    pub hour_trigger: String,
    pub minute_trigger: String,
    pub am_pm_trigger: String,
}

/// Cell class names, one per grid column. Cells are looked up as `.{class}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnClasses {
    pub hour_type: String,
    pub service_type: String,
    pub start_date_time: String,
    pub end_date_time: String,
}

impl Default for ColumnClasses {
    fn default() -> Self {
        Self {
            hour_type: "svmx-grid-cell-gridcolumn-1081".into(),
            service_type: "svmx-grid-cell-gridcolumn-1082".into(),
            start_date_time: "svmx-grid-cell-gridcolumn-1083".into(),
            end_date_time: "svmx-grid-cell-gridcolumn-1084".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorRegistry {
    pub rows: String,
    pub add_row_button: String,

    pub hour_type_editor: String,
    pub service_type_editor: String,
    /// Arrow trigger inside a picklist cell editor.
    pub editor_arrow_trigger: String,

    pub start_date: String,
    pub start_hour: String,
    pub start_minute: String,
    pub start_am_pm: String,

    pub end_date: String,
    pub end_hour: String,
    pub end_minute: String,
    pub end_am_pm: String,

    pub columns: ColumnClasses,

    /// Dropdown lists opened by the time triggers (visible ones only).
    pub time_list: String,
    /// Dropdown lists opened by the category editors.
    pub category_list: String,
    pub list_item: String,

    /// Clicked once after a batch to commit the last open editor.
    pub blank_cell: Option<String>,
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self {
            rows: "#svmx-listcomposite-1092-body tr.svmx-grid-row".into(),
            add_row_button: "#sfm-button-1099-btnEl".into(),

            hour_type_editor: "#sfm-picklistcelleditor-1061-triggerWrap".into(),
            service_type_editor: "#sfm-picklistcelleditor-1062-triggerWrap".into(),
            editor_arrow_trigger: ".svmx-form-trigger.svmx-form-arrow-trigger".into(),

            start_date: "#svmx-date-1064-inputEl".into(),
            start_hour: "#svmx-picklist-1065-triggerWrap .svmx-form-trigger".into(),
            start_minute: "#svmx-picklist-1066-triggerWrap .svmx-form-trigger".into(),
            start_am_pm: "#svmx-picklist-1067-triggerWrap .svmx-form-trigger".into(),

            end_date: "#svmx-date-1071-inputEl".into(),
            end_hour: "#svmx-picklist-1072-triggerWrap .svmx-form-trigger".into(),
            end_minute: "#svmx-picklist-1073-triggerWrap .svmx-form-trigger".into(),
            end_am_pm: "#svmx-picklist-1074-triggerWrap .svmx-form-trigger".into(),

            columns: ColumnClasses::default(),

            time_list: ".svmx-boundlist".into(),
            category_list: "[id^=\"boundlist-\"]".into(),
            list_item: ".svmx-boundlist-item".into(),

            blank_cell: None,
        }
    }
}

impl SelectorRegistry {
    pub fn start_fields(&self) -> FieldSelectorSet {
        self.fields(DateTimeField::Start)
    }

    pub fn end_fields(&self) -> FieldSelectorSet {
        self.fields(DateTimeField::End)
    }

    pub fn fields(&self, field: DateTimeField) -> FieldSelectorSet {
        match field {
            DateTimeField::Start => FieldSelectorSet {
                date: self.start_date.clone(),
                hour_trigger: self.start_hour.clone(),
                minute_trigger: self.start_minute.clone(),
                am_pm_trigger: self.start_am_pm.clone(),
            },
            DateTimeField::End => FieldSelectorSet {
                date: self.end_date.clone(),
                hour_trigger: self.end_hour.clone(),
                minute_trigger: self.end_minute.clone(),
                am_pm_trigger: self.end_am_pm.clone(),
            },
        }
    }

    pub fn editor_for(&self, field: CategoryField) -> &str {
        match field {
            CategoryField::HourType => &self.hour_type_editor,
            CategoryField::ServiceType => &self.service_type_editor,
        }
    }

    pub fn column_for(&self, column: Column) -> &str {
        match column {
            Column::HourType => &self.columns.hour_type,
            Column::ServiceType => &self.columns.service_type,
            Column::StartDateTime => &self.columns.start_date_time,
            Column::EndDateTime => &self.columns.end_date_time,
        }
    }

    pub fn validate(&self) -> Result<(), FillError> {
        let required = [
            ("rows", &self.rows),
            ("add_row_button", &self.add_row_button),
            ("hour_type_editor", &self.hour_type_editor),
            ("service_type_editor", &self.service_type_editor),
            ("editor_arrow_trigger", &self.editor_arrow_trigger),
            ("start_date", &self.start_date),
            ("start_hour", &self.start_hour),
            ("start_minute", &self.start_minute),
            ("start_am_pm", &self.start_am_pm),
            ("end_date", &self.end_date),
            ("end_hour", &self.end_hour),
            ("end_minute", &self.end_minute),
            ("end_am_pm", &self.end_am_pm),
            ("columns.hour_type", &self.columns.hour_type),
            ("columns.service_type", &self.columns.service_type),
            ("columns.start_date_time", &self.columns.start_date_time),
            ("columns.end_date_time", &self.columns.end_date_time),
            ("time_list", &self.time_list),
            ("category_list", &self.category_list),
            ("list_item", &self.list_item),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(FillError::Config(format!("selector {name} is empty")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_end_sets_do_not_overlap() {
        let reg = SelectorRegistry::default();
        let start = reg.start_fields();
        let end = reg.end_fields();
        assert_eq!(start, reg.fields(DateTimeField::Start));
        assert_eq!(end, reg.fields(DateTimeField::End));
        assert_eq!(start.date, "#svmx-date-1064-inputEl");
        assert_eq!(end.am_pm_trigger, "#svmx-picklist-1074-triggerWrap .svmx-form-trigger");
        assert_ne!(start.hour_trigger, end.hour_trigger);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let reg: SelectorRegistry = serde_json::from_str(
            r##"{"add_row_button": "#sfm-button-2000-btnEl", "columns": {"hour_type": "c-1"}}"##,
        )
        .unwrap();
        assert_eq!(reg.add_row_button, "#sfm-button-2000-btnEl");
        assert_eq!(reg.columns.hour_type, "c-1");
        assert_eq!(
            reg.columns.service_type,
            ColumnClasses::default().service_type
        );
        assert_eq!(reg.rows, SelectorRegistry::default().rows);
        reg.validate().unwrap();
    }

    #[test]
    fn empty_selector_fails_validation() {
        let reg = SelectorRegistry {
            list_item: " ".into(),
            ..Default::default()
        };
        let err = reg.validate().unwrap_err();
        assert!(err.to_string().contains("list_item"), "{err}");
    }

    #[test]
    fn category_columns_map_to_their_editors() {
        let reg = SelectorRegistry::default();
        assert_eq!(
            reg.column_for(CategoryField::ServiceType.column()),
            "svmx-grid-cell-gridcolumn-1082"
        );
        assert!(reg.editor_for(CategoryField::HourType).contains("1061"));
        assert_eq!(DateTimeField::End.column().label(), "End Date Time");
    }
}
