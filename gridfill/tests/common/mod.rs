//! In-memory stand-in for the host grid.
//!
//! Behaves like the real page where the filler can observe it: rows appear
//! some polls after the add-row click, lists appear some polls after their
//! trigger click, picking an option writes into the row whose editor is open
//! and closes the list.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use gridfill::{
    CandidateList, CategoryField, FillConfig, FillError, HostPage, ListHandle, ListQuery,
    OptionClick, PollPolicy, RowHandle, SelectorRegistry, Target, Timings,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridfill=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Config with no settle delays and millisecond polling.
pub fn fast_config() -> FillConfig {
    FillConfig {
        list_poll: PollPolicy::fixed(10, Duration::from_millis(1)),
        render_poll: PollPolicy::fixed(10, Duration::from_millis(1)),
        timings: Timings::immediate(),
        ..FillConfig::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Purpose {
    /// side ("start"/"end") and part ("hours"/"minutes"/"ampm")
    Time(&'static str, &'static str),
    Category(CategoryField),
    Decoy,
}

#[derive(Debug, Clone)]
struct FakeList {
    id: Option<String>,
    items: Vec<String>,
    visible: bool,
    /// `lists()` calls left before the host has rendered it.
    pending_polls: usize,
    purpose: Purpose,
}

#[derive(Debug, Default, Clone)]
struct FakeRow {
    tag: Option<String>,
    values: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct GridState {
    rows: Vec<FakeRow>,
    pending_rows: usize,
    render_delay: usize,
    render_countdown: usize,
    add_button: bool,
    active_row: Option<usize>,
    active_side: Option<&'static str>,
    active_category: Option<CategoryField>,
    lists: Vec<FakeList>,
    list_delay: usize,
    broken_triggers: HashSet<String>,
    missing_columns: HashSet<String>,
    missing_inputs: HashSet<String>,
    /// Every target passed to `exists`, in call order.
    exists_checks: Vec<String>,
    next_list_id: usize,
    alerts: Vec<String>,
    events: Vec<String>,
}

pub struct FakeGrid {
    sel: SelectorRegistry,
    state: Mutex<GridState>,
}

fn numbered(from: u32, to: u32) -> Vec<String> {
    (from..=to).map(|n| format!("{n:02}")).collect()
}

impl Default for FakeGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGrid {
    pub fn new() -> Self {
        Self {
            sel: SelectorRegistry::default(),
            state: Mutex::new(GridState {
                add_button: true,
                next_list_id: 1100,
                ..Default::default()
            }),
        }
    }

    fn with_state(self, f: impl FnOnce(&mut GridState)) -> Self {
        f(&mut *self.state.lock().unwrap());
        self
    }

    pub fn with_existing_rows(self, n: usize) -> Self {
        self.with_state(|s| {
            for i in 0..n {
                let mut row = FakeRow::default();
                row.values.insert("existing".into(), i.to_string());
                s.rows.push(row);
            }
        })
    }

    /// New rows only show up after this many row counts.
    pub fn with_render_delay(self, polls: usize) -> Self {
        self.with_state(|s| s.render_delay = polls)
    }

    /// Opened lists only show up after this many list snapshots.
    pub fn with_list_delay(self, polls: usize) -> Self {
        self.with_state(|s| s.list_delay = polls)
    }

    pub fn without_add_button(self) -> Self {
        self.with_state(|s| s.add_button = false)
    }

    /// Clicking this trigger never renders a list.
    pub fn with_broken_trigger(self, selector: &str) -> Self {
        self.with_state(|s| {
            s.broken_triggers.insert(selector.to_string());
        })
    }

    pub fn with_missing_column(self, class: &str) -> Self {
        self.with_state(|s| {
            s.missing_columns.insert(class.to_string());
        })
    }

    /// The date editor behind this selector never renders its input.
    pub fn with_missing_input(self, selector: &str) -> Self {
        self.with_state(|s| {
            s.missing_inputs.insert(selector.to_string());
        })
    }

    pub fn with_blank_cell(mut self, selector: &str) -> Self {
        self.sel.blank_cell = Some(selector.to_string());
        self
    }

    /// A stale, still visible 12-item list rendered before any trigger click.
    pub fn with_decoy_hour_list(self) -> Self {
        self.with_state(|s| {
            s.lists.push(FakeList {
                id: Some("boundlist-stale".into()),
                items: numbered(1, 12),
                visible: true,
                pending_polls: 0,
                purpose: Purpose::Decoy,
            })
        })
    }

    pub fn push_list(&self, id: Option<&str>, items: &[&str], visible: bool) {
        self.state.lock().unwrap().lists.push(FakeList {
            id: id.map(str::to_string),
            items: items.iter().map(|s| s.to_string()).collect(),
            visible,
            pending_polls: 0,
            purpose: Purpose::Decoy,
        });
    }

    pub fn selectors(&self) -> &SelectorRegistry {
        &self.sel
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    /// Values written into the row at `index`, keyed `start.date`,
    /// `end.minutes`, `Hour Type`, ...
    pub fn row_values(&self, index: usize) -> BTreeMap<String, String> {
        self.state.lock().unwrap().rows[index].values.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.state.lock().unwrap().alerts.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn exists_checks(&self) -> Vec<String> {
        self.state.lock().unwrap().exists_checks.clone()
    }

    fn trigger_purpose(&self, selector: &str) -> Option<(&'static str, &'static str)> {
        let s = &self.sel;
        [
            (&s.start_hour, ("start", "hours")),
            (&s.start_minute, ("start", "minutes")),
            (&s.start_am_pm, ("start", "ampm")),
            (&s.end_hour, ("end", "hours")),
            (&s.end_minute, ("end", "minutes")),
            (&s.end_am_pm, ("end", "ampm")),
        ]
        .into_iter()
        .find(|(sel, _)| sel.as_str() == selector)
        .map(|(_, purpose)| purpose)
    }

    fn side_for_column(&self, column: &str) -> Option<&'static str> {
        if column == self.sel.columns.start_date_time {
            Some("start")
        } else if column == self.sel.columns.end_date_time {
            Some("end")
        } else {
            None
        }
    }

    fn category_for_column(&self, column: &str) -> Option<CategoryField> {
        if column == self.sel.columns.hour_type {
            Some(CategoryField::HourType)
        } else if column == self.sel.columns.service_type {
            Some(CategoryField::ServiceType)
        } else {
            None
        }
    }

    fn category_items(field: CategoryField) -> Vec<String> {
        let items: &[&str] = match field {
            CategoryField::HourType => &["Travel", "Service", "Training"],
            CategoryField::ServiceType => &["On-Site Service", "Remote Service"],
        };
        items.iter().map(|s| s.to_string()).collect()
    }

    fn open_list(state: &mut GridState, items: Vec<String>, purpose: Purpose) {
        for list in state.lists.iter_mut() {
            if list.purpose != Purpose::Decoy {
                list.visible = false;
            }
        }
        let id = format!("boundlist-{}", state.next_list_id);
        state.next_list_id += 1;
        let pending_polls = state.list_delay;
        state.lists.push(FakeList {
            id: Some(id),
            items,
            visible: true,
            pending_polls,
            purpose,
        });
    }

    fn matches_query(&self, list: &FakeList, query: &ListQuery) -> bool {
        let is_category = matches!(list.purpose, Purpose::Category(_));
        if query.selector == self.sel.category_list {
            is_category || list.purpose == Purpose::Decoy
        } else if query.selector == self.sel.time_list {
            !is_category
        } else {
            false
        }
    }

    fn rendered<'a>(&self, state: &'a GridState, query: &ListQuery) -> Vec<&'a FakeList> {
        state
            .lists
            .iter()
            .filter(|l| l.pending_polls == 0)
            .filter(|l| self.matches_query(l, query))
            .filter(|l| !query.visible_only || l.visible)
            .collect()
    }
}

fn missing(target: &Target) -> FillError {
    FillError::missing("element", target.to_string())
}

#[async_trait]
impl HostPage for FakeGrid {
    async fn count(&self, selector: &str) -> Result<usize, FillError> {
        let mut s = self.state.lock().unwrap();
        if selector == self.sel.rows {
            if s.pending_rows > 0 {
                if s.render_countdown == 0 {
                    for _ in 0..s.pending_rows {
                        s.rows.push(FakeRow::default());
                    }
                    s.pending_rows = 0;
                } else {
                    s.render_countdown -= 1;
                }
            }
            return Ok(s.rows.len());
        }
        if let Some(class) = selector.strip_prefix('.') {
            if s.missing_columns.contains(class) {
                return Ok(0);
            }
            if self.side_for_column(class).is_some() || self.category_for_column(class).is_some()
            {
                return Ok(s.rows.len());
            }
        }
        if selector == self.sel.category_list {
            return Ok(s.lists.iter().filter(|l| l.id.is_some()).count());
        }
        Ok(0)
    }

    async fn exists(&self, target: &Target) -> Result<bool, FillError> {
        let mut s = self.state.lock().unwrap();
        s.exists_checks.push(target.to_string());
        Ok(match target {
            Target::Css { selector } if *selector == self.sel.add_row_button => s.add_button,
            Target::Css { selector } => match s.active_category {
                Some(field) => self.sel.editor_for(field) == selector.as_str(),
                None => false,
            },
            _ => false,
        })
    }

    async fn click(&self, target: &Target) -> Result<(), FillError> {
        let mut s = self.state.lock().unwrap();
        match target {
            Target::Css { selector } if *selector == self.sel.add_row_button => {
                if !s.add_button {
                    return Err(missing(target));
                }
                if s.pending_rows == 0 {
                    s.render_countdown = s.render_delay;
                }
                s.pending_rows += 1;
                s.events.push("add row".into());
            }
            Target::Css { selector } => {
                if let Some((side, part)) = self.trigger_purpose(selector) {
                    s.events.push(format!("open {side}.{part}"));
                    if s.broken_triggers.contains(selector) {
                        return Ok(());
                    }
                    let items = match part {
                        "hours" => numbered(1, 12),
                        "minutes" => numbered(0, 59),
                        _ => vec!["AM".into(), "PM".into()],
                    };
                    Self::open_list(&mut s, items, Purpose::Time(side, part));
                } else if Some(selector) == self.sel.blank_cell.as_ref() {
                    s.active_row = None;
                    s.active_side = None;
                    s.active_category = None;
                    s.events.push("blank".into());
                } else {
                    return Err(missing(target));
                }
            }
            Target::RowCell { row, column } => {
                let index = s
                    .rows
                    .iter()
                    .position(|r| r.tag.as_deref() == Some(row.tag()))
                    .ok_or_else(|| missing(target))?;
                let side = self.side_for_column(column).ok_or_else(|| missing(target))?;
                if s.missing_columns.contains(column) {
                    return Err(missing(target));
                }
                s.active_row = Some(index);
                s.active_side = Some(side);
                s.active_category = None;
                s.events.push(format!("cell {side} row {index}"));
            }
            Target::NthCell { column, index } => {
                let field = self
                    .category_for_column(column)
                    .ok_or_else(|| missing(target))?;
                if s.missing_columns.contains(column) || *index >= s.rows.len() {
                    return Err(missing(target));
                }
                s.active_row = Some(*index);
                s.active_side = None;
                s.active_category = Some(field);
                s.events.push(format!("cell {} row {index}", field.column()));
            }
            Target::Within { scope, selector } => {
                let field = s.active_category.ok_or_else(|| missing(target))?;
                if self.sel.editor_for(field) != scope.as_str()
                    || *selector != self.sel.editor_arrow_trigger
                {
                    return Err(missing(target));
                }
                s.events.push(format!("open {}", field.column()));
                Self::open_list(&mut s, Self::category_items(field), Purpose::Category(field));
            }
        }
        Ok(())
    }

    async fn set_input_value(&self, selector: &str, value: &str) -> Result<(), FillError> {
        let mut s = self.state.lock().unwrap();
        let side = if selector == self.sel.start_date {
            "start"
        } else if selector == self.sel.end_date {
            "end"
        } else {
            return Err(FillError::missing("input", selector));
        };
        if s.missing_inputs.contains(selector) {
            return Err(FillError::missing("input", selector));
        }
        let row = s.active_row.ok_or_else(|| FillError::missing("input", selector))?;
        if s.active_side != Some(side) {
            // The other editor's input is present but not bound to this cell.
            s.events.push(format!("ignored {side}.date"));
            return Ok(());
        }
        s.rows[row]
            .values
            .insert(format!("{side}.date"), value.to_string());
        s.events.push(format!("{side}.date = {value}"));
        Ok(())
    }

    async fn lists(&self, query: &ListQuery) -> Result<Vec<CandidateList>, FillError> {
        let mut s = self.state.lock().unwrap();
        for list in s.lists.iter_mut() {
            if list.pending_polls > 0 {
                list.pending_polls -= 1;
            }
        }
        Ok(self
            .rendered(&s, query)
            .into_iter()
            .enumerate()
            .map(|(index, l)| CandidateList {
                handle: ListHandle {
                    index,
                    dom_id: l.id.clone(),
                },
                items: l.items.clone(),
            })
            .collect())
    }

    async fn click_option(
        &self,
        query: &ListQuery,
        list: &ListHandle,
        text: &str,
    ) -> Result<OptionClick, FillError> {
        let mut s = self.state.lock().unwrap();
        let (items, purpose, id) = {
            let rendered = self.rendered(&s, query);
            let found = match &list.dom_id {
                Some(id) => rendered.into_iter().find(|l| l.id.as_ref() == Some(id)),
                None => rendered.into_iter().nth(list.index),
            };
            match found {
                Some(l) => (l.items.clone(), l.purpose.clone(), l.id.clone()),
                None => return Ok(OptionClick::ListGone),
            }
        };
        if !items.iter().any(|i| i == text) {
            return Ok(OptionClick::Missing { available: items });
        }
        let key = match purpose {
            Purpose::Time(side, part) => Some(format!("{side}.{part}")),
            Purpose::Category(field) => Some(field.column().label().to_string()),
            Purpose::Decoy => None,
        };
        match (key, s.active_row) {
            (Some(key), Some(row)) => {
                s.rows[row].values.insert(key.clone(), text.to_string());
                s.events.push(format!("{key} = {text}"));
            }
            _ => s.events.push(format!("picked {text} from decoy")),
        }
        if let Some(l) = s.lists.iter_mut().find(|l| l.id == id && l.purpose != Purpose::Decoy) {
            l.visible = false;
        }
        Ok(OptionClick::Clicked)
    }

    async fn tag_trailing_rows(
        &self,
        rows_selector: &str,
        count: usize,
        batch_tag: &str,
    ) -> Result<Vec<RowHandle>, FillError> {
        assert_eq!(rows_selector, self.sel.rows);
        let mut s = self.state.lock().unwrap();
        let start = s.rows.len().saturating_sub(count);
        Ok(s.rows[start..]
            .iter_mut()
            .enumerate()
            .map(|(i, row)| {
                let tag = format!("{batch_tag}-{i}");
                row.tag = Some(tag.clone());
                RowHandle::new(tag)
            })
            .collect())
    }

    async fn row_position(
        &self,
        _rows_selector: &str,
        row: &RowHandle,
    ) -> Result<Option<usize>, FillError> {
        let s = self.state.lock().unwrap();
        Ok(s.rows.iter().position(|r| r.tag.as_deref() == Some(row.tag())))
    }

    async fn alert(&self, message: &str) -> Result<(), FillError> {
        self.state.lock().unwrap().alerts.push(message.to_string());
        Ok(())
    }
}
