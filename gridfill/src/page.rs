//! The capabilities the filler needs from the host page.
//!
//! Matching policy lives above this trait, DOM access below it. Everything that
//! crosses the seam is plain data (selectors, texts, handles), never a live
//! element reference, because the host re-renders rows and lists freely between
//! two interactions.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::FillError;

/// Attribute used to mark rows created by a batch so they can be found again.
pub const ROW_TAG_ATTRIBUTE: &str = "data-gridfill-row";

/// A grid row created by the current batch, identified by its tag value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowHandle(String);

impl RowHandle {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn tag(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something to click or probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// First match of a document-wide selector.
    Css { selector: String },
    /// First match of `selector` inside the first match of `scope`.
    Within { scope: String, selector: String },
    /// The `.{column}` cell inside a tagged row.
    RowCell { row: RowHandle, column: String },
    /// The `index`-th `.{column}` cell in the whole document.
    NthCell { column: String, index: usize },
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Target::Css {
            selector: selector.into(),
        }
    }

    pub fn within(scope: impl Into<String>, selector: impl Into<String>) -> Self {
        Target::Within {
            scope: scope.into(),
            selector: selector.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Css { selector } => write!(f, "{selector}"),
            Target::Within { scope, selector } => write!(f, "{scope} {selector}"),
            Target::RowCell { row, column } => {
                write!(f, "[{ROW_TAG_ATTRIBUTE}=\"{row}\"] .{column}")
            }
            Target::NthCell { column, index } => write!(f, ".{column}[{index}]"),
        }
    }
}

/// Which dropdown lists to inspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub selector: String,
    pub item_selector: String,
    /// Skip lists whose computed `display` is `none`.
    pub visible_only: bool,
}

/// Position of a list within one [`HostPage::lists`] snapshot, plus its DOM id
/// when the host assigned one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListHandle {
    pub index: usize,
    pub dom_id: Option<String>,
}

impl fmt::Display for ListHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dom_id {
            Some(id) => write!(f, "#{id}"),
            None => write!(f, "list[{}]", self.index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    pub handle: ListHandle,
    /// Trimmed option texts in display order.
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptionClick {
    Clicked,
    /// The list is still there but has no option with that exact text.
    Missing { available: Vec<String> },
    /// The list was removed before the option could be clicked.
    ListGone,
}

#[async_trait]
pub trait HostPage: Send + Sync {
    async fn count(&self, selector: &str) -> Result<usize, FillError>;

    async fn exists(&self, target: &Target) -> Result<bool, FillError>;

    /// Clicks the element `target` resolves to, or fails with
    /// [`FillError::MissingControl`] when there is none.
    async fn click(&self, target: &Target) -> Result<(), FillError>;

    /// Clears the input and notifies listeners, then sets `value` and sends
    /// bubbling `input` and `change` notifications.
    async fn set_input_value(&self, selector: &str, value: &str) -> Result<(), FillError>;

    async fn lists(&self, query: &ListQuery) -> Result<Vec<CandidateList>, FillError>;

    /// Clicks the option of `list` whose trimmed text equals `text`.
    async fn click_option(
        &self,
        query: &ListQuery,
        list: &ListHandle,
        text: &str,
    ) -> Result<OptionClick, FillError>;

    /// Tags the last `count` rows matching `rows_selector` with
    /// `{batch_tag}-{i}` and returns their handles oldest first.
    async fn tag_trailing_rows(
        &self,
        rows_selector: &str,
        count: usize,
        batch_tag: &str,
    ) -> Result<Vec<RowHandle>, FillError>;

    /// Current index of a tagged row among all rows matching `rows_selector`.
    async fn row_position(
        &self,
        rows_selector: &str,
        row: &RowHandle,
    ) -> Result<Option<usize>, FillError>;

    /// Blocking notification shown to the operator.
    async fn alert(&self, message: &str) -> Result<(), FillError>;
}
