//! Finding the dropdown list a trigger click just opened.
//!
//! The host renders lists asynchronously and gives them no stable identity, so
//! a list is recognised by its content: either it offers the value we want, or
//! it has exactly as many options as the field's picklist should.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::PollPolicy;
use crate::errors::FillError;
use crate::page::{CandidateList, HostPage, ListQuery};
use crate::poll::{poll_until, Polled};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Hours,
    Minutes,
    AmPm,
    /// A picklist column such as "Hour Type"; matched by value only.
    Category(String),
}

impl ListKind {
    pub fn expected_cardinality(&self) -> Option<usize> {
        match self {
            ListKind::Hours => Some(12),
            ListKind::Minutes => Some(60),
            ListKind::AmPm => Some(2),
            ListKind::Category(_) => None,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Hours => f.write_str("hours"),
            ListKind::Minutes => f.write_str("minutes"),
            ListKind::AmPm => f.write_str("ampm"),
            ListKind::Category(name) => f.write_str(name),
        }
    }
}

/// Picks the list to use out of one snapshot.
///
/// With a `value`, the first list offering it wins and the search stops there.
/// Without one, the *last* list whose size equals the kind's expected
/// cardinality wins.
pub fn select_list<'a>(
    lists: &'a [CandidateList],
    kind: &ListKind,
    value: Option<&str>,
) -> Option<&'a CandidateList> {
    if let Some(value) = value {
        return lists
            .iter()
            .find(|list| list.items.iter().any(|item| item == value));
    }
    let size = kind.expected_cardinality()?;
    lists.iter().rev().find(|list| list.items.len() == size)
}

fn cardinality_matches(lists: &[CandidateList], kind: &ListKind) -> usize {
    match kind.expected_cardinality() {
        Some(size) => lists.iter().filter(|l| l.items.len() == size).count(),
        None => 0,
    }
}

pub struct ListResolver {
    page: Arc<dyn HostPage>,
    policy: PollPolicy,
}

impl ListResolver {
    pub fn new(page: Arc<dyn HostPage>, policy: PollPolicy) -> Self {
        Self { page, policy }
    }

    /// Polls the page until a list matches, or fails with
    /// [`FillError::ListNotFound`] once the policy's attempts are spent.
    #[instrument(level = "debug", skip(self, query), fields(list = %query.selector))]
    pub async fn resolve(
        &self,
        query: &ListQuery,
        kind: &ListKind,
        value: Option<&str>,
    ) -> Result<CandidateList, FillError> {
        let label = format!("{kind} list");
        let polled = poll_until(&self.policy, &label, || async {
            let lists = self.page.lists(query).await?;
            debug!(visible = lists.len(), %kind, ?value, "Inspecting candidate lists");
            for (i, list) in lists.iter().enumerate() {
                debug!(
                    "List {}:{}: {} items {:?}",
                    i + 1,
                    list.handle,
                    list.items.len(),
                    list.items
                );
            }
            let chosen = select_list(&lists, kind, value).cloned();
            if value.is_none() && chosen.is_some() {
                let same_size = cardinality_matches(&lists, kind);
                if same_size > 1 {
                    warn!(
                        %kind,
                        same_size,
                        "Several lists have the expected size; using the last one"
                    );
                }
            }
            Ok(chosen)
        })
        .await?;

        match polled {
            Polled::Ready(list) => {
                debug!(%kind, list = %list.handle, "Found suitable list");
                Ok(list)
            }
            Polled::Exhausted { attempts, waited } => {
                debug!(%kind, ?value, attempts, "No suitable list found");
                Err(FillError::ListNotFound {
                    field: kind.to_string(),
                    attempts,
                    waited,
                })
            }
        }
    }
}
