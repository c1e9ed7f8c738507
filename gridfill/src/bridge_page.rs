use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::FillError;
use crate::extension_bridge::ExtensionBridge;
use crate::page::{CandidateList, HostPage, ListHandle, ListQuery, OptionClick, RowHandle, Target};
use crate::scripts::{page_call, parse_envelope};

/// [`HostPage`] backed by a live browser tab connected through the bridge.
pub struct BridgePage {
    bridge: Arc<ExtensionBridge>,
    timeout: Duration,
}

impl BridgePage {
    pub fn new(bridge: Arc<ExtensionBridge>, timeout: Duration) -> Self {
        Self { bridge, timeout }
    }

    async fn call<T: DeserializeOwned>(&self, op: &str, args: Value) -> Result<T, FillError> {
        debug!(op, args = %args, "Page call");
        let raw = self.bridge.eval(&page_call(op, &args), self.timeout).await?;
        parse_envelope(op, &raw)
    }
}

#[async_trait]
impl HostPage for BridgePage {
    async fn count(&self, selector: &str) -> Result<usize, FillError> {
        self.call("count", json!({ "selector": selector })).await
    }

    async fn exists(&self, target: &Target) -> Result<bool, FillError> {
        self.call("exists", json!({ "target": target })).await
    }

    async fn click(&self, target: &Target) -> Result<(), FillError> {
        let clicked: bool = self.call("click", json!({ "target": target })).await?;
        if clicked {
            Ok(())
        } else {
            Err(FillError::missing("element", target.to_string()))
        }
    }

    async fn set_input_value(&self, selector: &str, value: &str) -> Result<(), FillError> {
        let set: bool = self
            .call(
                "setInputValue",
                json!({ "selector": selector, "value": value }),
            )
            .await?;
        if set {
            Ok(())
        } else {
            Err(FillError::missing("input", selector))
        }
    }

    async fn lists(&self, query: &ListQuery) -> Result<Vec<CandidateList>, FillError> {
        self.call("lists", json!({ "query": query })).await
    }

    async fn click_option(
        &self,
        query: &ListQuery,
        list: &ListHandle,
        text: &str,
    ) -> Result<OptionClick, FillError> {
        self.call(
            "clickOption",
            json!({ "query": query, "list": list, "text": text }),
        )
        .await
    }

    async fn tag_trailing_rows(
        &self,
        rows_selector: &str,
        count: usize,
        batch_tag: &str,
    ) -> Result<Vec<RowHandle>, FillError> {
        self.call(
            "tagTrailingRows",
            json!({ "selector": rows_selector, "count": count, "tag": batch_tag }),
        )
        .await
    }

    async fn row_position(
        &self,
        rows_selector: &str,
        row: &RowHandle,
    ) -> Result<Option<usize>, FillError> {
        self.call(
            "rowPosition",
            json!({ "selector": rows_selector, "row": row }),
        )
        .await
    }

    async fn alert(&self, message: &str) -> Result<(), FillError> {
        let _: bool = self.call("alert", json!({ "message": message })).await?;
        Ok(())
    }
}
