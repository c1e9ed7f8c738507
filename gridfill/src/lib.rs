//! Adds time-entry rows to a third-party data grid and fills them through the
//! grid's own widgets.
//!
//! The host page is reached through [`HostPage`]; in production that is a
//! [`BridgePage`] talking to a browser tab over the [`ExtensionBridge`].
//! A run looks like this:
//!
//! ```no_run
//! use std::sync::Arc;
//! use gridfill::{default_records, BatchController, BridgePage, ExtensionBridge, FillConfig};
//!
//! # async fn run() -> Result<(), gridfill::FillError> {
//! let config = FillConfig::default();
//! let bridge = ExtensionBridge::start(&config.bridge_addr).await?;
//! bridge.wait_for_client(&config.connect_poll).await?;
//!
//! let page = Arc::new(BridgePage::new(bridge, config.eval_timeout));
//! let report = BatchController::new(page, config).run(&default_records()).await;
//! println!("{} fields failed", report.failed_fields());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod bridge_page;
pub mod collector;
pub mod config;
pub mod datetime;
pub mod errors;
pub mod extension_bridge;
pub mod field;
pub mod page;
pub mod poll;
pub mod record;
pub mod resolver;
pub mod row;
pub mod scripts;
pub mod selectors;

pub use batch::{BatchController, BatchOutcome, BatchReport, BatchState};
pub use bridge_page::BridgePage;
pub use collector::CollectorForm;
pub use config::{FillConfig, PollPolicy, Timings};
pub use errors::FillError;
pub use extension_bridge::ExtensionBridge;
pub use field::{FieldKind, FieldOutcome, FieldSetter};
pub use page::{CandidateList, HostPage, ListHandle, ListQuery, OptionClick, RowHandle, Target};
pub use record::{default_records, AmPm, DateTimeSpec, RowRecord};
pub use resolver::{ListKind, ListResolver};
pub use row::{RowOrchestrator, RowReport};
pub use selectors::{CategoryField, Column, DateTimeField, SelectorRegistry};
