use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::FillError;
use crate::selectors::SelectorRegistry;

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_BRIDGE_ADDR: &str = "127.0.0.1:17373";
/// Path fragment of the labor-time review page that hosts the grid.
pub const DEFAULT_PAGE_URL: &str = "Review_Add_Labor_Time";
const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded exponential backoff for condition polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub attempts: u32,
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::lists()
    }
}

impl PollPolicy {
    /// Dropdown lists render within a few frames of the trigger click.
    pub fn lists() -> Self {
        Self {
            attempts: 10,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            factor: 2,
        }
    }

    /// New grid rows and cell editors.
    pub fn rendering() -> Self {
        Self {
            attempts: 12,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            factor: 2,
        }
    }

    /// Waiting for the in-page bridge client after the server starts.
    pub fn connection() -> Self {
        Self::fixed(60, Duration::from_millis(500))
    }

    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            initial_delay: delay,
            max_delay: delay,
            factor: 1,
        }
    }

    /// Delay to sleep after the given failed attempt (0-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.factor.max(1);
        let mut delay = self.initial_delay;
        for _ in 0..attempt {
            if delay >= self.max_delay {
                break;
            }
            delay = delay.saturating_mul(factor);
        }
        delay.min(self.max_delay)
    }

    /// Worst-case time spent sleeping before giving up.
    pub fn budget(&self) -> Duration {
        (0..self.attempts.saturating_sub(1))
            .map(|a| self.delay_after(a))
            .sum()
    }
}

/// Fixed settle delays between simulated interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    #[serde(with = "duration_ms")]
    pub cell_click: Duration,
    #[serde(with = "duration_ms")]
    pub trigger_click: Duration,
    #[serde(with = "duration_ms")]
    pub after_date: Duration,
    /// Between hour, minute and am/pm so the previous list can close.
    #[serde(with = "duration_ms")]
    pub between_time_fields: Duration,
    #[serde(with = "duration_ms")]
    pub after_option: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            cell_click: Duration::from_millis(100),
            trigger_click: Duration::from_millis(100),
            after_date: Duration::from_millis(100),
            between_time_fields: Duration::from_millis(150),
            after_option: Duration::from_millis(100),
        }
    }
}

impl Timings {
    /// No settle delays at all; for pages that render synchronously.
    pub fn immediate() -> Self {
        Self {
            cell_click: Duration::ZERO,
            trigger_click: Duration::ZERO,
            after_date: Duration::ZERO,
            between_time_fields: Duration::ZERO,
            after_option: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Rows created per batch.
    pub batch_size: usize,
    pub bridge_addr: String,
    /// Substring of the grid page's URL; other connected tabs never get evals.
    /// Empty accepts any page.
    pub page_url: String,
    #[serde(with = "duration_ms")]
    pub eval_timeout: Duration,
    pub connect_poll: PollPolicy,
    pub list_poll: PollPolicy,
    pub render_poll: PollPolicy,
    pub timings: Timings,
    pub selectors: SelectorRegistry,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            bridge_addr: DEFAULT_BRIDGE_ADDR.to_string(),
            page_url: DEFAULT_PAGE_URL.to_string(),
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
            connect_poll: PollPolicy::connection(),
            list_poll: PollPolicy::lists(),
            render_poll: PollPolicy::rendering(),
            timings: Timings::default(),
            selectors: SelectorRegistry::default(),
        }
    }
}

impl FillConfig {
    pub fn validate(&self) -> Result<(), FillError> {
        if self.batch_size == 0 {
            return Err(FillError::Config("batch_size must be at least 1".into()));
        }
        for (name, policy) in [
            ("connect_poll", &self.connect_poll),
            ("list_poll", &self.list_poll),
            ("render_poll", &self.render_poll),
        ] {
            if policy.attempts == 0 {
                return Err(FillError::Config(format!(
                    "{name}.attempts must be at least 1"
                )));
            }
        }
        if self.eval_timeout.is_zero() {
            return Err(FillError::Config("eval_timeout must be non-zero".into()));
        }
        self.selectors.validate()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_backoff_doubles_then_caps() {
        let policy = PollPolicy::lists();
        let delays: Vec<u64> = (0..6)
            .map(|a| policy.delay_after(a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![10, 20, 40, 80, 100, 100]);
        assert_eq!(policy.budget(), Duration::from_millis(10 + 20 + 40 + 80 + 100 * 5));
    }

    #[test]
    fn fixed_policy_never_grows() {
        let policy = PollPolicy::fixed(4, Duration::from_millis(25));
        assert!((0..10).all(|a| policy.delay_after(a) == Duration::from_millis(25)));
        assert_eq!(policy.budget(), Duration::from_millis(75));
    }

    #[test]
    fn durations_are_milliseconds_on_the_wire() {
        let cfg: FillConfig = serde_json::from_str(
            r#"{"batch_size": 5, "eval_timeout": 1500, "timings": {"after_option": 40}}"#,
        )
        .unwrap();
        assert_eq!(cfg.batch_size, 5);
        assert_eq!(cfg.eval_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.timings.after_option, Duration::from_millis(40));
        assert_eq!(cfg.timings.cell_click, Duration::from_millis(100));
        assert_eq!(cfg.list_poll, PollPolicy::lists());
        assert_eq!(cfg.page_url, "Review_Add_Labor_Time");

        let back = serde_json::to_value(&cfg).unwrap();
        assert_eq!(back["timings"]["between_time_fields"], 150);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let cfg: FillConfig = serde_yaml::from_str(
            "render_poll:\n  attempts: 20\nselectors:\n  blank_cell: '#blank'\n  columns:\n    hour_type: col-7\n",
        )
        .unwrap();
        assert_eq!(cfg.render_poll.attempts, 20);
        assert_eq!(cfg.render_poll.initial_delay, PollPolicy::lists().initial_delay);
        assert_eq!(cfg.selectors.blank_cell.as_deref(), Some("#blank"));
        assert_eq!(cfg.selectors.columns.hour_type, "col-7");
        assert_eq!(
            cfg.selectors.columns.service_type,
            "svmx-grid-cell-gridcolumn-1082"
        );
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_values_are_rejected() {
        let cfg = FillConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = FillConfig::default();
        cfg.list_poll.attempts = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("list_poll"), "{err}");

        FillConfig::default().validate().unwrap();
    }
}
