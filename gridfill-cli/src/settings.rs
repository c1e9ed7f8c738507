//! Effective configuration and records: file values first, then flags and
//! `GRIDFILL_*` environment variables on top.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gridfill::record::validate_records;
use gridfill::{default_records, FillConfig, RowRecord};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bridge_addr: Option<String>,
    pub batch_size: Option<usize>,
}

pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<FillConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            parse_file::<FillConfig>(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => FillConfig::default(),
    };
    if let Some(addr) = &overrides.bridge_addr {
        config.bridge_addr = addr.clone();
    }
    if let Some(size) = overrides.batch_size {
        config.batch_size = size;
    }
    config.validate().context("Invalid configuration")?;
    debug!(?config, "Effective configuration");
    Ok(config)
}

/// Records from a JSON or YAML file, or the built-in defaults.
pub fn load_records(path: Option<&Path>) -> Result<Vec<RowRecord>> {
    let records = match path {
        Some(path) => parse_file::<Vec<RowRecord>>(path)
            .with_context(|| format!("Failed to load records {}", path.display()))?,
        None => {
            info!("No records file given, using the default records");
            default_records()
        }
    };
    validate_records(&records)?;
    Ok(records)
}

fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(serde_json::from_str(&text)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&text)?),
        // YAML is a superset of JSON
        _ => Ok(serde_yaml::from_str(&text)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        let config = load_config(None, &Overrides::default()).unwrap();
        assert_eq!(config, FillConfig::default());
    }

    #[test]
    fn yaml_file_then_overrides() {
        let file = write_temp(
            ".yaml",
            "batch_size: 5\nlist_poll:\n  attempts: 4\n  initial_delay: 20\n  max_delay: 80\n  factor: 2\nselectors:\n  add_row_button: '#add'\n",
        );
        let overrides = Overrides {
            bridge_addr: Some("127.0.0.1:9999".into()),
            batch_size: Some(2),
        };
        let config = load_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.bridge_addr, "127.0.0.1:9999");
        assert_eq!(config.list_poll.attempts, 4);
        assert_eq!(config.list_poll.initial_delay, Duration::from_millis(20));
        assert_eq!(config.selectors.add_row_button, "#add");
        assert_eq!(config.selectors.rows, FillConfig::default().selectors.rows);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let overrides = Overrides {
            batch_size: Some(0),
            ..Default::default()
        };
        let err = load_config(None, &overrides).unwrap_err();
        assert!(format!("{err:#}").contains("batch"), "{err:#}");
    }

    #[test]
    fn records_from_json() {
        let file = write_temp(
            ".json",
            r#"[{"start":{"date":"01/23/2025","hours":"07","minutes":"15","amPm":"AM"},
                "end":{"date":"01/23/2025","hours":"07","minutes":"45","amPm":"AM"},
                "hourType":"Travel","servType":"On-Site Service"}]"#,
        );
        let records = load_records(Some(file.path())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start.minutes, "15");
    }

    #[test]
    fn invalid_records_are_rejected() {
        let file = write_temp(
            ".yml",
            "- start: {date: 01/23/2025, hours: '13', minutes: '00', amPm: PM}\n  end: {date: 01/23/2025, hours: '02', minutes: '00', amPm: PM}\n  hourType: Travel\n  servType: On-Site Service\n",
        );
        let err = load_records(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("record 1"), "{err:#}");
    }

    #[test]
    fn no_file_means_default_records() {
        assert_eq!(load_records(None).unwrap(), default_records());
    }
}
