use std::path::PathBuf;

use crate::scheduler::{OverlapPolicy, SchedulerConfig};

/// Process configuration, read from `STADEPLAN_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store: String,
    pub hierarchy_path: PathBuf,
    pub metrics_port: Option<u16>,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(get("STADEPLAN_DATA_DIR").unwrap_or_else(|| "./data".into()));
        let store = get("STADEPLAN_STORE").unwrap_or_else(|| "planning".into());
        let hierarchy_path = get("STADEPLAN_HIERARCHY")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("hierarchy.json"));
        let metrics_port = get("STADEPLAN_METRICS_PORT").and_then(|s| s.parse().ok());
        let overlap = match get("STADEPLAN_OVERLAP").map(|s| s.parse::<OverlapPolicy>()) {
            Some(Ok(policy)) => policy,
            Some(Err(e)) => {
                tracing::warn!("{e}, keeping default");
                OverlapPolicy::default()
            }
            None => OverlapPolicy::default(),
        };

        Self {
            data_dir,
            store,
            hierarchy_path,
            metrics_port,
            scheduler: SchedulerConfig {
                overlap,
                ..SchedulerConfig::default()
            },
        }
    }
}
