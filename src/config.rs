use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::Path;

/// Immutable application configuration for the search pipeline.
///
/// Built once at startup and handed to [`crate::SearchPipeline::new`];
/// nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrtSearchConfig {
    /// Page size for broker queries; large enough that pagination stays
    /// invisible to discovery callers.
    pub broker_page_size: i64,

    /// Parse worker pool size; `None` uses the number of logical
    /// processors.
    pub workers: Option<usize>,

    /// Global message cap applied when a search request sets none.
    pub default_msgs_limit: usize,
}

const EMPTY_CONFIG: &str = r#"### mrt-search configuration file

### page size for broker file-index queries
# broker_page_size = 10000

### parse worker pool size, defaults to the number of logical processors
# workers = 8

### message cap applied when a search request sets no limit
# default_msgs_limit = 100
"#;

impl Default for MrtSearchConfig {
    fn default() -> Self {
        Self {
            broker_page_size: 10000,
            workers: None,
            default_msgs_limit: 100,
        }
    }
}

impl MrtSearchConfig {
    /// Create and initialize the configuration.
    ///
    /// Loads a `.env` file when present, then the TOML configuration file
    /// (`$HOME/.mrt-search/mrt-search.toml` unless a path is given,
    /// created with commented defaults when missing), then `MRT_SEARCH_*`
    /// environment overrides.
    pub fn new(path: &Option<String>) -> Result<MrtSearchConfig> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                let home_dir = dirs::home_dir()
                    .ok_or_else(|| anyhow!("Could not find home directory"))?
                    .to_str()
                    .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
                    .to_owned();
                let config_dir = format!("{}/.mrt-search", home_dir.as_str());
                std::fs::create_dir_all(config_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create mrt-search directory: {}", e))?;
                let p = format!("{}/mrt-search.toml", config_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Settings from the environment, e.g. `MRT_SEARCH_WORKERS=8`
        builder = builder.add_source(config::Environment::with_prefix("MRT_SEARCH"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let defaults = MrtSearchConfig::default();

        let broker_page_size = config
            .get("broker_page_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.broker_page_size);

        // A zero worker count falls through to the processor default
        let workers = config
            .get("workers")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|w| *w > 0);

        let default_msgs_limit = config
            .get("default_msgs_limit")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_msgs_limit);

        Ok(MrtSearchConfig {
            broker_page_size,
            workers,
            default_msgs_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MrtSearchConfig::default();
        assert_eq!(config.broker_page_size, 10000);
        assert_eq!(config.workers, None);
        assert_eq!(config.default_msgs_limit, 100);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mrt-search.toml");
        std::fs::write(
            &path,
            "broker_page_size = 500\nworkers = 4\ndefault_msgs_limit = 25\n",
        )
        .unwrap();

        let config =
            MrtSearchConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        assert_eq!(config.broker_page_size, 500);
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.default_msgs_limit, 25);
    }

    #[test]
    fn test_config_writes_skeleton_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");

        let config =
            MrtSearchConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        assert_eq!(config, MrtSearchConfig::default());
        assert!(path.exists());

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("broker_page_size"));
    }

    #[test]
    fn test_zero_workers_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mrt-search.toml");
        std::fs::write(&path, "workers = 0\n").unwrap();

        let config =
            MrtSearchConfig::new(&Some(path.to_str().unwrap().to_string())).unwrap();
        assert_eq!(config.workers, None);
    }
}
