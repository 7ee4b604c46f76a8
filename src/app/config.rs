use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lots::LotAllocationStrategy;
use crate::util::os::home_dir_file_path;

use super::Error;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// User defaults, read from ~/.taxlot/config.json. Every field is optional,
/// and command line flags take precedence over all of them.
#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Strategy for sales the report could not fully resolve.
    pub default_strategy: Option<LotAllocationStrategy>,
    /// Whether to prompt for unresolved sales.
    pub interactive: Option<bool>,
    /// Ledger file used when --ledger is not given.
    pub ledger: Option<PathBuf>,
}

impl Config {
    pub fn parse(json: &str) -> Result<Config, Error> {
        serde_json::from_str(json).map_err(|e| format!("Invalid config: {e}"))
    }

    /// Reads the config at `path`. A missing file is an empty config.
    pub fn load_from(path: &Path) -> Result<Config, Error> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}", path.display());
                return Ok(Config::default());
            }
            Err(e) => return Err(format!("Unable to read {}: {e}", path.display())),
        };
        Config::parse(&json).map_err(|e| format!("{}: {e}", path.display()))
    }

    pub fn load() -> Result<Config, Error> {
        let path = home_dir_file_path(Path::new(CONFIG_FILE_NAME))?;
        Config::load_from(&path)
    }

    pub fn strategy(&self) -> LotAllocationStrategy {
        self.default_strategy.unwrap_or_default()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::lots::LotAllocationStrategy;
    use crate::testlib::assert_re;

    use super::Config;

    #[test]
    fn test_parse() {
        let config = Config::parse(
            r#"{"default_strategy": "lowest-price", "interactive": false,
                "ledger": "/home/me/ledger.json"}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            Config {
                default_strategy: Some(LotAllocationStrategy::LowestPrice),
                interactive: Some(false),
                ledger: Some(PathBuf::from("/home/me/ledger.json")),
            }
        );
        assert_eq!(config.strategy(), LotAllocationStrategy::LowestPrice);
        assert!(!config.is_interactive());

        let config = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.strategy(), LotAllocationStrategy::FirstIn);
        assert!(config.is_interactive());
    }

    #[test]
    fn test_parse_errors() {
        let err = Config::parse(r#"{"default_strategy": "random"}"#).unwrap_err();
        assert_re("^Invalid config: ", &err);
        let err = Config::parse(r#"{"strategy": "last-in"}"#).unwrap_err();
        assert_re("unknown field `strategy`", &err);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("taxlot-no-such-dir").join("config.json");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }
}
