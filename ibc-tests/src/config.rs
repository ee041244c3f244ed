use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use cosmwasm_std::Addr;

pub const HOST_VAR: &str = "IBC_TESTS_HOST";
pub const CACHE_DIR_VAR: &str = "IBC_TESTS_CACHE_DIR";
pub const CONFIG_VAR: &str = "IBC_TESTS_CONFIG";
pub const ARTIFACTS_VAR: &str = "IBC_TESTS_ARTIFACTS_DIR";

/// Runner settings, read from the environment after loading `.env`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Host the chains' gRPC and REST ports are reached on
    pub host: String,
    pub cache_dir: PathBuf,
    pub config_path: PathBuf,
    /// Compiled contracts, the OS as `andromeda_<name>.wasm` and ADOs as
    /// `andromeda_<type>@<version>.wasm`
    pub artifacts_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "localhost".to_string(),
            cache_dir: PathBuf::from(".cache"),
            config_path: PathBuf::from("config.yml"),
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();
        Settings {
            host: lookup(HOST_VAR).unwrap_or(defaults.host),
            cache_dir: lookup(CACHE_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            config_path: lookup(CONFIG_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            artifacts_dir: lookup(ARTIFACTS_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.artifacts_dir),
        }
    }
}

/// The kernel installed on each chain, by chain name
#[derive(serde::Deserialize, serde::Serialize, Default, Debug, PartialEq)]
pub struct Config {
    pub installations: BTreeMap<String, Addr>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let config: Self = serde_yml::from_str(&contents)
            .with_context(|| format!("Unable to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_yml::to_string(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Unable to write {}", path.display()))?;
        Ok(())
    }

    pub fn get_installation(&self, name: &str) -> anyhow::Result<&Addr> {
        self.installations
            .get(name)
            .with_context(|| format!("Installation not found: {name}"))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::defaults(vec![], Settings::default())]
    #[case::overrides(
        vec![
            (HOST_VAR, "chains.internal"),
            (CACHE_DIR_VAR, "/tmp/cache"),
            (CONFIG_VAR, "out.yml"),
            (ARTIFACTS_VAR, "/opt/wasm"),
        ],
        Settings {
            host: "chains.internal".to_string(),
            cache_dir: PathBuf::from("/tmp/cache"),
            config_path: PathBuf::from("out.yml"),
            artifacts_dir: PathBuf::from("/opt/wasm"),
        }
    )]
    #[case::partial(
        vec![(HOST_VAR, "10.0.0.2")],
        Settings { host: "10.0.0.2".to_string(), ..Settings::default() }
    )]
    fn test_settings(#[case] vars: Vec<(&str, &str)>, #[case] expected: Settings) {
        let vars: BTreeMap<&str, &str> = vars.into_iter().collect();
        let settings = Settings::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(settings, expected);
    }

    #[test]
    fn test_config_round_trip() {
        let path = std::env::temp_dir().join(format!("ibc-tests-config-{}.yml", std::process::id()));
        let config = Config {
            installations: BTreeMap::from([
                ("osmo-a".to_string(), Addr::unchecked("osmo1kernela")),
                ("osmo-b".to_string(), Addr::unchecked("osmo1kernelb")),
            ]),
        };
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.get_installation("osmo-b").unwrap(),
            &Addr::unchecked("osmo1kernelb")
        );
        assert!(loaded.get_installation("juno").is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_config() {
        assert!(Config::load(Path::new("/nonexistent/config.yml")).is_err());
    }
}
