use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use cosmwasm_std::Addr;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::TestingError;

/// The deployment state persisted per chain id between runs
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Cache {
    #[serde(rename = "OS", default)]
    pub os: BTreeMap<String, Addr>,
    #[serde(rename = "ALL_ADO", default)]
    pub all_ado: BTreeMap<String, u64>,
    #[serde(default)]
    pub client: Option<Addr>,
}

/// A cache is only trusted once it holds an address for every expected contract
pub fn is_cache_complete<'a>(cache: &Cache, expected: impl IntoIterator<Item = &'a str>) -> bool {
    expected
        .into_iter()
        .all(|name| cache.os.contains_key(name))
}

/// Reads and writes `{chain_id}.cache.json` files in a single directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, chain_id: &str) -> PathBuf {
        self.dir.join(format!("{chain_id}.cache.json"))
    }

    /// Loads the cache for `chain_id`. A missing or unreadable file is a miss, not an error.
    pub fn load(&self, chain_id: &str) -> Option<Cache> {
        let path = self.path(chain_id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => {
                debug!("No cache found at {}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(cache) => Some(cache),
            Err(err) => {
                warn!("Ignoring unreadable cache {}: {err}", path.display());
                None
            }
        }
    }

    pub fn save(&self, chain_id: &str, cache: &Cache) -> Result<(), TestingError> {
        std::fs::create_dir_all(&self.dir)?;
        let json_data = serde_json::to_string_pretty(cache)?;
        std::fs::write(self.path(chain_id), json_data)?;
        Ok(())
    }

    /// Deletes the cache for `chain_id`, if there is one
    pub fn remove(&self, chain_id: &str) -> Result<(), TestingError> {
        match std::fs::remove_file(self.path(chain_id)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Merges published ADO code ids into the cache for `chain_id`
    pub fn record_ados(
        &self,
        chain_id: &str,
        code_ids: &BTreeMap<String, u64>,
    ) -> Result<(), TestingError> {
        let mut cache = self.load(chain_id).unwrap_or_default();
        cache
            .all_ado
            .extend(code_ids.iter().map(|(name, id)| (name.clone(), *id)));
        self.save(chain_id, &cache)
    }
}
