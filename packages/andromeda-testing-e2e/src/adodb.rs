use std::{collections::BTreeMap, path::Path};

use andromeda_std::os::adodb;
use log::info;

use crate::{
    cache::CacheStore,
    client::ChainClient,
    endpoint::ChainEndpoint,
    error::TestingError,
    os::ContractSource,
};

/// A compiled ADO waiting to be uploaded and published
#[derive(Debug, Clone)]
pub struct AdoArtifact {
    pub ado_type: String,
    pub version: String,
    pub source: ContractSource,
}

impl AdoArtifact {
    pub fn from_bytes(
        ado_type: impl Into<String>,
        version: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        AdoArtifact {
            ado_type: ado_type.into(),
            version: version.into(),
            source: ContractSource::Bytes(bytes.into()),
        }
    }

    /// Parses the ADO type and version out of a file named `andromeda_<type>@<version>.wasm`
    pub fn parse_file_name(file_name: &str) -> Result<(String, String), TestingError> {
        let invalid = || TestingError::InvalidArtifact(file_name.to_string());
        let stem = file_name.strip_suffix(".wasm").ok_or_else(invalid)?;
        let (name, version) = stem.split_once('@').ok_or_else(invalid)?;
        let ado_type = name.strip_prefix("andromeda_").unwrap_or(name);
        if ado_type.is_empty() || version.is_empty() {
            return Err(invalid());
        }
        Ok((ado_type.to_string(), version.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, TestingError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| TestingError::InvalidArtifact(path.display().to_string()))?;
        let (ado_type, version) = Self::parse_file_name(file_name)?;
        Ok(AdoArtifact {
            ado_type,
            version,
            source: ContractSource::File(path.to_path_buf()),
        })
    }
}

/// Every versioned ADO artifact in `dir`, sorted by type
pub fn load_artifacts(dir: &Path) -> Result<Vec<AdoArtifact>, TestingError> {
    let mut artifacts = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_versioned_wasm = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".wasm") && name.contains('@'));
        if is_versioned_wasm {
            artifacts.push(AdoArtifact::from_path(&path)?);
        }
    }
    artifacts.sort_by(|a, b| a.ado_type.cmp(&b.ado_type));
    Ok(artifacts)
}

/// Uploads every artifact and publishes it in the chain's ADO database.
///
/// Returns the code id of each ADO type. When a cache is given the code ids are recorded in it.
pub async fn publish_ados<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    artifacts: &[AdoArtifact],
    cache: Option<&CacheStore>,
) -> Result<BTreeMap<String, u64>, TestingError> {
    let adodb = endpoint.adodb()?;
    let mut code_ids = BTreeMap::new();
    for artifact in artifacts {
        let wasm = artifact.source.load()?;
        let code_id = endpoint.client.upload(&artifact.ado_type, wasm).await?;
        adodb
            .execute(
                &endpoint.client,
                &adodb::ExecuteMsg::Publish {
                    code_id,
                    ado_type: artifact.ado_type.clone(),
                    action_fees: None,
                    version: artifact.version.clone(),
                    publisher: None,
                },
                &[],
            )
            .await?;
        info!(
            "Published {}@{} as code {code_id} on {}",
            artifact.ado_type, artifact.version, endpoint.name
        );
        code_ids.insert(artifact.ado_type.clone(), code_id);
    }

    if let Some(store) = cache {
        store.record_ados(endpoint.client.chain_id(), &code_ids)?;
    }
    Ok(code_ids)
}

/// The code id the chain's ADO database holds for `ado_type`
pub async fn query_code_id<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
    ado_type: &str,
) -> Result<u64, TestingError> {
    endpoint
        .adodb()?
        .query(
            &endpoint.client,
            &adodb::QueryMsg::CodeId {
                key: ado_type.to_string(),
            },
        )
        .await
}

/// Both chains must resolve every ADO type to the same code id
pub async fn verify_code_ids_match<C: ChainClient>(
    a: &ChainEndpoint<C>,
    b: &ChainEndpoint<C>,
    ado_types: &[String],
) -> Result<(), TestingError> {
    for ado_type in ado_types {
        let (code_a, code_b) =
            tokio::try_join!(query_code_id(a, ado_type), query_code_id(b, ado_type))?;
        if code_a != code_b {
            return Err(TestingError::assertion(format!(
                "{ado_type} has code id {code_a} on {} but {code_b} on {}",
                a.name, b.name
            )));
        }
    }
    Ok(())
}
