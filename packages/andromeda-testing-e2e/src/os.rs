use std::{collections::BTreeMap, path::PathBuf};

use andromeda_std::{
    amp::{ADO_DB_KEY, ECONOMICS_KEY, KERNEL_KEY, VFS_KEY},
    os::{kernel, ModuleInstantiateMsg},
};
use cosmwasm_std::Addr;
use log::{info, warn};

use crate::{
    cache::{is_cache_complete, CacheStore},
    client::ChainClient,
    endpoint::ChainEndpoint,
    error::TestingError,
};

/// The contracts every aOS deployment consists of, the kernel first
pub const OS_CONTRACTS: [&str; 4] = [KERNEL_KEY, ADO_DB_KEY, VFS_KEY, ECONOMICS_KEY];

#[derive(Debug, Clone)]
pub enum ContractSource {
    Bytes(Vec<u8>),
    /// Read when the contract is uploaded
    File(PathBuf),
}

impl ContractSource {
    pub fn load(&self) -> Result<Vec<u8>, TestingError> {
        match self {
            ContractSource::Bytes(bytes) => Ok(bytes.clone()),
            ContractSource::File(path) => Ok(std::fs::read(path)?),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsContract {
    pub name: String,
    pub source: ContractSource,
}

impl OsContract {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        OsContract {
            name: name.into(),
            source: ContractSource::Bytes(bytes.into()),
        }
    }

    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        OsContract {
            name: name.into(),
            source: ContractSource::File(path.into()),
        }
    }
}

/// The OS contracts stored as `<dir>/andromeda_<name>.wasm`
pub fn os_contracts_in(dir: impl Into<PathBuf>) -> Vec<OsContract> {
    let dir = dir.into();
    OS_CONTRACTS
        .iter()
        .map(|name| OsContract::from_file(*name, dir.join(format!("andromeda_{name}.wasm"))))
        .collect()
}

/// Deploys the operating system on the client's chain and wires every module into the kernel.
///
/// A complete cache for the chain is returned as-is without touching the chain. Otherwise every
/// contract is uploaded, the kernel is instantiated first, the remaining contracts are
/// instantiated against it and registered as key addresses. The cache is only written once all
/// of that has succeeded.
pub async fn setup_os<C: ChainClient>(
    client: &C,
    chain_name: &str,
    contracts: &[OsContract],
    cache: Option<&CacheStore>,
) -> Result<BTreeMap<String, Addr>, TestingError> {
    let chain_id = client.chain_id().to_string();
    let names: Vec<&str> = contracts.iter().map(|c| c.name.as_str()).collect();
    if !names.contains(&KERNEL_KEY) {
        return Err(TestingError::ContractNotFound {
            name: KERNEL_KEY.to_string(),
            chain: chain_id,
        });
    }

    if let Some(cached) = cache.and_then(|store| store.load(&chain_id)) {
        if is_cache_complete(&cached, names.iter().copied()) {
            info!("Using cached OS deployment for {chain_id}");
            return Ok(cached.os);
        }
        warn!("Cached OS deployment for {chain_id} is incomplete, redeploying");
    }

    info!("Deploying OS on {chain_id}");
    let mut code_ids = BTreeMap::new();
    for contract in contracts {
        let wasm = contract.source.load()?;
        let code_id = client.upload(&contract.name, wasm).await?;
        code_ids.insert(contract.name.clone(), code_id);
    }

    let kernel_address = client
        .instantiate_msg(
            code_ids[KERNEL_KEY],
            &kernel::InstantiateMsg {
                owner: None,
                chain_name: chain_name.to_string(),
            },
            KERNEL_KEY,
        )
        .await?;
    let mut addresses = BTreeMap::from([(KERNEL_KEY.to_string(), kernel_address.clone())]);

    let modules: Vec<&OsContract> = contracts.iter().filter(|c| c.name != KERNEL_KEY).collect();
    for contract in &modules {
        let address = client
            .instantiate_msg(
                code_ids[&contract.name],
                &ModuleInstantiateMsg {
                    kernel_address: kernel_address.to_string(),
                    owner: None,
                },
                &contract.name,
            )
            .await?;
        addresses.insert(contract.name.clone(), address);
    }

    for contract in &modules {
        let msg = kernel::ExecuteMsg::UpsertKeyAddress {
            key: contract.name.clone(),
            value: addresses[&contract.name].to_string(),
        };
        client.execute_msg(&kernel_address, &msg, &[]).await?;
    }

    if let Some(store) = cache {
        let mut cached = store.load(&chain_id).unwrap_or_default();
        cached.os = addresses.clone();
        cached.client = Some(client.sender());
        store.save(&chain_id, &cached)?;
    }
    info!("Deployed OS on {chain_id}, kernel at {kernel_address}");
    Ok(addresses)
}

/// Checks that the kernel resolves every other deployed contract to its actual address
pub async fn verify_key_addresses<C: ChainClient>(
    endpoint: &ChainEndpoint<C>,
) -> Result<(), TestingError> {
    let kernel = endpoint.kernel()?;
    for (name, handle) in endpoint.contracts.iter().filter(|(name, _)| *name != KERNEL_KEY) {
        let resolved: Addr = kernel
            .query(
                &endpoint.client,
                &kernel::QueryMsg::KeyAddress { key: name.clone() },
            )
            .await?;
        if resolved != handle.address {
            return Err(TestingError::assertion(format!(
                "kernel on {} resolves {name} to {resolved}, expected {}",
                endpoint.name, handle.address
            )));
        }
    }
    Ok(())
}
