use andromeda_testing_e2e::cache::CacheStore;
use ibc_tests::{
    config::Settings,
    network::{installations, setup},
    scenarios::run_all,
};
use log::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let settings = Settings::from_env();
    let cache = CacheStore::new(&settings.cache_dir);

    let ctx = setup(&settings, Some(&cache)).await?;
    info!("Installed OS on all chains");

    let config = installations(&ctx)?;
    config.save(&settings.config_path)?;
    info!("Saved installations to {}", settings.config_path.display());

    run_all(&ctx).await?;
    info!("All scenarios passed");
    Ok(())
}
