use ibc_tests::{config::Settings, network::setup, scenarios};

/// Runs every scenario against the local chains configured through the environment
#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs the local chains and their relayer"]
async fn test_scenarios_on_local_chains() {
    let _ = env_logger::builder().is_test(true).try_init();
    let settings = Settings::from_env();
    let ctx = setup(&settings, None).await.unwrap();
    scenarios::run_all(&ctx).await.unwrap();
}
