use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pantry::authz::LambdaAuthorizer;
use pantry::config::Config;
use pantry::identity::{SessionManager, StsCredentialVerifier};
use pantry::list::{ListService, RetryConfig};
use pantry::server::{run_with_port, AppState};
use pantry::storage::S3DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = Config::from_env();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "pantry",
        "pantry starting: RUST_LOG='{}', http_port={}, region='{}', bucket='{}', key='{}', verify_fn='{}', write_role='{}'",
        rust_log, cfg.http_port, cfg.region, cfg.bucket, cfg.list_key, cfg.verify_fn, cfg.write_role
    );

    // Service-identity AWS config from the default provider chain. Caller
    // credentials never land here; they stay inside the per-login STS call.
    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(cfg.region.clone()))
        .load()
        .await;

    let store = Arc::new(S3DocumentStore::new(aws_sdk_s3::Client::new(&aws), cfg.bucket.clone()));
    let list = ListService::new(store, cfg.list_key.clone(), cfg.write_role.clone()).with_retry(
        RetryConfig { max_attempts: cfg.append_max_attempts, ..RetryConfig::default() },
    );

    let state = AppState {
        verifier: Arc::new(StsCredentialVerifier::new(cfg.region.clone())),
        authz: Arc::new(LambdaAuthorizer::new(aws_sdk_lambda::Client::new(&aws), cfg.verify_fn.clone())),
        list: Arc::new(list),
        sessions: SessionManager::with_ttl(Duration::from_secs(cfg.session_ttl_secs)),
    };

    run_with_port(cfg.http_port, state).await
}
