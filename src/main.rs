use anyhow::Context;
use gapi_gateway::metrics::MetricsService;
use gapi_gateway::{init_tracing, GatewayConfig, GatewayRegistry, RequestParams, RestClient, Surface};
use std::env;
use std::path::PathBuf;
use tracing::{debug, info};

/// Usage: `gapi-gateway [config_file] [folder_id]`
///
/// Loads and validates the configuration, reports the effective budgets and,
/// when a Drive folder id is given, lists its children through the gateway.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/gateway.yaml"));
    let folder_id = args.next();

    let path = config_path.exists().then_some(config_path.as_path());
    let config = GatewayConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    config.validate().context("Invalid configuration")?;

    let metrics = MetricsService::new()?;

    for surface in Surface::ALL {
        let limits = config.limits(surface);
        info!(
            surface = %surface,
            algorithm = %limits.algorithm,
            read_rate = limits.read_rate,
            write_rate = ?limits.write_rate,
            "Effective budget (permits per minute)"
        );
    }
    info!(
        max_retries = config.retry.max_retries,
        base_delay_ms = config.retry.base_delay_ms,
        max_delay_ms = config.retry.max_delay_ms,
        "Retry policy"
    );

    let Some(folder_id) = folder_id else {
        return Ok(());
    };

    let credentials = config.credentials.load()?;
    let registry = GatewayRegistry::new(
        config.clone(),
        RestClient::connector(config.endpoints.clone(), config.timeout()),
    );

    let drive = registry.drive(&credentials).await?;
    let params = RequestParams::new().with("fields", "files(id,name,mimeType)");
    let query = format!("'{}' in parents and trashed = false", folder_id);
    let files = drive.list_files(Some(&query), &params).await?;

    println!("{}", serde_json::to_string_pretty(&files)?);
    debug!(snapshot = %metrics.render(), "Metrics");

    Ok(())
}
