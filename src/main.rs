use std::sync::Arc;

use fhir_terminology_mcp::{
    build_app, config::Config, logging, terminology_client::HttpTerminologyClient, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;

    let client = HttpTerminologyClient::new(config.terminology.clone());
    let base_url = client.base_url().to_string();
    let state = AppState::new(config.api_token.clone(), base_url, Arc::new(client));
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        terminology_server = %config.terminology.base_url,
        auth_enabled = config.api_token.is_some(),
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
