use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use notification_relay::adapters::auth::JwtSessionValidator;
use notification_relay::config::{AppConfig, ServerConfig};
use notification_relay::server::Relay;
use notification_relay::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server.log_level, config.is_production());
    config.validate().context("validating configuration")?;

    let validator = Arc::new(JwtSessionValidator::new(
        config.auth.jwt_secret(),
        config.auth.jwt_issuer.clone(),
    ));
    let relay = Relay::build(&config.broadcast, validator, config.auth.producer_api_key());

    let app = relay
        .router
        .layer(cors_layer(&config.server)?)
        .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(
        %addr,
        ws_path = %config.broadcast.ws_path,
        stream_path = %config.broadcast.stream_path,
        "Notification relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(
        connections = relay.rooms.total_client_count().await,
        "Notification relay stopped"
    );
    Ok(())
}

fn cors_layer(server: &ServerConfig) -> anyhow::Result<CorsLayer> {
    let origins = server.allowed_origins()?;

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
