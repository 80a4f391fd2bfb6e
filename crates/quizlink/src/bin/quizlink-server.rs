//! Standalone Quizlink relay server.
//!
//! Configured through `QUIZLINK_*` environment variables (see
//! [`ServerConfig::from_env`]) and `RUST_LOG` for log filtering.

use quizlink::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), QuizlinkError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "starting quizlink-server");

    let server = QuizlinkServer::builder().config(config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
