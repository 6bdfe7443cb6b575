//! Atelier Node binary
//!
//! Runs the art-generation cycle and serves iteration, images, and votes.

use atelier_server::{AtelierConfig, AtelierNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_server=info,atelier_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Atelier Node");

    let config = AtelierConfig::from_env();

    let node = AtelierNode::new(config)?;
    node.run().await?;

    Ok(())
}
