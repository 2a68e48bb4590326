// Standalone fake dashboard for trying runs without the real site

use std::net::SocketAddr;
use tracing::{Level, info};

include!("../../tests/fake_dashboard_app.rs");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Fake dashboard listening on http://{}", addr);
    info!(
        "Seed localStorage key '{}' through the session's origins to get past the login wall",
        SESSION_TOKEN_KEY
    );

    axum::serve(listener, create_app()).await?;
    Ok(())
}
