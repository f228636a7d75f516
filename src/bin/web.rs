//! Barista Web API
//!
//! 启动: cargo run --bin barista-web --features web
//! POST http://127.0.0.1:8080/api/chat  `{"thread_id": "...", "query": "..."}`

#![cfg(feature = "web")]

use std::sync::Arc;

use anyhow::Context;
use barista::{config::load_config, observability, web::create_router, BaristaAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let agent = Arc::new(BaristaAgent::from_config(&cfg).context("Failed to create agent")?);
    let app = create_router(agent);

    let addr = cfg.web.addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Barista web listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
