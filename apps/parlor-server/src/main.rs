#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use parlor_server::{build_router, init_tracing, AppConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let max_created_rooms_per_account = std::env::var("PARLOR_MAX_CREATED_ROOMS_PER_ACCOUNT")
        .map_or_else(
            |_| Ok(AppConfig::default().max_created_rooms_per_account),
            |value| {
                value.parse::<usize>().map_err(|e| {
                    anyhow::anyhow!(
                        "invalid PARLOR_MAX_CREATED_ROOMS_PER_ACCOUNT value {value:?}: {e}"
                    )
                })
            },
        )?;
    let max_payload_bytes = std::env::var("PARLOR_MAX_PAYLOAD_BYTES").map_or_else(
        |_| Ok(AppConfig::default().max_payload_bytes),
        |value| {
            value.parse::<usize>().map_err(|e| {
                anyhow::anyhow!("invalid PARLOR_MAX_PAYLOAD_BYTES value {value:?}: {e}")
            })
        },
    )?;
    let app_config = AppConfig {
        payload_root: std::env::var("PARLOR_PAYLOAD_ROOT")
            .map_or_else(|_| PathBuf::from("./data/payloads"), PathBuf::from),
        max_created_rooms_per_account,
        max_payload_bytes,
        ..AppConfig::default()
    };
    let app = build_router(&app_config)?;
    let addr = std::env::var("PARLOR_BIND_ADDR")
        .unwrap_or_else(|_| String::from("0.0.0.0:3000"))
        .parse::<SocketAddr>()
        .map_err(|e| anyhow::anyhow!("invalid PARLOR_BIND_ADDR: {e}"))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "parlor-server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
