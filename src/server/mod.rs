// src/server/mod.rs

//! HTTP side of `watch`: the live-reload listener browsers connect to, and
//! a static file server over the build tree that injects the reload client
//! into every HTML page.

pub mod livereload;
pub mod reload;
pub mod static_server;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::errors::{AssetdagError, Result};

pub use reload::{ReloadEvent, ReloadHub};

/// Bind `host:port`, mapping failure to [`AssetdagError::Bind`].
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| AssetdagError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })
}

/// Serve `app` on `listener` until the process exits.
pub async fn serve(name: &'static str, listener: TcpListener, app: Router) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(server = name, "listening on http://{addr}");
    }
    axum::serve(listener, app).await?;
    Ok(())
}
