//! Stepwise 服务入口
//!
//! 初始化日志、加载配置、构造编排器，启动 WebSocket 中枢与 HTTP 服务；Ctrl+C 或 SIGTERM 停止。
//!
//! 运行方式：
//! ```bash
//! cargo run --bin stepwise -- [config.toml]
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use stepwise::config::load_config;
use stepwise::gateway::{router, Hub};
use stepwise::{observability, OrchestratorBuilder};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let orchestrator = Arc::new(OrchestratorBuilder::new(cfg.clone()).build());

    let shutdown = CancellationToken::new();

    // 定期清理过期会话与缓存条目
    let sweep_orchestrator = Arc::clone(&orchestrator);
    let sweep_shutdown = shutdown.clone();
    let sweep_every = Duration::from_secs(cfg.sessions.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = sweep_shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let sessions = sweep_orchestrator.sweep_expired().await;
                    let entries = sweep_orchestrator.purge_cache().await;
                    if sessions > 0 || entries > 0 {
                        tracing::info!("Swept {} expired sessions, {} cache entries", sessions, entries);
                    }
                }
            }
        }
    });

    let hub = Hub::new(cfg.server.ws_addr.clone(), Arc::clone(&orchestrator), shutdown.clone());
    hub.start()
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to start WebSocket hub")?;

    let listener = tokio::net::TcpListener::bind(&cfg.server.http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.server.http_addr))?;
    tracing::info!("HTTP server listening on http://{}", cfg.server.http_addr);
    tracing::info!("Press Ctrl+C to stop");

    let http_shutdown = shutdown.clone();
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down...");
            http_shutdown.cancel();
        })
        .await?;

    hub.stop();
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM（容器停止时发送）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
