//! WebSocket 事件中枢
//!
//! 每个连接一个读循环 + 一个写任务（经 mpsc 转发）；每个入站事件作为独立任务交给编排器处理，
//! 同一会话的并发事件不做串行化。未携带 sessionId 的事件使用连接自身的 id 作为会话 id。

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use super::message::{ClientEvent, ErrorKind, ServerEvent};
use crate::core::Orchestrator;

/// WebSocket 中枢
pub struct Hub {
    bind_addr: String,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
}

impl Hub {
    pub fn new(bind_addr: impl Into<String>, orchestrator: Arc<Orchestrator>, shutdown: CancellationToken) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            orchestrator,
            shutdown,
        }
    }

    /// 绑定端口并在后台接受连接，返回实际监听地址
    pub async fn start(&self) -> Result<SocketAddr, String> {
        let addr: SocketAddr = self
            .bind_addr
            .parse()
            .map_err(|e| format!("Invalid bind address: {}", e))?;

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind: {}", e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| format!("Failed to read local address: {}", e))?;

        tracing::info!("WebSocket hub listening on ws://{}", local_addr);

        let shutdown = self.shutdown.clone();
        let orchestrator = Arc::clone(&self.orchestrator);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("WebSocket hub stopped");
                        break;
                    }
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                let orchestrator = Arc::clone(&orchestrator);
                                let shutdown = shutdown.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, addr, orchestrator, shutdown).await {
                                        tracing::error!("Connection error from {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                            }
                        }
                    }
                }
            }
        });

        Ok(local_addr)
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
) -> Result<(), String> {
    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| format!("WebSocket handshake failed: {}", e))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(connection = %connection_id, "User connected from {}", addr);

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(WsMessage::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = ws_rx.next() => match msg {
                Some(Ok(m)) => m,
                Some(Err(e)) => {
                    tracing::warn!("WebSocket receive error: {}", e);
                    break;
                }
                None => break,
            },
        };

        match msg {
            WsMessage::Text(text) => {
                let event: ClientEvent = match serde_json::from_str(&text) {
                    Ok(ev) => ev,
                    Err(e) => {
                        let error = ServerEvent::error(ErrorKind::ParseError, e.to_string(), None);
                        let _ = tx.send(error.to_json());
                        continue;
                    }
                };
                dispatch(Arc::clone(&orchestrator), event, connection_id.clone(), tx.clone());
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    tracing::info!(connection = %connection_id, "User disconnected: {}", addr);
    Ok(())
}

/// 在独立任务中处理事件；处理任务异常退出时回送对应类型的 error 事件
fn dispatch(
    orchestrator: Arc<Orchestrator>,
    event: ClientEvent,
    connection_id: String,
    tx: mpsc::UnboundedSender<String>,
) {
    let kind = event.error_kind();
    let session_id = event.session_id().unwrap_or(&connection_id).to_string();

    tokio::spawn(async move {
        let sid = session_id.clone();
        let handle = tokio::spawn(async move { handle_event(&orchestrator, event, &sid).await });
        let reply = match handle.await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session = %session_id, "{} handler failed: {}", kind.as_str(), e);
                Some(ServerEvent::error(kind, kind.default_message(), Some(&session_id)))
            }
        };
        if let Some(reply) = reply {
            let _ = tx.send(reply.to_json());
        }
    });
}

/// 处理单个客户端事件，返回要回送的事件；confirm_step 在会话无任务时不回送
pub async fn handle_event(
    orchestrator: &Orchestrator,
    event: ClientEvent,
    default_session_id: &str,
) -> Option<ServerEvent> {
    let session_id = event
        .session_id()
        .unwrap_or(default_session_id)
        .to_string();

    match event {
        ClientEvent::SendMessage { message, .. } => {
            tracing::info!(
                session = %session_id,
                "Message received: {}",
                message.chars().take(50).collect::<String>()
            );
            let response = orchestrator.classify_and_respond(&message, &session_id).await;
            Some(ServerEvent::ai_response(&response, &session_id))
        }
        ClientEvent::ExecuteTool { tool_name, input, .. } => {
            match orchestrator.use_tool(&tool_name, &input, &session_id).await {
                Ok(outcome) => Some(ServerEvent::tool_result(&outcome, &tool_name, &session_id)),
                Err(e) => {
                    tracing::warn!(session = %session_id, "Tool execution error: {}", e);
                    Some(ServerEvent::tool_error(&e, &session_id))
                }
            }
        }
        ClientEvent::UpdatePreferences { preferences, .. } => {
            let updated = orchestrator.set_preferences(&session_id, preferences).await;
            tracing::info!(session = %session_id, "Preferences updated");
            Some(ServerEvent::preferences_updated(&updated, &session_id))
        }
        ClientEvent::ConfirmStep { step_result, .. } => orchestrator
            .confirm_step(&session_id, step_result)
            .await
            .map(|response| ServerEvent::ai_response(&response, &session_id)),
    }
}
