//! 传输层适配器
//!
//! - **http**：axum 路由，工具列表与工具调用
//! - **hub**：WebSocket 事件中枢（send_message / execute_tool / update_preferences / confirm_step）
//! - **message**：事件线上格式，统一补充 sessionId 与时间戳
//!
//! 两者都只持有 `Arc<Orchestrator>`，不直接接触会话或工具。

mod http;
mod hub;
mod message;

pub use http::{router, AppState};
pub use hub::{handle_event, Hub};
pub use message::{timestamp, ClientEvent, ErrorKind, ServerEvent};
