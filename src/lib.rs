//! Stepwise - 会话级分步引导与工具调度服务
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **observability**: tracing 日志初始化
//! - **core**: 错误类型、对话编排器与构建器
//! - **cache**: 带 TTL 的键值缓存与缓存键
//! - **session**: 会话状态与有界会话存储（LRU / TTL 淘汰）
//! - **dialogue**: 消息分类、分步任务引擎、内容生成
//! - **tools**: 工具 trait、注册表、带缓存的执行器与内置工具
//! - **gateway**: HTTP 与 WebSocket 接入（feature `gateway`）

pub mod cache;
pub mod config;
pub mod core;
pub mod dialogue;
#[cfg(feature = "gateway")]
pub mod gateway;
pub mod observability;
pub mod session;
pub mod tools;

pub use crate::core::{DialogueError, Orchestrator, OrchestratorBuilder};
