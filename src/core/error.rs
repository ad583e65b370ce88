//! 核心错误类型
//!
//! 分类与任务模板生成是全函数，不会失败；只有工具调度有错误路径。
//! 所有错误都同步返回给直接调用方，核心层从不重试。

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogueError {
    /// 未注册的工具名
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// 工具自身逻辑报错（含未自行降级的网络错误），不缓存、不重试
    #[error("Tool '{tool}' execution failed: {message}")]
    ToolExecutionFailed { tool: String, message: String },
}
