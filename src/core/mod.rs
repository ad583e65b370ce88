//! 核心层：错误类型、对话编排器及其构建器

pub mod builder;
pub mod error;
pub mod orchestrator;

pub use builder::OrchestratorBuilder;
pub use error::DialogueError;
pub use orchestrator::Orchestrator;
