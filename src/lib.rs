//! Barista - 咖啡点单对话 Agent
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（供 REPL / HTTP 调用）
//! - **catalog**: 菜单（饮品与可选项）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排状态机、步数预算、会话监管、错误
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话消息与只追加日志
//! - **persistence**: checkpoint 与订单存储（内存 / SQLite）
//! - **react**: Planner 与 system prompt
//! - **response**: 结构化回复提取
//! - **tools**: create_order 工具、注册表与分发器
//! - **web**: HTTP 路由（feature = "web"）

pub mod agent;
pub mod catalog;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod persistence;
pub mod react;
pub mod response;
pub mod tools;
#[cfg(feature = "web")]
pub mod web;

pub use agent::{AgentParts, BaristaAgent};
pub use response::{Progress, StructuredTurnResult};
