//! 记忆层：对话消息与只追加日志

pub mod conversation;

pub use conversation::{Message, MessageLog, Role, ToolInvocation};
