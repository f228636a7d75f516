//! 对话日志：消息与只追加的 MessageLog
//!
//! 一个 thread 拥有一份 MessageLog；新轮次只能追加，不能重排或原地修改。
//! Message 创建后不可变（字段私有，只读访问）。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（持久化时以小写字符串存储）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Role::Human),
            "assistant" => Some(Role::Assistant),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }
}

/// 模型发起的一次工具调用：id 在所属消息内唯一，arguments 在此层不做类型约束
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_invocations: Vec<ToolInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
            tool_invocations: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::assistant_with_tools(content, Vec::new())
    }

    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_invocations: Vec<ToolInvocation>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_invocations,
            tool_call_id: None,
        }
    }

    /// 工具结果消息，tool_call_id 指回它所回答的那次调用
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_invocations: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// 从持久化字段重建；用于 checkpoint 加载
    pub(crate) fn from_parts(
        role: Role,
        content: String,
        tool_invocations: Vec<ToolInvocation>,
        tool_call_id: Option<String>,
    ) -> Self {
        Self {
            role,
            content,
            tool_invocations,
            tool_call_id,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn tool_invocations(&self) -> &[ToolInvocation] {
        &self.tool_invocations
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }

    pub fn has_pending_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_invocations.is_empty()
    }
}

/// 只追加的消息日志：插入顺序有意义，归属于单个会话
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn append(&mut self, msgs: impl IntoIterator<Item = Message>) {
        self.messages.extend(msgs);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// 从 index 开始的尾部（用于取出本轮新增的消息）
    pub fn since(&self, index: usize) -> &[Message] {
        self.messages.get(index..).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
