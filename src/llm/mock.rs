//! Mock / Scripted LLM 客户端（无需 API）
//!
//! - MockLlmClient：离线演示用，回显最后一条用户消息并给出合法的结构化回复块。
//! - ScriptedLlmClient：测试用，按顺序回放预置的 assistant 消息并记录每次请求。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Message, LlmError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Human)
            .map(|m| m.content())
            .unwrap_or("(no input)");

        let payload = serde_json::json!({
            "message": format!("Echo from Mock: {}", last_user),
            "current_order": {
                "drink": "unknown",
                "size": "unknown",
                "milk": "unknown",
                "syrup": "unknown",
                "sweetener": "unknown",
                "toppings": "unknown",
                "quantity": "unknown"
            },
            "suggestions": ["I want a latte", "Show me the menu"],
            "progress": "in_progress"
        });
        Ok(Message::assistant(format!("```json\n{}\n```", payload)))
    }
}

enum Script {
    Queue(VecDeque<Message>),
    Repeat(Message),
}

/// 回放客户端：按顺序返回预置消息；Repeat 模式下每次都返回同一条
pub struct ScriptedLlmClient {
    script: Mutex<Script>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            script: Mutex::new(Script::Queue(replies.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(reply: Message) -> Self {
        Self {
            script: Mutex::new(Script::Repeat(reply)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 已发生的调用次数
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 每次调用时模型看到的对话日志（不含 system）
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Message, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.messages.to_vec());

        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *script {
            Script::Queue(queue) => queue
                .pop_front()
                .ok_or_else(|| LlmError::ApiError("scripted replies exhausted".to_string())),
            Script::Repeat(reply) => Ok(reply.clone()),
        }
    }
}
