//! Planner：单个 Agent 步
//!
//! 输入完整对话日志 + 固定 system 指令（绑定工具声明），调用 LLM，产出恰好一条 assistant 消息。
//! 除一次模型调用外无副作用；模型失败直接向上传播，不在此吞掉。

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::memory::{Message, MessageLog, Role, ToolInvocation};
use crate::tools::ToolSpec;

/// Agent 步的采样温度，固定不可配置
pub const AGENT_TEMPERATURE: f32 = 0.0;

/// Planner：持有 LLM 与 system prompt
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    pub async fn step(&self, log: &MessageLog, tools: &[ToolSpec]) -> Result<Message, AgentError> {
        let request = CompletionRequest {
            system: &self.system_prompt,
            messages: log.all(),
            tools,
            temperature: AGENT_TEMPERATURE,
        };
        let reply = self.llm.complete(&request).await?;
        Ok(normalize(reply)?)
    }
}

/// 保证输出是 assistant 消息、调用 id 非空且在消息内唯一
fn normalize(reply: Message) -> Result<Message, LlmError> {
    if reply.role() != Role::Assistant {
        return Err(LlmError::InvalidResponse(format!(
            "expected assistant message, got {}",
            reply.role().as_str()
        )));
    }
    if !reply.has_pending_tools() {
        return Ok(reply);
    }

    let mut seen = HashSet::new();
    let mut invocations = Vec::with_capacity(reply.tool_invocations().len());
    for inv in reply.tool_invocations() {
        let id = if inv.id.trim().is_empty() {
            format!("call_{}", uuid::Uuid::new_v4().simple())
        } else {
            inv.id.clone()
        };
        if !seen.insert(id.clone()) {
            return Err(LlmError::InvalidResponse(format!(
                "duplicate tool call id '{id}'"
            )));
        }
        invocations.push(ToolInvocation::new(id, inv.name.clone(), inv.arguments.clone()));
    }
    Ok(Message::assistant_with_tools(reply.content(), invocations))
}
