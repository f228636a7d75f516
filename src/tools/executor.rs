//! 工具分发器
//!
//! 持有 ToolRegistry 与单次调用超时。对 assistant 消息上的每个工具调用按顺序执行，
//! 每个调用恰好产生一条 tool-result 消息（tool_call_id 指回调用 id）。
//! 未知工具、参数校验失败、执行失败与超时都在这里转为失败文本写回对话，绝不中断本轮；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::memory::{Message, ToolInvocation};
use crate::tools::{ToolError, ToolRegistry, ToolSpec};

pub struct ToolDispatcher {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }

    /// 执行消息上的全部待处理调用，结果顺序与调用顺序一致
    pub async fn dispatch(&self, message: &Message) -> Vec<Message> {
        let mut results = Vec::with_capacity(message.tool_invocations().len());
        for invocation in message.tool_invocations() {
            let content = match self.execute(invocation).await {
                Ok(content) => content,
                Err(e) => e.to_string(),
            };
            results.push(Message::tool_result(invocation.id.clone(), content));
        }
        results
    }

    /// 执行单个调用；超时返回 ToolError::Timeout
    pub async fn execute(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        let start = Instant::now();
        let result = timeout(
            self.timeout,
            self.registry.execute(&invocation.name, &invocation.arguments),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ToolError::Timeout {
                tool: invocation.name.clone(),
                secs: self.timeout.as_secs(),
            })
        });

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ToolError::UnknownTool { .. }) => "unknown_tool",
            Err(ToolError::InvalidArguments { .. }) => "invalid_arguments",
            Err(ToolError::Failed(_)) => "error",
            Err(ToolError::Timeout { .. }) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": invocation.name,
            "call_id": invocation.id,
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&invocation.arguments),
        });
        if result.is_ok() {
            tracing::info!(audit = %audit, "tool");
        } else {
            tracing::warn!(audit = %audit, "tool");
        }

        result
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
