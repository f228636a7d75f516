//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 DeepSeek、OpenAI、自建代理等。
//! 对话日志中的工具调用 / 工具结果按 chat-completions 的 tool_calls / tool 消息格式往返映射。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::memory::{Message, Role, ToolInvocation};
use crate::tools::ToolSpec;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端：持有 Client、model 名与单次请求超时
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    request_timeout: Duration,
    /// 累计 token 使用统计
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            request_timeout: Duration::from_secs(60),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs);
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<Message, LlmError> {
        let messages = to_openai_messages(request.system, request.messages).map_err(map_error)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(request.temperature);
        if !request.tools.is_empty() {
            let tools = request
                .tools
                .iter()
                .map(to_openai_tool)
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_error)?;
            args.tools(tools);
        }
        let body = args.build().map_err(map_error)?;

        let secs = self.request_timeout.as_secs();
        let response = tokio::time::timeout(self.request_timeout, self.client.chat().create(body))
            .await
            .map_err(|_| LlmError::Timeout(secs))?
            .map_err(map_error)?;

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))?;

        let content = choice.message.content.unwrap_or_default();
        let invocations: Vec<ToolInvocation> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // 参数在此层不校验：非法 JSON 原样保留，由工具注册表报告校验失败
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(Value::String(tc.function.arguments));
                ToolInvocation::new(tc.id, tc.function.name, arguments)
            })
            .collect();

        Ok(Message::assistant_with_tools(content, invocations))
    }
}

fn to_openai_tool(spec: &ToolSpec) -> Result<ChatCompletionTool, OpenAIError> {
    let function = FunctionObjectArgs::default()
        .name(spec.name.clone())
        .description(spec.description.clone())
        .parameters(spec.parameters.clone())
        .build()?;
    ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(function)
        .build()
}

fn to_openai_messages(
    system: &str,
    messages: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system.to_string())
            .build()?,
    ));
    for m in messages {
        let converted = match m.role() {
            Role::Human => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content().to_string())
                    .build()?,
            ),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !m.content().is_empty() {
                    builder.content(m.content().to_string());
                }
                if m.has_pending_tools() {
                    let calls = m
                        .tool_invocations()
                        .iter()
                        .map(|inv| ChatCompletionMessageToolCall {
                            id: inv.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: inv.name.clone(),
                                arguments: match &inv.arguments {
                                    Value::String(raw) => raw.clone(),
                                    other => other.to_string(),
                                },
                            },
                        })
                        .collect::<Vec<_>>();
                    builder.tool_calls(calls);
                }
                ChatCompletionRequestMessage::Assistant(builder.build()?)
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(
                ChatCompletionRequestToolMessageArgs::default()
                    .content(m.content().to_string())
                    .tool_call_id(m.tool_call_id().unwrap_or_default().to_string())
                    .build()?,
            ),
        };
        out.push(converted);
    }
    Ok(out)
}

fn map_error(e: OpenAIError) -> LlmError {
    match e {
        OpenAIError::Reqwest(inner) => LlmError::Network(inner.to_string()),
        OpenAIError::ApiError(api) => {
            let lower = api.message.to_lowercase();
            if lower.contains("rate limit") || lower.contains("quota") {
                LlmError::RateLimited(api.message)
            } else {
                LlmError::ApiError(api.message)
            }
        }
        OpenAIError::JSONDeserialize(inner) => LlmError::InvalidResponse(inner.to_string()),
        other => LlmError::ApiError(other.to_string()),
    }
}
