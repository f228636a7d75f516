//! 工具注册表
//!
//! 每个工具实现 Tool trait：强类型参数（serde 反序列化 + schemars 生成 schema）、
//! 先 validate 再 execute。ToolRegistry 是编译期固定的 name -> 工具映射，
//! 未知名称走显式的 UnknownTool 分支（模型可读的错误，而非致命错误）。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::tools::create_order::CreateOrderTool;
use crate::tools::schema::parameters_schema;

/// 工具失败；Display 文本即写回给模型的 tool-result 内容
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Error: unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error("Error: invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{0}")]
    Failed(String),

    #[error("Error: {tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
}

/// 绑定给模型的工具声明（name / description / JSON Schema 参数）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具 trait：名称、描述（供 LLM 理解）、强类型参数、校验与异步执行
#[async_trait]
pub trait Tool: Send + Sync {
    type Args: DeserializeOwned + JsonSchema + Send + 'static;

    /// 工具名称（模型 tool call 中的 name）
    fn name(&self) -> &'static str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &'static str;

    /// 参数校验；在任何副作用之前执行
    fn validate(&self, args: &Self::Args) -> Result<(), String>;

    /// 执行工具（参数已通过校验）
    async fn execute(&self, args: Self::Args) -> Result<String, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: parameters_schema::<Self::Args>(),
        }
    }

    /// 反序列化 + 校验；任一失败都转为 InvalidArguments
    fn decode(&self, raw: &Value) -> Result<Self::Args, ToolError> {
        let args: Self::Args =
            serde_json::from_value(raw.clone()).map_err(|e| ToolError::InvalidArguments {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;
        self.validate(&args).map_err(|reason| ToolError::InvalidArguments {
            tool: self.name().to_string(),
            reason,
        })?;
        Ok(args)
    }
}

/// 已知工具种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    CreateOrder,
}

impl ToolKind {
    pub const ALL: [ToolKind; 1] = [ToolKind::CreateOrder];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::CreateOrder => "create_order",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// 工具注册表：每个 ToolKind 对应一个具体工具实例
pub struct ToolRegistry {
    create_order: CreateOrderTool,
}

impl ToolRegistry {
    pub fn new(create_order: CreateOrderTool) -> Self {
        Self { create_order }
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        ToolKind::ALL.iter().map(|k| k.name()).collect()
    }

    /// 绑定给模型的全部工具声明
    pub fn specs(&self) -> Vec<ToolSpec> {
        ToolKind::ALL
            .iter()
            .map(|k| match k {
                ToolKind::CreateOrder => self.create_order.spec(),
            })
            .collect()
    }

    /// 按名称解析、校验并执行
    pub async fn execute(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        match ToolKind::from_name(name) {
            Some(ToolKind::CreateOrder) => run(&self.create_order, args).await,
            None => Err(ToolError::UnknownTool {
                name: name.to_string(),
                available: self.tool_names().join(", "),
            }),
        }
    }
}

async fn run<T: Tool>(tool: &T, raw: &Value) -> Result<String, ToolError> {
    let args = tool.decode(raw)?;
    tool.execute(args).await
}
