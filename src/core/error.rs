//! 轮次级错误类型
//!
//! 只有致命条件才会成为 AgentError；工具查找 / 参数校验 / 执行失败在分发器内被吸收为 tool-result。
//! kind() 给运维日志区分「模型出错」「循环跑太久」「输出不合约」「落库失败」。

use thiserror::Error;

use crate::llm::LlmError;
use crate::persistence::StoreError;
use crate::response::ExtractionError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 模型持续请求工具，超过步数上限
    #[error("step budget exhausted: the turn needed more than {max_steps} agent steps")]
    StepBudgetExceeded { max_steps: usize },

    #[error("structured response extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] StoreError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Llm(_) => "model",
            AgentError::StepBudgetExceeded { .. } => "step_budget",
            AgentError::Extraction(_) => "extraction",
            AgentError::Checkpoint(_) => "checkpoint",
            AgentError::InvalidRequest(_) => "invalid_request",
            AgentError::ConfigError(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct_for_model_and_budget() {
        let model = AgentError::from(LlmError::Timeout(60));
        let budget = AgentError::StepBudgetExceeded { max_steps: 15 };
        assert_eq!(model.kind(), "model");
        assert_eq!(budget.kind(), "step_budget");
        assert!(budget.to_string().contains("15"));
    }

    #[test]
    fn test_store_error_converts() {
        let err: AgentError = StoreError::LockPoisoned.into();
        assert_eq!(err.kind(), "checkpoint");
    }
}
