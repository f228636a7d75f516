//! 状态机定义：阶段与步数预算
//!
//! Agent -> Tools：assistant 消息带工具调用；Agent -> End：不带；Tools -> Agent：全部调用都有结果后。

use serde::Serialize;

use crate::core::AgentError;
use crate::memory::Message;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AgentPhase {
    Agent,
    Tools,
    End,
}

impl AgentPhase {
    /// 根据刚产出的 assistant 消息决定下一阶段
    pub fn after_agent(reply: &Message) -> Self {
        if reply.has_pending_tools() {
            AgentPhase::Tools
        } else {
            AgentPhase::End
        }
    }
}

/// 显式的 Agent 步计数器；超过上限即致命
#[derive(Clone, Debug)]
pub struct StepBudget {
    used: usize,
    max_steps: usize,
}

impl StepBudget {
    pub fn new(max_steps: usize) -> Self {
        Self { used: 0, max_steps }
    }

    /// 在每次 Agent 步之前调用
    pub fn consume(&mut self) -> Result<(), AgentError> {
        if self.used >= self.max_steps {
            return Err(AgentError::StepBudgetExceeded {
                max_steps: self.max_steps,
            });
        }
        self.used += 1;
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.used
    }
}
