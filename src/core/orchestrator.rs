//! 编排器：单轮状态机
//!
//! 一轮 = 获取 thread 锁 -> 加载 checkpoint -> 追加用户消息 ->
//! (Agent 步 -> 可能的工具分发) 循环至 End 或步数耗尽 -> 一次性追加本轮新消息 -> 提取结构化回复。
//! 任何致命条件发生在 End 之前时，本轮不写 checkpoint。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, AgentPhase, SessionSupervisor, StepBudget};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::memory::{Message, MessageLog, Role};
use crate::persistence::CheckpointStore;
use crate::react::Planner;
use crate::response::{extract_structured, Progress, StructuredTurnResult};
use crate::tools::{ToolDispatcher, ORDER_SUCCESS};

/// 默认步数上限
pub const DEFAULT_MAX_STEPS: usize = 15;

/// 一轮的结果：结构化回复 + 统计信息
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub result: StructuredTurnResult,
    /// 本轮 Agent 步数
    pub steps: usize,
    /// 本轮 Agent -> Tools 转移次数
    pub tool_rounds: usize,
    /// 本轮追加到 checkpoint 的消息（首条为用户消息）
    pub appended: Vec<Message>,
}

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let timeout = cfg.llm.timeouts.request;
    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .unwrap_or_else(|| cfg.llm.model.clone());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)).with_request_timeout(timeout))
    } else if use_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        let base = cfg.llm.base_url.as_deref();
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(
            OpenAiClient::new(base, &model, std::env::var("OPENAI_API_KEY").ok().as_deref())
                .with_request_timeout(timeout),
        )
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

pub struct Orchestrator {
    planner: Planner,
    dispatcher: ToolDispatcher,
    checkpoints: Arc<dyn CheckpointStore>,
    supervisor: SessionSupervisor,
    max_steps: usize,
}

impl Orchestrator {
    pub fn new(
        planner: Planner,
        dispatcher: ToolDispatcher,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            planner,
            dispatcher,
            checkpoints,
            supervisor: SessionSupervisor::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// 处理一轮用户输入
    pub async fn run_turn(&self, thread_id: &str, query: &str) -> Result<TurnOutcome, AgentError> {
        let _guard = self.supervisor.acquire(thread_id).await;

        let mut log = self.checkpoints.load(thread_id).await?;
        let start = log.len();
        tracing::info!(thread_id, history = start, "turn started");
        log.push(Message::human(query));

        let (steps, tool_rounds) = match self.run_rounds(&mut log).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::error!(thread_id, kind = e.kind(), error = %e, "turn failed");
                return Err(e);
            }
        };

        let appended = log.since(start).to_vec();
        if let Err(e) = self.checkpoints.append(thread_id, &appended).await {
            tracing::error!(thread_id, kind = "checkpoint", error = %e, "turn failed");
            return Err(e.into());
        }

        let final_text = log
            .last()
            .filter(|m| m.role() == Role::Assistant)
            .map(|m| m.content())
            .unwrap_or_default();
        let mut result = extract_structured(final_text).map_err(|e| {
            tracing::error!(thread_id, kind = "extraction", error = %e, "turn failed");
            AgentError::from(e)
        })?;
        reconcile_progress(thread_id, &mut result, log.since(start));

        tracing::info!(
            thread_id,
            steps,
            tool_rounds,
            progress = ?result.progress,
            "turn finished"
        );
        Ok(TurnOutcome {
            result,
            steps,
            tool_rounds,
            appended,
        })
    }

    /// 状态机主循环；返回 (Agent 步数, 工具轮数)
    async fn run_rounds(&self, log: &mut MessageLog) -> Result<(usize, usize), AgentError> {
        let specs = self.dispatcher.specs();
        let mut budget = StepBudget::new(self.max_steps);
        let mut tool_rounds = 0;
        let mut phase = AgentPhase::Agent;

        loop {
            match phase {
                AgentPhase::Agent => {
                    budget.consume()?;
                    let reply = self.planner.step(log, &specs).await?;
                    phase = AgentPhase::after_agent(&reply);
                    tracing::debug!(step = budget.used(), next = ?phase, tools = reply.tool_invocations().len(), "agent step");
                    log.push(reply);
                }
                AgentPhase::Tools => {
                    tool_rounds += 1;
                    let results = match log.last() {
                        Some(pending) => self.dispatcher.dispatch(pending).await,
                        None => Vec::new(),
                    };
                    log.append(results);
                    phase = AgentPhase::Agent;
                }
                AgentPhase::End => return Ok((budget.used(), tool_rounds)),
            }
        }
    }
}

/// 给定消息中是否有下单成功的工具结果
pub fn has_successful_order(messages: &[Message]) -> bool {
    messages
        .iter()
        .any(|m| m.role() == Role::Tool && m.content() == ORDER_SUCCESS)
}

/// 模型声称 completed 但本轮没有下单成功时，降级为 in_progress（只看本轮消息）
fn reconcile_progress(thread_id: &str, result: &mut StructuredTurnResult, turn: &[Message]) {
    if result.progress == Progress::Completed && !has_successful_order(turn) {
        tracing::warn!(
            thread_id,
            "model reported completed without a successful order this turn, reporting in_progress"
        );
        result.progress = Progress::InProgress;
    }
}
