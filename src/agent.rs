//! Headless Agent 运行时
//!
//! 供 REPL / HTTP 前端调用的无界面点单 Agent：
//! from_config 按配置装配存储、菜单、工具、Planner 与编排器，
//! process_turn 对单条用户输入跑一轮状态机并返回结构化结果。

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::core::orchestrator::create_llm_from_config;
use crate::core::{AgentError, Orchestrator, TurnOutcome};
use crate::llm::LlmClient;
use crate::persistence::{
    CheckpointStore, Database, InMemoryCheckpointStore, InMemoryOrderStore, OrderStore,
    SqliteCheckpointStore, SqliteOrderStore,
};
use crate::react::{build_system_prompt, Planner};
use crate::response::StructuredTurnResult;
use crate::tools::{CreateOrderTool, ToolDispatcher, ToolRegistry};

/// 装配好的 Agent：可被多个会话共享（Send + Sync）
pub struct BaristaAgent {
    orchestrator: Orchestrator,
    catalog: Catalog,
}

/// 显式注入的组件（测试与嵌入场景使用）
pub struct AgentParts {
    pub llm: Arc<dyn LlmClient>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub orders: Arc<dyn OrderStore>,
    pub catalog: Catalog,
    pub max_steps: usize,
    pub tool_timeout_secs: u64,
}

impl BaristaAgent {
    pub fn new(parts: AgentParts) -> Self {
        let system_prompt = build_system_prompt(&parts.catalog);
        let planner = Planner::new(parts.llm, system_prompt);
        let registry = ToolRegistry::new(CreateOrderTool::new(parts.orders));
        let dispatcher = ToolDispatcher::new(registry, parts.tool_timeout_secs);
        let orchestrator = Orchestrator::new(planner, dispatcher, parts.checkpoints)
            .with_max_steps(parts.max_steps);
        Self {
            orchestrator,
            catalog: parts.catalog,
        }
    }

    /// 按配置装配：有 database_path 则用 SQLite，否则全部在内存中
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AgentError> {
        let catalog = match &cfg.catalog.path {
            Some(path) => Catalog::from_toml_file(path)
                .map_err(|e| AgentError::ConfigError(format!("{e:#}")))?,
            None => Catalog::default(),
        };

        let (checkpoints, orders): (Arc<dyn CheckpointStore>, Arc<dyn OrderStore>) =
            match &cfg.store.database_path {
                Some(path) => {
                    let db = Database::open(path)?;
                    tracing::info!(path = %path.display(), "using sqlite store");
                    (
                        Arc::new(SqliteCheckpointStore::new(db.clone())),
                        Arc::new(SqliteOrderStore::new(db)),
                    )
                }
                None => {
                    tracing::info!("no database_path configured, conversations are kept in memory");
                    (
                        Arc::new(InMemoryCheckpointStore::new()),
                        Arc::new(InMemoryOrderStore::new()),
                    )
                }
            };

        let agent = Self::new(AgentParts {
            llm: create_llm_from_config(cfg),
            checkpoints,
            orders,
            catalog,
            max_steps: cfg.agent.max_steps,
            tool_timeout_secs: cfg.agent.tool_timeout_secs,
        });
        tracing::info!(
            max_steps = agent.orchestrator.max_steps(),
            tool_timeout_secs = cfg.agent.tool_timeout_secs,
            drinks = agent.catalog.drinks.len(),
            "barista agent ready"
        );
        Ok(agent)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.orchestrator.planner().token_usage()
    }

    /// 处理一条用户输入，返回结构化结果
    pub async fn process_turn(
        &self,
        thread_id: &str,
        query: &str,
    ) -> Result<StructuredTurnResult, AgentError> {
        Ok(self.process_turn_detailed(thread_id, query).await?.result)
    }

    /// 同 process_turn，附带步数、工具轮数与本轮追加的消息
    pub async fn process_turn_detailed(
        &self,
        thread_id: &str,
        query: &str,
    ) -> Result<TurnOutcome, AgentError> {
        if thread_id.trim().is_empty() {
            return Err(AgentError::InvalidRequest("thread id is required".into()));
        }
        if query.trim().is_empty() {
            return Err(AgentError::InvalidRequest("query is required".into()));
        }
        self.orchestrator.run_turn(thread_id, query).await
    }
}
