//! 核心编排层：错误、状态机、会话监管、单轮编排

pub mod error;
pub mod orchestrator;
pub mod session_supervisor;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{has_successful_order, Orchestrator, TurnOutcome, DEFAULT_MAX_STEPS};
pub use session_supervisor::SessionSupervisor;
pub use state::{AgentPhase, StepBudget};
