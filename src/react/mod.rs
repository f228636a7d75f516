//! 认知层：system prompt 组装与单步 Planner（Agent 步）

pub mod planner;
pub mod prompt;

pub use planner::Planner;
pub use prompt::build_system_prompt;
