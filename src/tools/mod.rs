//! 工具层：强类型工具、固定注册表、分发器

pub mod create_order;
pub mod executor;
pub mod registry;
pub mod schema;

pub use create_order::{
    CreateOrderArgs, CreateOrderTool, Order, MAX_QUANTITY, MIN_QUANTITY, ORDER_FAILURE,
    ORDER_SUCCESS,
};
pub use executor::ToolDispatcher;
pub use registry::{Tool, ToolError, ToolKind, ToolRegistry, ToolSpec};
pub use schema::parameters_schema;
