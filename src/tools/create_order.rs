//! create_order 工具：校验订单并交给订单存储落库
//!
//! 参数线格式为 `{"order": {drink, size, mil, syrup, sweeteners, toppings, quantity}}`。
//! `mil` / `sweeteners` 是与模型约定的字段名，保持原样，不要改成 milk / sweetener，
//! 否则 prompt 中的 schema 与工具参数会对不上。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::persistence::OrderStore;
use crate::tools::{Tool, ToolError};

/// 下单成功时返回给模型的固定文本
pub const ORDER_SUCCESS: &str = "Order created successfully.";
/// 下单失败文本前缀；后面附失败原因
pub const ORDER_FAILURE: &str = "Failed to create order.";

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 10;

/// 一笔订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Order {
    /// Drink name exactly as listed on the menu
    pub drink: String,
    /// Cup size, or "none" if the drink has no size option
    pub size: String,
    /// Milk choice, or "none"
    #[serde(rename = "mil")]
    pub milk: String,
    /// Syrup choice, or "none"
    pub syrup: String,
    /// Sweetener choice, or "none"
    #[serde(rename = "sweeteners")]
    pub sweetener: String,
    /// Toppings, or "none"
    pub toppings: String,
    /// Number of drinks, between 1 and 10
    #[schemars(range(min = 1, max = 10))]
    pub quantity: i64,
}

impl Order {
    /// 数量须在 [1, 10]，所有字符串字段非空
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(format!(
                "quantity must be between {MIN_QUANTITY} and {MAX_QUANTITY}, got {}",
                self.quantity
            ));
        }
        let fields = [
            ("drink", &self.drink),
            ("size", &self.size),
            ("mil", &self.milk),
            ("syrup", &self.syrup),
            ("sweeteners", &self.sweetener),
            ("toppings", &self.toppings),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("field '{name}' must not be empty"));
        }
        Ok(())
    }
}

/// create_order 的参数包装
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateOrderArgs {
    pub order: Order,
}

/// 下单工具：持有注入的订单存储
pub struct CreateOrderTool {
    store: Arc<dyn OrderStore>,
}

impl CreateOrderTool {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateOrderTool {
    type Args = CreateOrderArgs;

    fn name(&self) -> &'static str {
        "create_order"
    }

    fn description(&self) -> &'static str {
        "Place the customer's drink order. Only call this after the customer has explicitly confirmed every detail of the order."
    }

    fn validate(&self, args: &CreateOrderArgs) -> Result<(), String> {
        args.order.validate()
    }

    async fn execute(&self, args: CreateOrderArgs) -> Result<String, ToolError> {
        match self.store.save_order(&args.order).await {
            Ok(id) => {
                tracing::info!(order_id = id, drink = %args.order.drink, quantity = args.order.quantity, "order created");
                Ok(ORDER_SUCCESS.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "order persistence failed");
                Err(ToolError::Failed(format!("{ORDER_FAILURE} Reason: {e}")))
            }
        }
    }
}
