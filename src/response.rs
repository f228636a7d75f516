//! 结构化回复提取
//!
//! 模型最终回复中必须包含一个围栏 JSON 块（```json ... ```），解析为 StructuredTurnResult；
//! 有多个时取最后一个。
//! 找不到块或解析失败即为本轮致命错误，不生成任何默认 payload。
//! current_order 中缺失 / null / 空串 / "unknown" 的字段一律记为 Unknown，序列化为 "unknown"。

use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

const UNKNOWN: &str = "unknown";
const PREVIEW_CHARS: usize = 160;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("no fenced JSON block in model output: {preview}")]
    MissingBlock { preview: String },

    #[error("structured block is not valid JSON ({reason}): {preview}")]
    InvalidJson { reason: String, preview: String },

    #[error("structured block is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("structured block field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// 订单进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    InProgress,
    Completed,
}

impl Progress {
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "in_progress" => Some(Progress::InProgress),
            "completed" => Some(Progress::Completed),
            _ => None,
        }
    }
}

/// 订单字段：已知值或显式的 unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderField<T> {
    Known(T),
    Unknown,
}

impl<T: Serialize> Serialize for OrderField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OrderField::Known(v) => v.serialize(serializer),
            OrderField::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

/// 当前（可能不完整的）订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentOrder {
    pub drink: OrderField<String>,
    pub size: OrderField<String>,
    pub milk: OrderField<String>,
    pub syrup: OrderField<String>,
    pub sweetener: OrderField<String>,
    pub toppings: OrderField<String>,
    pub quantity: OrderField<i64>,
}

impl Default for CurrentOrder {
    fn default() -> Self {
        Self {
            drink: OrderField::Unknown,
            size: OrderField::Unknown,
            milk: OrderField::Unknown,
            syrup: OrderField::Unknown,
            sweetener: OrderField::Unknown,
            toppings: OrderField::Unknown,
            quantity: OrderField::Unknown,
        }
    }
}

/// 每轮返回给调用方的结构化结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredTurnResult {
    pub message: String,
    pub current_order: CurrentOrder,
    pub suggestions: Vec<String>,
    pub progress: Progress,
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        // 惰性匹配到最近的闭合围栏，块之间不会相互跨越
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n?(.*?)```").expect("fence regex is valid")
    })
}

/// 取出最后一个以 `{` 开头的围栏块内容
pub fn find_structured_block(text: &str) -> Option<&str> {
    fence_regex()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|body| body.starts_with('{'))
        .last()
}

/// 解析 assistant 最终回复文本
pub fn extract_structured(text: &str) -> Result<StructuredTurnResult, ExtractionError> {
    let block = find_structured_block(text).ok_or_else(|| ExtractionError::MissingBlock {
        preview: preview(text),
    })?;

    let value: Value = serde_json::from_str(block).map_err(|e| ExtractionError::InvalidJson {
        reason: e.to_string(),
        preview: preview(block),
    })?;
    let obj = value.as_object().ok_or_else(|| ExtractionError::InvalidJson {
        reason: "top-level value is not an object".to_string(),
        preview: preview(block),
    })?;

    let message = match obj.get("message") {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => return Err(ExtractionError::MissingField("message")),
        Some(other) => return Err(invalid("message", format!("expected string, got {other}"))),
    };

    let progress = match obj.get("progress") {
        Some(Value::String(s)) => Progress::parse(s)
            .ok_or_else(|| invalid("progress", format!("unsupported value '{s}'")))?,
        None | Some(Value::Null) => return Err(ExtractionError::MissingField("progress")),
        Some(other) => return Err(invalid("progress", format!("expected string, got {other}"))),
    };

    let suggestions = match obj.get("suggestions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid("suggestions", format!("expected strings, got {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(invalid("suggestions", format!("expected array, got {other}"))),
    };

    let current_order = match obj.get("current_order") {
        None | Some(Value::Null) => CurrentOrder::default(),
        Some(Value::Object(map)) => parse_order(map)?,
        Some(other) => {
            return Err(invalid("current_order", format!("expected object, got {other}")))
        }
    };

    Ok(StructuredTurnResult {
        message,
        current_order,
        suggestions,
        progress,
    })
}

fn parse_order(map: &Map<String, Value>) -> Result<CurrentOrder, ExtractionError> {
    // 模型偶尔沿用工具参数里的 mil / sweeteners 字段名
    let get = |primary: &str, alias: &str| map.get(primary).or_else(|| map.get(alias));
    Ok(CurrentOrder {
        drink: text_field("drink", map.get("drink"))?,
        size: text_field("size", map.get("size"))?,
        milk: text_field("milk", get("milk", "mil"))?,
        syrup: text_field("syrup", map.get("syrup"))?,
        sweetener: text_field("sweetener", get("sweetener", "sweeteners"))?,
        toppings: text_field("toppings", map.get("toppings"))?,
        quantity: quantity_field(map.get("quantity"))?,
    })
}

fn is_unknown(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case(UNKNOWN)
}

fn text_field(
    field: &'static str,
    value: Option<&Value>,
) -> Result<OrderField<String>, ExtractionError> {
    match value {
        None | Some(Value::Null) => Ok(OrderField::Unknown),
        Some(Value::String(s)) if is_unknown(s) => Ok(OrderField::Unknown),
        Some(Value::String(s)) => Ok(OrderField::Known(s.trim().to_string())),
        Some(Value::Array(items)) => {
            // 配料有时以列表给出
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if parts.len() != items.len() {
                return Err(invalid(field, "list items must be strings".to_string()));
            }
            if parts.is_empty() {
                Ok(OrderField::Unknown)
            } else {
                Ok(OrderField::Known(parts.join(", ")))
            }
        }
        Some(other) => Err(invalid(field, format!("expected string, got {other}"))),
    }
}

fn quantity_field(value: Option<&Value>) -> Result<OrderField<i64>, ExtractionError> {
    match value {
        None | Some(Value::Null) => Ok(OrderField::Unknown),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(OrderField::Known)
            .ok_or_else(|| invalid("quantity", format!("expected integer, got {n}"))),
        Some(Value::String(s)) if is_unknown(s) => Ok(OrderField::Unknown),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(OrderField::Known)
            .map_err(|_| invalid("quantity", format!("expected integer, got '{s}'"))),
        Some(other) => Err(invalid("quantity", format!("expected integer, got {other}"))),
    }
}

fn invalid(field: &'static str, reason: String) -> ExtractionError {
    ExtractionError::InvalidField { field, reason }
}

fn preview(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}
