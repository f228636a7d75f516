//! 工具参数 JSON Schema 生成（schemars）
//!
//! 子 schema 内联展开，避免 `$ref` / `definitions`，部分 OpenAI 兼容端点不解析引用。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::Value;

/// 返回类型 T 的参数 schema（JSON 对象）
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Value::Object(map) = &mut value {
        map.remove("title");
    }
    value
}
