use serde_json::Value;

use super::expect_arg;
use crate::tool::{ToolArgs, Tools};

pub fn register(tools: &mut Tools) {
    tools.register("json_get", json_get);
}

/// Extract a value from a JSON document by dotted path (`a.b.0.c`).
/// Array elements are addressed by index.
fn json_get(args: &ToolArgs) -> Result<Value, String> {
    let source = expect_arg(args, "json")?;
    let path = expect_arg(args, "path")?;
    let doc: Value =
        serde_json::from_str(source).map_err(|e| format!("invalid JSON: {}", e))?;

    let mut current = &doc;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| format!("path '{}' not found", path))?;
    }
    Ok(current.clone())
}
