use serde_json::Value;

use super::expect_arg;
use crate::tool::{ToolArgs, Tools};

pub fn register(tools: &mut Tools) {
    tools.register("upper", upper);
    tools.register("lower", lower);
    tools.register("trim", trim);
    tools.register("replace", replace);
    tools.register("length", length);
    tools.register("count_tokens", count_tokens);
}

fn upper(args: &ToolArgs) -> Result<Value, String> {
    Ok(Value::String(expect_arg(args, "text")?.to_uppercase()))
}

fn lower(args: &ToolArgs) -> Result<Value, String> {
    Ok(Value::String(expect_arg(args, "text")?.to_lowercase()))
}

fn trim(args: &ToolArgs) -> Result<Value, String> {
    Ok(Value::String(expect_arg(args, "text")?.trim().to_string()))
}

fn replace(args: &ToolArgs) -> Result<Value, String> {
    let text = expect_arg(args, "text")?;
    let from = expect_arg(args, "from")?;
    let to = expect_arg(args, "to")?;
    if from.is_empty() {
        return Err("argument 'from' must not be empty".to_string());
    }
    Ok(Value::String(text.replace(from, to)))
}

/// Length in characters.
fn length(args: &ToolArgs) -> Result<Value, String> {
    Ok(serde_json::json!(expect_arg(args, "text")?.chars().count()))
}

/// Approximate token count: words * 4/3, rounded up.
fn count_tokens(args: &ToolArgs) -> Result<Value, String> {
    let words = expect_arg(args, "text")?.split_whitespace().count();
    let approx = (words as f64 * 4.0 / 3.0).ceil() as u64;
    Ok(serde_json::json!(approx))
}
