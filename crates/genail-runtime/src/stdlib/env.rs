use serde_json::Value;

use super::expect_arg;
use crate::tool::{ToolArgs, Tools};

pub fn register(tools: &mut Tools) {
    tools.register("env", get);
}

/// Read an environment variable. `default` is used when it is unset;
/// without one, an unset variable is a failure.
fn get(args: &ToolArgs) -> Result<Value, String> {
    let name = expect_arg(args, "name")?;
    match std::env::var(name) {
        Ok(val) => Ok(Value::String(val)),
        Err(_) => match args.get("default") {
            Some(default) => Ok(Value::String(default.clone())),
            None => Err(format!("missing environment variable: {}", name)),
        },
    }
}
