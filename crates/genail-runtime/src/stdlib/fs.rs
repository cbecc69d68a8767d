use serde_json::Value;

use super::expect_arg;
use crate::tool::{ToolArgs, Tools};

pub fn register(tools: &mut Tools) {
    tools.register("read_file", read_file);
}

fn read_file(args: &ToolArgs) -> Result<Value, String> {
    let path = expect_arg(args, "path")?;
    std::fs::read_to_string(path)
        .map(Value::String)
        .map_err(|e| format!("cannot read '{}': {}", path, e))
}
