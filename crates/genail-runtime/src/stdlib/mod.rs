//! Built-in tools available to `call` statements.
//!
//! Tools are grouped by concern and registered under flat names
//! (`upper`, `read_file`, `json_get`, ...).

pub mod env;
pub mod fs;
pub mod json;
pub mod string;

use crate::tool::{ToolArgs, Tools};

/// Register every built-in tool.
pub fn register_all(tools: &mut Tools) {
    string::register(tools);
    env::register(tools);
    fs::register(tools);
    json::register(tools);
}

/// Fetch a required argument or report which one is missing.
fn expect_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument '{}'", key))
}
