use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

/// Keyword arguments passed to a tool, in key order.
pub type ToolArgs = BTreeMap<String, String>;

/// Failures raised while invoking a tool.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("tool not found: '{0}'")]
    NotFound(String),

    #[error("tool '{tool}' failed: {message}")]
    Failed { tool: String, message: String },
}

/// Resolves tool names to callables.
pub trait ToolRegistry {
    fn invoke(&self, name: &str, args: &ToolArgs) -> Result<serde_json::Value, ToolError>;
}

impl<R: ToolRegistry + ?Sized> ToolRegistry for &R {
    fn invoke(&self, name: &str, args: &ToolArgs) -> Result<serde_json::Value, ToolError> {
        (**self).invoke(name, args)
    }
}

impl<R: ToolRegistry + ?Sized> ToolRegistry for Box<R> {
    fn invoke(&self, name: &str, args: &ToolArgs) -> Result<serde_json::Value, ToolError> {
        (**self).invoke(name, args)
    }
}

/// Body of a registered tool. An `Err` carries the failure message.
pub type ToolFn = Box<dyn Fn(&ToolArgs) -> Result<serde_json::Value, String>>;

/// Name-keyed registry of tool closures.
#[derive(Default)]
pub struct Tools {
    tools: HashMap<String, ToolFn>,
}

impl Tools {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in tools.
    pub fn with_stdlib() -> Self {
        let mut tools = Self::new();
        crate::stdlib::register_all(&mut tools);
        tools
    }

    /// Register a tool, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: &str, tool: F)
    where
        F: Fn(&ToolArgs) -> Result<serde_json::Value, String> + 'static,
    {
        self.tools.insert(name.to_string(), Box::new(tool));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl ToolRegistry for Tools {
    fn invoke(&self, name: &str, args: &ToolArgs) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool(args).map_err(|message| ToolError::Failed {
            tool: name.to_string(),
            message,
        })
    }
}
