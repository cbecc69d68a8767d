use std::collections::BTreeMap;

use crate::error::{Result, RuntimeError};
use crate::value::{Message, Value};

/// Name of the distinguished conversation variable.
pub const MESSAGES: &str = "messages";

/// Mutable state of one script run: variable bindings, the active model and
/// the accumulated conversation.
///
/// `messages` is bound from the start and can only grow through
/// [`Environment::push_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    variables: BTreeMap<String, Value>,
    model: Option<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        let mut variables = BTreeMap::new();
        variables.insert(MESSAGES.to_string(), Value::MessageList(Vec::new()));
        Environment {
            variables,
            model: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Read a variable, failing if it was never written.
    pub fn lookup(&self, name: &str) -> Result<&Value> {
        self.variables
            .get(name)
            .ok_or_else(|| RuntimeError::undefined(name))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Fails if `name` may not be the target of an assignment.
    pub fn check_writable(&self, name: &str) -> Result<()> {
        if name == MESSAGES {
            return Err(RuntimeError::invalid(
                "'messages' is reserved and can only be extended with `message`",
            ));
        }
        Ok(())
    }

    /// Bind (or overwrite) a variable. `messages` cannot be rebound.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        self.check_writable(name)?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn push_message(&mut self, message: Message) {
        if let Some(Value::MessageList(list)) = self.variables.get_mut(MESSAGES) {
            list.push(message);
        }
    }

    pub fn messages(&self) -> &[Message] {
        match self.variables.get(MESSAGES) {
            Some(Value::MessageList(list)) => list,
            _ => &[],
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    /// JSON snapshot: `{"model": ..., "variables": {...}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let variables: serde_json::Map<String, serde_json::Value> = self
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::json!({
            "model": self.model,
            "variables": variables,
        })
    }
}
