//! GenAIL runtime: executes parsed scripts against an environment, a
//! generation provider and a tool registry.

pub mod environment;
pub mod error;
pub mod interpreter;
pub mod provider;
pub mod providers;
pub mod stdlib;
pub mod template;
pub mod tool;
pub mod value;

pub use environment::Environment;
pub use error::{ErrorKind, RuntimeError};
pub use interpreter::{Interpreter, RunOutput};
pub use provider::{
    provider_from_config, GenerateInput, GenerateOptions, GenerateRequest, MockProvider, Provider,
    ProviderError,
};
pub use tool::{ToolArgs, ToolError, ToolRegistry, Tools};
pub use value::{Message, Value};

/// Parse and execute a script, returning its printed lines and final
/// environment.
pub fn run<'a>(
    source: &str,
    provider: impl Provider + 'a,
    tools: impl ToolRegistry + 'a,
) -> error::Result<RunOutput> {
    let mut interpreter = Interpreter::new(provider, tools);
    interpreter.run(source)?;
    Ok(interpreter.into_output())
}
