use genail_common::GenerateDefaults;
use genail_parser::{CallStmt, GenerateStmt, PrintOperand, Statement, StatementKind};

use crate::environment::Environment;
use crate::error::{Result, RuntimeError};
use crate::provider::{GenerateInput, GenerateOptions, GenerateRequest, Provider};
use crate::template;
use crate::tool::{ToolArgs, ToolError, ToolRegistry};
use crate::value::{Message, Value};

/// Name `prompt` statements bind their text to.
pub const PROMPT_VARIABLE: &str = "prompt";

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Printed lines, in order.
    pub lines: Vec<String>,
    /// Final environment.
    pub environment: Environment,
}

// ============================================================================
// Interpreter
// ============================================================================

/// Executes statements in order against one environment.
///
/// Execution halts at the first failing statement; the environment keeps
/// every effect of the statements before it.
pub struct Interpreter<'a> {
    environment: Environment,
    provider: Box<dyn Provider + 'a>,
    tools: Box<dyn ToolRegistry + 'a>,
    defaults: GenerateDefaults,
    output: Vec<String>,
    print_handler: Box<dyn Fn(&str) + 'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new(provider: impl Provider + 'a, tools: impl ToolRegistry + 'a) -> Self {
        Interpreter {
            environment: Environment::new(),
            provider: Box::new(provider),
            tools: Box::new(tools),
            defaults: GenerateDefaults::default(),
            output: Vec::new(),
            print_handler: Box::new(|_| {}),
        }
    }

    /// Override the options used by `generate` statements that omit them.
    pub fn with_defaults(mut self, defaults: GenerateDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Called with each printed line as it is produced.
    pub fn set_print_handler(&mut self, handler: impl Fn(&str) + 'a) {
        self.print_handler = Box::new(handler);
    }

    /// Parse `source` completely, then execute it.
    pub fn run(&mut self, source: &str) -> Result<()> {
        let statements = genail_parser::parse(source)?;
        self.execute(&statements)
    }

    pub fn execute(&mut self, statements: &[Statement]) -> Result<()> {
        for stmt in statements {
            tracing::debug!(line = stmt.line(), statement = stmt.kind.keyword(), "executing");
            self.execute_statement(&stmt.kind)
                .map_err(|e| e.at(stmt.line(), stmt.kind.keyword()))?;
        }
        Ok(())
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn into_output(self) -> RunOutput {
        RunOutput {
            lines: self.output,
            environment: self.environment,
        }
    }

    fn execute_statement(&mut self, kind: &StatementKind) -> Result<()> {
        match kind {
            StatementKind::Model { name } => {
                self.environment.set_model(name.clone());
                Ok(())
            }
            StatementKind::Set { name, value } | StatementKind::Template { name, value } => {
                let text = template::render(value, &self.environment)?;
                self.environment.set(name, Value::Text(text))
            }
            StatementKind::Prompt { text } => {
                let text = template::render(text, &self.environment)?;
                self.environment.set(PROMPT_VARIABLE, Value::Text(text))
            }
            StatementKind::Message { role, content } => {
                let content = template::render(content, &self.environment)?;
                self.environment.push_message(Message::new(role.clone(), content));
                Ok(())
            }
            StatementKind::Generate(stmt) => self.exec_generate(stmt),
            StatementKind::Call(stmt) => self.exec_call(stmt),
            StatementKind::Print { operand } => {
                let line = match operand {
                    PrintOperand::Literal(text) => text.clone(),
                    PrintOperand::Name(name) => match self.environment.get(name) {
                        Some(value) => value.display_string(),
                        None => name.clone(),
                    },
                };
                self.emit(line);
                Ok(())
            }
        }
    }

    fn exec_generate(&mut self, stmt: &GenerateStmt) -> Result<()> {
        let model = self
            .environment
            .model()
            .ok_or_else(|| {
                RuntimeError::invalid("no active model; add a `model` statement before `generate`")
            })?
            .to_string();
        let options = self.generate_options(stmt)?;
        let input = match self.environment.lookup(&stmt.source)? {
            Value::Text(text) => GenerateInput::Prompt(text.clone()),
            Value::MessageList(messages) => GenerateInput::Messages(messages.clone()),
        };
        self.environment.check_writable(&stmt.target)?;

        let request = GenerateRequest {
            model,
            input,
            options,
        };
        tracing::info!(
            model = %request.model,
            source = %stmt.source,
            temperature = request.options.temperature,
            max_tokens = request.options.max_tokens,
            "generate"
        );
        let text = self.provider.generate(&request)?;
        self.environment.set(&stmt.target, Value::Text(text))
    }

    fn generate_options(&self, stmt: &GenerateStmt) -> Result<GenerateOptions> {
        let temperature = match stmt.temperature.as_deref() {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|t| t.is_finite())
                .ok_or_else(|| {
                    RuntimeError::invalid(format!("temperature '{}' is not a number", raw))
                })?,
            None => self.defaults.temperature,
        };
        let max_tokens = match stmt.max_tokens.as_deref() {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                RuntimeError::invalid(format!(
                    "max_tokens '{}' is not a non-negative integer",
                    raw
                ))
            })?,
            None => self.defaults.max_tokens,
        };
        Ok(GenerateOptions {
            temperature,
            max_tokens,
            format: stmt.format.clone(),
            schema: stmt.schema.clone(),
        })
    }

    fn exec_call(&mut self, stmt: &CallStmt) -> Result<()> {
        let mut args = ToolArgs::new();
        for arg in &stmt.args {
            let value = template::render(&arg.value, &self.environment)?;
            args.insert(arg.key.clone(), value);
        }
        self.environment.check_writable(&stmt.target)?;

        tracing::info!(tool = %stmt.tool, args = args.len(), "call");
        let result = self.tools.invoke(&stmt.tool, &args).map_err(|e| match e {
            ToolError::NotFound(name) => RuntimeError::ToolNotFound { name },
            ToolError::Failed { tool, message } => RuntimeError::ToolFailed { tool, message },
        })?;

        let text = match result {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.environment.set(&stmt.target, Value::Text(text))
    }

    fn emit(&mut self, line: String) {
        (self.print_handler)(&line);
        self.output.push(line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::{MockProvider, ProviderError};
    use crate::tool::Tools;

    /// Returns a fixed reply and remembers every request.
    #[derive(Default)]
    struct Recorder {
        requests: RefCell<Vec<GenerateRequest>>,
    }

    impl Provider for Recorder {
        fn generate(&self, request: &GenerateRequest) -> std::result::Result<String, ProviderError> {
            self.requests.borrow_mut().push(request.clone());
            Ok("reply".to_string())
        }
    }

    fn run_mock(source: &str) -> (Interpreter<'static>, Result<()>) {
        let mut interp = Interpreter::new(MockProvider, Tools::with_stdlib());
        let result = interp.run(source);
        (interp, result)
    }

    #[test]
    fn set_and_template() {
        let (interp, result) = run_mock("set topic = \"AI\"\ntemplate greeting = \"Hi {topic}\"\n");
        result.unwrap();
        assert_eq!(
            interp.environment().get("greeting"),
            Some(&Value::text("Hi AI"))
        );
    }

    #[test]
    fn prompt_binds_rendered_text() {
        let (interp, result) =
            run_mock("set topic = \"Rust\"\nprompt \"\"\"\nWrite about {topic}.\n\"\"\"\n");
        result.unwrap();
        assert_eq!(
            interp.environment().get(PROMPT_VARIABLE),
            Some(&Value::text("Write about Rust."))
        );
    }

    #[test]
    fn generate_from_prompt_uses_defaults() {
        let recorder = Recorder::default();
        let mut interp = Interpreter::new(&recorder, Tools::new());
        interp
            .run("model \"demo\"\nset q = \"hello\"\ngenerate answer from q\n")
            .unwrap();
        assert_eq!(interp.environment().get("answer"), Some(&Value::text("reply")));
        drop(interp);

        let requests = recorder.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "demo");
        assert_eq!(requests[0].input, GenerateInput::Prompt("hello".into()));
        assert_eq!(requests[0].options.temperature, 0.7);
        assert_eq!(requests[0].options.max_tokens, 128);
    }

    #[test]
    fn generate_passes_options_and_conversation() {
        let recorder = Recorder::default();
        let mut interp = Interpreter::new(&recorder, Tools::new()).with_defaults(GenerateDefaults {
            temperature: 0.1,
            max_tokens: 16,
        });
        interp
            .run(
                "model m\nmessage system \"Be brief.\"\nmessage user \"Hi\"\n\
                 generate r from messages temperature=0.2 max_tokens=50 format=json\n",
            )
            .unwrap();
        drop(interp);

        let requests = recorder.requests.borrow();
        assert_eq!(
            requests[0].input,
            GenerateInput::Messages(vec![
                Message::new("system", "Be brief."),
                Message::new("user", "Hi"),
            ])
        );
        assert_eq!(requests[0].options.temperature, 0.2);
        assert_eq!(requests[0].options.max_tokens, 50);
        assert_eq!(requests[0].options.format.as_deref(), Some("json"));
    }

    #[test]
    fn generate_without_model_is_invalid() {
        let (_, result) = run_mock("set q = \"x\"\ngenerate a from q\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn generate_with_bad_number_is_invalid() {
        let (_, result) = run_mock("model m\nset q = \"x\"\ngenerate a from q temperature=warm\n");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        let (_, result) = run_mock("model m\nset q = \"x\"\ngenerate a from q max_tokens=-3\n");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn generate_from_unbound_source() {
        let (_, result) = run_mock("model m\ngenerate a from nothing\n");
        assert!(matches!(
            result.unwrap_err().root(),
            RuntimeError::UndefinedVariable { name } if name == "nothing"
        ));
    }

    #[test]
    fn generate_into_messages_never_reaches_provider() {
        let recorder = Recorder::default();
        let mut interp = Interpreter::new(&recorder, Tools::new());
        let err = interp
            .run("model m\nset q = \"x\"\ngenerate messages from q\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        drop(interp);
        assert!(recorder.requests.borrow().is_empty());
    }

    #[test]
    fn provider_failure_propagates_without_retry() {
        #[derive(Default)]
        struct Down {
            calls: Cell<u32>,
        }
        impl Provider for Down {
            fn generate(&self, _: &GenerateRequest) -> std::result::Result<String, ProviderError> {
                self.calls.set(self.calls.get() + 1);
                Err(ProviderError::Http("connection refused".into()))
            }
        }
        let down = Down::default();
        let mut interp = Interpreter::new(&down, Tools::new());
        let err = interp
            .run("model m\nset q = \"x\"\ngenerate a from q\nprint \"after\"\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(err.line(), Some(3));
        assert!(!interp.environment().is_bound("a"));
        assert!(interp.output().is_empty());
        drop(interp);
        assert_eq!(down.calls.get(), 1);
    }

    #[test]
    fn call_renders_args_and_binds_result() {
        let mut tools = Tools::new();
        tools.register("greet", |args| {
            Ok(serde_json::Value::String(format!(
                "Hello, {}!",
                args.get("name").cloned().unwrap_or_default()
            )))
        });
        let mut interp = Interpreter::new(MockProvider, tools);
        interp
            .run("set who = \"Ada\"\ncall greet name=\"{who}\" into out\nprint out\n")
            .unwrap();
        assert_eq!(interp.output(), &["Hello, Ada!".to_string()]);
    }

    #[test]
    fn call_structured_result_becomes_json_text() {
        let (interp, result) = run_mock("call length text=\"abc\" into n\n");
        result.unwrap();
        assert_eq!(interp.environment().get("n"), Some(&Value::text("3")));
    }

    #[test]
    fn call_errors() {
        let (_, result) = run_mock("call nope into out\n");
        assert!(matches!(
            result.unwrap_err().root(),
            RuntimeError::ToolNotFound { name } if name == "nope"
        ));

        let (_, result) = run_mock("call upper into out\n");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::ToolFailed);
    }

    #[test]
    fn print_literal_and_names() {
        let (interp, result) = run_mock(
            "set topic = \"AI\"\nprint \"topic\"\nprint topic\nprint unknown\n",
        );
        result.unwrap();
        assert_eq!(interp.output(), &["topic", "AI", "unknown"]);
    }

    #[test]
    fn print_messages() {
        let (interp, result) = run_mock("message system \"Be brief.\"\nmessage user \"Hi\"\nprint messages\n");
        result.unwrap();
        assert_eq!(interp.output(), &["system: Be brief.\nuser: Hi"]);
    }

    #[test]
    fn print_handler_sees_every_line() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut interp = Interpreter::new(MockProvider, Tools::new());
        interp.set_print_handler(move |line| sink.borrow_mut().push(line.to_string()));
        interp.run("print \"a\"\nprint \"b\"\n").unwrap();
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn halts_at_first_error_keeping_prior_state() {
        let (interp, result) = run_mock(
            "set a = \"1\"\nprint a\nset b = \"{missing}\"\nset c = \"3\"\nprint c\n",
        );
        let err = result.unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.to_string(), "line 3 (set): undefined variable 'missing'");
        assert!(interp.environment().is_bound("a"));
        assert!(!interp.environment().is_bound("b"));
        assert!(!interp.environment().is_bound("c"));
        assert_eq!(interp.output(), &["1"]);
    }

    #[test]
    fn parse_errors_prevent_execution() {
        let (interp, result) = run_mock("print \"early\"\nbogus line\n");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Parse);
        assert!(interp.output().is_empty());
    }

    #[test]
    fn set_messages_is_rejected() {
        let (interp, result) = run_mock("message user \"Hi\"\nset messages = \"x\"\n");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(interp.environment().messages().len(), 1);
    }
}
