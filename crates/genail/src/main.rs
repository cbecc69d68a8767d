use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use genail_common::manifest::{self, ManifestError};
use genail_common::{GenerateDefaults, ProviderConfig, Span};
use genail_parser::{ParseError, Statement, StatementKind};
use genail_runtime::environment::MESSAGES;
use genail_runtime::interpreter::PROMPT_VARIABLE;
use genail_runtime::{
    provider_from_config, template, ErrorKind, Interpreter, MockProvider, Provider, Tools,
};

/// GenAIL script runner.
#[derive(Parser)]
#[command(
    name = "genail",
    version,
    about,
    long_about = "GenAIL script runner.\n\nRuns line-oriented generative-AI workflow scripts.\n\nExamples:\n  genail run story.gai               Run a script with the configured provider\n  genail run story.gai --mock        Run against the deterministic mock provider\n  genail run story.gai --dump-env    Print the final environment as JSON\n  genail check story.gai             Parse only and report problems"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Parse and execute a script
    Run {
        /// Path to the script
        script: PathBuf,

        /// Use the mock provider regardless of Genail.toml
        #[arg(long)]
        mock: bool,

        /// Suppress print output
        #[arg(short, long)]
        quiet: bool,

        /// Print the final environment as JSON after the run
        #[arg(long = "dump-env")]
        dump_env: bool,

        /// Explicit Genail.toml (default: search upward from the script)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Parse a script without executing it
    Check {
        /// Path to the script
        script: PathBuf,

        /// Print the parsed statements as JSON
        #[arg(long = "emit-statements")]
        emit_statements: bool,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Command::Run {
            script,
            mock,
            quiet,
            dump_env,
            manifest,
        } => run_script(&script, mock, quiet, dump_env, manifest.as_deref()),
        Command::Check {
            script,
            emit_statements,
        } => check_script(&script, emit_statements),
    };
    process::exit(code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GENAIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// genail run
// ============================================================================

fn run_script(
    script: &Path,
    mock: bool,
    quiet: bool,
    dump_env: bool,
    manifest_path: Option<&Path>,
) -> i32 {
    let Some(source) = read_source(script) else {
        return 1;
    };
    let file_name = display_name(script);

    let (provider_config, defaults) = match load_config(script, manifest_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let provider: Box<dyn Provider> = if mock {
        Box::new(MockProvider)
    } else {
        match provider_from_config(&provider_config) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("error: {}", e);
                return 1;
            }
        }
    };
    let provider_kind = if mock { "mock" } else { provider_config.kind.as_str() };
    tracing::debug!(provider = provider_kind, "provider selected");

    let statements = match genail_parser::parse(&source) {
        Ok(statements) => statements,
        Err(e) => {
            print_parse_error(&e, &source, &file_name);
            return parse_exit_code(&e);
        }
    };

    let mut interpreter = Interpreter::new(provider, Tools::with_stdlib()).with_defaults(defaults);
    if !quiet {
        interpreter.set_print_handler(|line| println!("{}", line));
    }

    let code = match interpreter.execute(&statements) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("runtime error: {}", e);
            exit_code(e.kind())
        }
    };

    if dump_env {
        match serde_json::to_string_pretty(&interpreter.environment().to_json()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: could not serialize environment: {}", e);
                return 1;
            }
        }
    }
    code
}

/// Provider settings and generation defaults. A missing Genail.toml means
/// the mock provider with built-in defaults.
fn load_config(
    script: &Path,
    manifest_path: Option<&Path>,
) -> Result<(ProviderConfig, GenerateDefaults), ManifestError> {
    let loaded = match manifest_path {
        Some(path) => manifest::load_manifest(path),
        None => {
            let abs_script = fs::canonicalize(script).unwrap_or_else(|_| script.to_path_buf());
            manifest::find_and_load_manifest(&abs_script)
        }
    };
    match loaded {
        Ok(m) => {
            tracing::debug!(root = %m.root_dir.display(), "loaded Genail.toml");
            Ok((m.provider, m.generate))
        }
        Err(ManifestError::NotFound(_)) if manifest_path.is_none() => {
            Ok((ProviderConfig::default(), GenerateDefaults::default()))
        }
        Err(e) => Err(e),
    }
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Parse => 2,
        ErrorKind::UnterminatedPrompt => 3,
        ErrorKind::UndefinedVariable => 4,
        ErrorKind::InvalidArgument => 5,
        ErrorKind::Provider => 6,
        ErrorKind::ToolNotFound => 7,
        ErrorKind::ToolFailed => 8,
    }
}

fn parse_exit_code(err: &ParseError) -> i32 {
    match err {
        ParseError::UnterminatedPrompt { .. } => exit_code(ErrorKind::UnterminatedPrompt),
        ParseError::Syntax { .. } => exit_code(ErrorKind::Parse),
    }
}

// ============================================================================
// genail check
// ============================================================================

fn check_script(script: &Path, emit_statements: bool) -> i32 {
    let Some(source) = read_source(script) else {
        return 1;
    };
    let file_name = display_name(script);

    let statements = match genail_parser::parse(&source) {
        Ok(statements) => statements,
        Err(e) => {
            print_parse_error(&e, &source, &file_name);
            return parse_exit_code(&e);
        }
    };

    for (stmt, name) in unassigned_placeholders(&statements) {
        report(
            ReportKind::Warning,
            Color::Yellow,
            &format!("placeholder '{{{}}}' refers to a variable that is never assigned", name),
            "used here",
            stmt.span,
            &source,
            &file_name,
        );
    }

    let tools = Tools::with_stdlib();
    for (stmt, tool) in unknown_tools(&statements, &tools) {
        report(
            ReportKind::Warning,
            Color::Yellow,
            &format!("'{}' is not a built-in tool", tool),
            &format!("available: {}", tools.names().join(", ")),
            stmt.span,
            &source,
            &file_name,
        );
    }

    if emit_statements {
        match serde_json::to_string_pretty(&statements) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: could not serialize statements: {}", e);
                return 1;
            }
        }
    } else {
        println!("{}: {} statements, no errors", file_name, statements.len());
    }
    0
}

/// Placeholders naming variables that no statement in the script assigns.
fn unassigned_placeholders(statements: &[Statement]) -> Vec<(&Statement, &str)> {
    let mut assigned: BTreeSet<&str> = BTreeSet::new();
    assigned.insert(MESSAGES);
    for stmt in statements {
        match &stmt.kind {
            StatementKind::Set { name, .. } | StatementKind::Template { name, .. } => {
                assigned.insert(name.as_str());
            }
            StatementKind::Prompt { .. } => {
                assigned.insert(PROMPT_VARIABLE);
            }
            StatementKind::Generate(g) => {
                assigned.insert(g.target.as_str());
            }
            StatementKind::Call(c) => {
                assigned.insert(c.target.as_str());
            }
            _ => {}
        }
    }

    let mut missing = Vec::new();
    for stmt in statements {
        let formats: Vec<&str> = match &stmt.kind {
            StatementKind::Set { value, .. } | StatementKind::Template { value, .. } => {
                vec![value.as_str()]
            }
            StatementKind::Prompt { text } => vec![text.as_str()],
            StatementKind::Message { content, .. } => vec![content.as_str()],
            StatementKind::Call(c) => c.args.iter().map(|a| a.value.as_str()).collect(),
            _ => Vec::new(),
        };
        for format in formats {
            for name in template::placeholders(format) {
                if !assigned.contains(name) {
                    missing.push((stmt, name));
                }
            }
        }
    }
    missing
}

/// `call` statements naming a tool the registry does not provide.
fn unknown_tools<'s>(statements: &'s [Statement], tools: &Tools) -> Vec<(&'s Statement, &'s str)> {
    statements
        .iter()
        .filter_map(|stmt| match &stmt.kind {
            StatementKind::Call(c) if !tools.contains(&c.tool) => Some((stmt, c.tool.as_str())),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Diagnostics
// ============================================================================

fn read_source(script: &Path) -> Option<String> {
    match fs::read_to_string(script) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("error: could not read '{}': {}", script.display(), e);
            None
        }
    }
}

fn display_name(script: &Path) -> String {
    script
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn print_parse_error(err: &ParseError, source: &str, file_name: &str) {
    report(
        ReportKind::Error,
        Color::Red,
        &err.to_string(),
        &err.message(),
        err.span(),
        source,
        file_name,
    );
}

fn report(
    kind: ReportKind<'_>,
    color: Color,
    message: &str,
    label: &str,
    span: Span,
    source: &str,
    file_name: &str,
) {
    let range = span.byte_range();
    let end = range.end.min(source.len());
    let start = range.start.min(end);

    let printed = Report::build(kind, file_name, start)
        .with_message(message)
        .with_label(
            Label::new((file_name, start..end))
                .with_message(label)
                .with_color(color),
        )
        .finish()
        .eprint((file_name, Source::from(source)));
    if printed.is_err() {
        eprintln!("{}: {}", file_name, message);
    }
}
