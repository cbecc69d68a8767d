use genail_parser::is_identifier;

use crate::environment::Environment;
use crate::error::{Result, RuntimeError};

/// Replace `{name}` placeholders in `format` with the text of bound variables.
///
/// Only brace pairs enclosing an identifier are placeholders; any other brace
/// is copied through. Substituted text is not rescanned.
pub fn render(format: &str, env: &Environment) -> Result<String> {
    let mut out = String::with_capacity(format.len());
    let mut rest = format;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match placeholder_at(after) {
            Some(name) => {
                let value = env.lookup(name)?;
                let text = value.as_text().ok_or_else(|| {
                    RuntimeError::invalid(format!(
                        "cannot render {} '{}' inside a template",
                        value.type_name(),
                        name
                    ))
                })?;
                out.push_str(text);
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Names referenced by placeholders, in order of appearance.
pub fn placeholders(format: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = format;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match placeholder_at(after) {
            Some(name) => {
                names.push(name);
                rest = &after[name.len() + 1..];
            }
            None => rest = after,
        }
    }
    names
}

/// If `text` starts with `identifier}`, return the identifier.
fn placeholder_at(text: &str) -> Option<&str> {
    let close = text.find('}')?;
    let name = &text[..close];
    is_identifier(name).then_some(name)
}
