use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name searched for when locating a project manifest.
pub const MANIFEST_FILE: &str = "Genail.toml";

/// The parsed Genail.toml manifest.
#[derive(Debug, Clone)]
pub struct GenailManifest {
    pub provider: ProviderConfig,
    pub generate: GenerateDefaults,
    /// The directory containing the Genail.toml file.
    pub root_dir: PathBuf,
}

/// `[provider]` section: which generation backend scripts run against.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            api_key_env: None,
            base_url: None,
            timeout: None,
        }
    }
}

/// `[generate]` section: option values used when a `generate` statement omits them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GenerateDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerateDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_kind() -> String {
    "mock".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    128
}

/// Raw TOML structure for deserialization.
#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    provider: ProviderConfig,
    #[serde(default)]
    generate: GenerateDefaults,
}

/// Errors that can occur when loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("no Genail.toml found (searched from {0})")]
    NotFound(String),
    #[error("failed to read Genail.toml: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid Genail.toml: {0}")]
    ParseError(String),
    #[error("invalid Genail.toml: provider '{0}' requires 'api_key_env'")]
    MissingApiKeyEnv(String),
    #[error("invalid Genail.toml: unknown provider kind '{0}' (expected 'mock', 'openai' or 'ollama')")]
    UnknownProvider(String),
    #[error("invalid Genail.toml: temperature must be between 0 and 2, got {0}")]
    TemperatureOutOfRange(f64),
}

/// Walk up from `start_dir` looking for `Genail.toml`.
/// Returns the path to the manifest file if found.
pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a Genail.toml manifest from a file path.
pub fn load_manifest(path: &Path) -> Result<GenailManifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    let root_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    parse_manifest(&content, root_dir)
}

/// Parse and validate a Genail.toml manifest from a string.
pub fn parse_manifest(content: &str, root_dir: PathBuf) -> Result<GenailManifest, ManifestError> {
    let raw: RawManifest =
        toml::from_str(content).map_err(|e| ManifestError::ParseError(e.to_string()))?;

    validate_provider(&raw.provider)?;
    if !(0.0..=2.0).contains(&raw.generate.temperature) {
        return Err(ManifestError::TemperatureOutOfRange(raw.generate.temperature));
    }

    Ok(GenailManifest {
        provider: raw.provider,
        generate: raw.generate,
        root_dir,
    })
}

/// Find and load the manifest starting from a script's directory.
pub fn find_and_load_manifest(script: &Path) -> Result<GenailManifest, ManifestError> {
    let start_dir = script.parent().unwrap_or_else(|| Path::new("."));
    let manifest_path = find_manifest(start_dir)
        .ok_or_else(|| ManifestError::NotFound(start_dir.display().to_string()))?;
    load_manifest(&manifest_path)
}

fn validate_provider(provider: &ProviderConfig) -> Result<(), ManifestError> {
    match provider.kind.as_str() {
        "mock" | "ollama" => Ok(()),
        "openai" => {
            if provider.api_key_env.is_none() {
                return Err(ManifestError::MissingApiKeyEnv(provider.kind.clone()));
            }
            Ok(())
        }
        other => Err(ManifestError::UnknownProvider(other.to_string())),
    }
}
