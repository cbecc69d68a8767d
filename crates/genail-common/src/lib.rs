pub mod manifest;
pub mod span;

pub use manifest::{GenailManifest, GenerateDefaults, ManifestError, ProviderConfig};
pub use span::{Position, Span};
