//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use biolab_core::traits::{Attachment, LlmProvider};
use biolab_providers::config::load_config_from;
use biolab_providers::{create_provider, BiolabConfig};

pub mod analyze;
pub mod init;
pub mod list_models;
pub mod session;
pub mod validate;

/// Load the config and build the selected provider.
pub(crate) fn load_provider(
    config_path: Option<&Path>,
    provider: Option<&str>,
) -> Result<(BiolabConfig, Arc<dyn LlmProvider>)> {
    let config = load_config_from(config_path)?;
    let (name, provider_config) = config.provider(provider)?;
    let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(name, provider_config)?);
    tracing::debug!(provider = provider.name(), "provider ready");
    Ok((config, provider))
}

/// Read an image file as an inline attachment.
pub(crate) fn load_image(path: &PathBuf) -> Result<Attachment> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let mime = Attachment::mime_for_extension(ext)
        .with_context(|| format!("unsupported image type: {}", path.display()))?;
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read image: {}", path.display()))?;
    Ok(Attachment::new(mime, data))
}
