use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::ViewerConfig;
use crate::engine::surface::PlayerBackend;
use crate::registry::StreamRegistry;
use crate::source::transcoder::TranscoderClient;

/// Build a registry talking to the transcoder described by `config`.
pub fn build_viewer(
    config: &ViewerConfig,
    player: Arc<dyn PlayerBackend>,
) -> Result<StreamRegistry> {
    let client = TranscoderClient::from_config(config)
        .with_context(|| format!("building transcoder client for {}", config.base_url()))?;
    info!(
        "viewer ready: transcoder={} timeout={:?} stop_on_remove={}",
        client.base_url(),
        config.begin_timeout(),
        config.stop_on_remove
    );
    Ok(StreamRegistry::with_config(Arc::new(client), player, config))
}

/// Same as [`build_viewer`] with the base URL taken from the environment.
pub fn build_viewer_from_env(player: Arc<dyn PlayerBackend>) -> Result<StreamRegistry> {
    build_viewer(&ViewerConfig::from_env(), player)
}
