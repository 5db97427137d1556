use engine::{resolve_app_paths, LoopConfig, Scene, StartupError, Viewport};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{ConfigError, GameConfig};
use super::gameplay::{self, SceneBuildError};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scene(#[from] SceneBuildError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Rose Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "app_paths_resolved");
    let game_config = GameConfig::from_env(&paths)?;
    info!(
        online = game_config.api_base_url.is_some(),
        player = %game_config.player_name,
        session_file = %game_config.session_file.display(),
        "game_config"
    );

    let config = LoopConfig::default();
    let viewport = Viewport {
        width: config.viewport_width,
        height: config.viewport_height,
    };
    let scene = gameplay::build_scene(&paths, &game_config, viewport)?;

    Ok(AppWiring { config, scene })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
