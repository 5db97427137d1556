mod dialogue;
mod dispatch;
mod player;
mod quest;
mod quest_client;
mod registry;
mod scene;
mod session;
mod session_cache;
mod world_objects;

use std::io;

use engine::{AppPaths, Scene, Viewport};
use tracing::info;

use self::dispatch::{QuestDispatch, ThreadedDispatch};
use self::quest_client::{HttpQuestService, OfflineQuestService, QuestService, TransportError};
use self::scene::RoseScene;
use self::session::SessionSetup;
use self::world_objects::{default_npcs, default_objects};
use super::config::GameConfig;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SceneBuildError {
    #[error("failed to configure quest client: {0}")]
    QuestClient(#[from] TransportError),
    #[error("failed to start quest worker thread: {0}")]
    QuestWorker(#[source] io::Error),
}

pub(crate) fn build_scene(
    paths: &AppPaths,
    config: &GameConfig,
    viewport: Viewport,
) -> Result<Box<dyn Scene>, SceneBuildError> {
    let service: Box<dyn QuestService + Send> = match &config.api_base_url {
        Some(base_url) => {
            info!(
                api = %base_url,
                timeout_ms = config.request_timeout.as_millis() as u64,
                "quest_service_online"
            );
            Box::new(HttpQuestService::new(base_url, config.request_timeout)?)
        }
        None => {
            info!("quest_service_offline");
            Box::new(OfflineQuestService)
        }
    };
    let dispatch: Box<dyn QuestDispatch> =
        Box::new(ThreadedDispatch::spawn(service).map_err(SceneBuildError::QuestWorker)?);

    let setup = SessionSetup {
        cache_path: config.session_file.clone(),
        display_name: config.player_name.clone(),
        objects: default_objects(),
        npcs: default_npcs(),
    };
    Ok(Box::new(RoseScene::new(
        paths.assets_dir.join("sprites"),
        viewport,
        setup,
        dispatch,
    )))
}
