//! Session-scoped owner of quest state.
//!
//! The scene talks to the quest only through [`GameSession`]: it reports
//! interactions, drains [`SessionEvent`]s and asks whether the ending may
//! start. Every completed remote call, answered or synthesized, goes through
//! [`GameSession::update`] and is persisted before the next one.

use std::collections::VecDeque;
use std::path::PathBuf;

use engine::Vec2;
use tracing::{info, warn};

use super::dialogue::DialogueLine;
use super::dispatch::QuestDispatch;
use super::quest::{EmotionKind, QuestCall, QuestCompletion, QuestReply, QuestStage};
use super::quest_client::QuestRequest;
use super::registry::{Interaction, RegistryEvent, WorldObjectRegistry};
use super::session_cache::{load_session_cache, save_session_cache, SessionCache, SAVE_VERSION};
use super::world_objects::{NpcObject, PropKind, WorldObject, QUEST_GIVER_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    Dialogue(Vec<DialogueLine>),
    Guidance(String),
    CompanionScreen(PropKind),
    StageChanged { from: QuestStage, to: QuestStage },
    Collected(EmotionKind),
    Delivered(EmotionKind),
    AllDelivered,
}

pub(crate) struct SessionSetup {
    pub(crate) cache_path: PathBuf,
    pub(crate) display_name: String,
    pub(crate) objects: Vec<WorldObject>,
    pub(crate) npcs: Vec<NpcObject>,
}

pub(crate) struct GameSession {
    registry: WorldObjectRegistry,
    dispatch: Box<dyn QuestDispatch>,
    cache_path: PathBuf,
    session_id: Option<String>,
    display_name: String,
    last_dialogue_lines: Vec<String>,
    next_request_id: u64,
    events: VecDeque<SessionEvent>,
    completed: Vec<QuestCompletion>,
    registry_events: Vec<RegistryEvent>,
}

impl GameSession {
    /// Restores the cached session, or starts a new one. A cache that cannot
    /// be read is replaced rather than blocking play.
    pub(crate) fn open(setup: SessionSetup, dispatch: Box<dyn QuestDispatch>) -> Self {
        let cache = match load_session_cache(&setup.cache_path) {
            Ok(Some(cache)) => cache,
            Ok(None) => SessionCache::fresh(&setup.display_name),
            Err(error) => {
                warn!(error = %error, "session_cache_discarded");
                SessionCache::fresh(&setup.display_name)
            }
        };

        let registry = WorldObjectRegistry::new(
            setup.objects,
            setup.npcs,
            cache.current_stage,
            cache.delivered_kinds.iter().copied(),
        );
        let mut session = Self {
            registry,
            dispatch,
            cache_path: setup.cache_path,
            session_id: cache.session_id,
            display_name: cache.display_name,
            last_dialogue_lines: cache.last_dialogue_lines,
            next_request_id: 0,
            events: VecDeque::new(),
            completed: Vec::new(),
            registry_events: Vec::new(),
        };

        match session.session_id.clone() {
            None => {
                info!(display_name = %session.display_name, "session_create_requested");
                let display_name = session.display_name.clone();
                session.submit(QuestCall::CreateSession { display_name });
            }
            Some(session_id) => {
                info!(
                    session_id = %session_id,
                    stage = session.stage().as_token(),
                    "session_resumed"
                );
                if session.stage() == QuestStage::Intro {
                    session.submit(QuestCall::StartSession);
                } else if !session.last_dialogue_lines.is_empty() {
                    let lines = narrated(&session.last_dialogue_lines);
                    session.events.push_back(SessionEvent::Dialogue(lines));
                }
            }
        }
        session
    }

    pub(crate) fn registry(&self) -> &WorldObjectRegistry {
        &self.registry
    }

    pub(crate) fn stage(&self) -> QuestStage {
        self.registry.stage()
    }

    pub(crate) fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Applies every completion that has arrived, in order.
    pub(crate) fn update(&mut self) {
        let mut completed = std::mem::take(&mut self.completed);
        self.dispatch.drain_completed(&mut completed);
        for completion in completed.drain(..) {
            self.apply_completion(completion);
        }
        self.completed = completed;
    }

    /// Interacts with the nearest eligible object around `actor`, if any.
    /// Returns false when nothing was in reach.
    pub(crate) fn interact(&mut self, actor: Vec2) -> bool {
        let Some(target) = self.registry.nearest_eligible(actor) else {
            return false;
        };
        match self.registry.interact(target) {
            None => false,
            Some(Interaction::Request(call)) => {
                self.submit(call);
                true
            }
            Some(Interaction::Companion(prop)) => {
                info!(prop = prop.as_token(), "companion_screen_opened");
                self.events.push_back(SessionEvent::CompanionScreen(prop));
                self.events
                    .push_back(SessionEvent::Guidance(prop.companion_hint().to_string()));
                true
            }
            Some(Interaction::Guidance(guidance)) => {
                info!(?guidance, "interaction_guidance");
                self.events
                    .push_back(SessionEvent::Guidance(guidance.message()));
                true
            }
        }
    }

    /// True exactly once: the first poll after every delivery has landed
    /// while no dialogue is showing.
    pub(crate) fn poll_terminal(&mut self, dialogue_idle: bool) -> bool {
        let fired = self.registry.poll_terminal(dialogue_idle);
        if fired {
            self.forward_registry_events();
            self.persist();
        }
        fired
    }

    pub(crate) fn request_input(&mut self) {
        self.submit(QuestCall::AdvanceStage {
            target: QuestStage::RequestInput,
            selected_npc: None,
        });
    }

    pub(crate) fn select_npc(&mut self, npc_name: &str) {
        self.submit(QuestCall::AdvanceStage {
            target: QuestStage::NpcSelection,
            selected_npc: Some(npc_name.to_string()),
        });
    }

    pub(crate) fn complete(&mut self, contact_info: &str, message: &str) {
        self.submit(QuestCall::Complete {
            contact_info: contact_info.to_string(),
            message: message.to_string(),
        });
    }

    pub(crate) fn drain_events(&mut self, out: &mut Vec<SessionEvent>) {
        out.extend(self.events.drain(..));
    }

    fn submit(&mut self, call: QuestCall) {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        info!(request_id, call = call.name(), "quest_call_submitted");
        self.dispatch.submit(QuestRequest {
            request_id,
            session_id: self.session_id.clone(),
            call,
        });
    }

    fn apply_completion(&mut self, completion: QuestCompletion) {
        let QuestCompletion {
            request_id,
            call,
            reply,
            origin,
        } = completion;

        match reply {
            QuestReply::SessionCreated { session_id } => {
                if self.session_id.is_some() {
                    info!(request_id, "duplicate_session_ignored");
                    return;
                }
                info!(
                    request_id,
                    session_id = %session_id,
                    origin = origin.as_token(),
                    "session_created"
                );
                self.session_id = Some(session_id);
                self.persist();
                self.submit(QuestCall::StartSession);
            }
            QuestReply::Progress {
                stage,
                dialogue_lines,
            } => {
                let outcome = self.registry.apply_transition(&call, stage);
                info!(
                    request_id,
                    call = call.name(),
                    origin = origin.as_token(),
                    stage = outcome.stage.as_token(),
                    stage_changed = outcome.stage_changed,
                    "quest_transition_applied"
                );

                let lines = self.dialogue_for(&call, &dialogue_lines);
                if !dialogue_lines.is_empty() {
                    self.last_dialogue_lines = dialogue_lines;
                }
                self.forward_registry_events();
                if !lines.is_empty() {
                    self.events.push_back(SessionEvent::Dialogue(lines));
                }
                self.persist();
            }
        }
    }

    /// Delivery replies are spoken by the receiving NPC. The last NPC in
    /// the chain gets a two-speaker exchange instead: narration first, then
    /// their own thanks.
    fn dialogue_for(&self, call: &QuestCall, reply_lines: &[String]) -> Vec<DialogueLine> {
        let QuestCall::Deliver(kind) = call else {
            return narrated(reply_lines);
        };
        let Some(npc) = self.registry.npcs().iter().find(|npc| npc.accepts == *kind) else {
            return narrated(reply_lines);
        };
        if EmotionKind::CHAIN.last() == Some(kind) {
            let mut lines = narrated(reply_lines);
            lines.push(DialogueLine::new(npc.display_name, npc.thanks_line));
            lines
        } else if reply_lines.is_empty() {
            vec![DialogueLine::new(npc.display_name, npc.thanks_line)]
        } else {
            reply_lines
                .iter()
                .map(|text| DialogueLine::new(npc.display_name, text.as_str()))
                .collect()
        }
    }

    fn forward_registry_events(&mut self) {
        self.registry.drain_events(&mut self.registry_events);
        for event in self.registry_events.drain(..) {
            let event = match event {
                RegistryEvent::StageChanged { from, to } => SessionEvent::StageChanged { from, to },
                RegistryEvent::Collected(kind) => SessionEvent::Collected(kind),
                RegistryEvent::Delivered(kind) => SessionEvent::Delivered(kind),
                RegistryEvent::AllDelivered => SessionEvent::AllDelivered,
            };
            self.events.push_back(event);
        }
    }

    fn persist(&self) {
        let cache = SessionCache {
            save_version: SAVE_VERSION,
            session_id: self.session_id.clone(),
            display_name: self.display_name.clone(),
            current_stage: self.registry.stage(),
            last_dialogue_lines: self.last_dialogue_lines.clone(),
            delivered_kinds: self.registry.delivered_kinds().collect(),
        };
        if let Err(error) = save_session_cache(&self.cache_path, &cache) {
            warn!(error = %error, "session_cache_write_failed");
        }
    }
}

fn narrated(lines: &[String]) -> Vec<DialogueLine> {
    lines
        .iter()
        .map(|text| DialogueLine::new(QUEST_GIVER_NAME, text.as_str()))
        .collect()
}
