//! Which world objects exist, which are live at the current quest stage,
//! and the per-NPC delivery state machine.

use std::collections::{BTreeSet, VecDeque};

use engine::Vec2;
use tracing::{debug, info};

use super::quest::{EmotionKind, QuestCall, QuestStage};
use super::world_objects::{NpcObject, ObjectKind, PropKind, WorldObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Target {
    Object(usize),
    Npc(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryState {
    NotCollected,
    CollectedUndelivered,
    Delivered,
}

/// Why an interaction changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guidance {
    AlreadyCollected(EmotionKind),
    NotYetAvailable(EmotionKind),
    BringStarFirst(EmotionKind),
    AlreadyDelivered(EmotionKind),
    RequestPending,
}

impl Guidance {
    pub(crate) fn message(self) -> String {
        match self {
            Self::AlreadyCollected(kind) => {
                format!("You already carry the star of {}.", kind.display_name())
            }
            Self::NotYetAvailable(kind) => {
                format!("The star of {} is not ready yet.", kind.display_name())
            }
            Self::BringStarFirst(kind) => {
                format!("They are waiting for the star of {}.", kind.display_name())
            }
            Self::AlreadyDelivered(kind) => {
                format!("The star of {} is already home.", kind.display_name())
            }
            Self::RequestPending => "One moment...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Interaction {
    Request(QuestCall),
    Companion(PropKind),
    Guidance(Guidance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegistryEvent {
    StageChanged { from: QuestStage, to: QuestStage },
    Collected(EmotionKind),
    Delivered(EmotionKind),
    AllDelivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransitionOutcome {
    pub(crate) stage: QuestStage,
    pub(crate) stage_changed: bool,
    pub(crate) stale: bool,
}

#[derive(Debug)]
pub(crate) struct WorldObjectRegistry {
    stage: QuestStage,
    objects: Vec<WorldObject>,
    object_active: Vec<bool>,
    npcs: Vec<NpcObject>,
    delivered: BTreeSet<EmotionKind>,
    pending_collect: BTreeSet<EmotionKind>,
    pending_deliver: BTreeSet<EmotionKind>,
    all_delivered: bool,
    events: VecDeque<RegistryEvent>,
}

impl WorldObjectRegistry {
    /// `delivered` is the persisted delivery ledger. A stage at or past
    /// `RequestInput` implies every kind was delivered and the NPCs have
    /// already left.
    pub(crate) fn new(
        objects: Vec<WorldObject>,
        npcs: Vec<NpcObject>,
        stage: QuestStage,
        delivered: impl IntoIterator<Item = EmotionKind>,
    ) -> Self {
        let mut delivered: BTreeSet<EmotionKind> = delivered
            .into_iter()
            .filter(|kind| kind.is_collected_at(stage))
            .collect();
        let finished = stage >= QuestStage::RequestInput;
        if finished {
            delivered.extend(EmotionKind::CHAIN);
        }
        let mut registry = Self {
            stage,
            object_active: vec![false; objects.len()],
            objects,
            npcs,
            delivered,
            pending_collect: BTreeSet::new(),
            pending_deliver: BTreeSet::new(),
            all_delivered: finished,
            events: VecDeque::new(),
        };
        registry.derive_visibility();
        registry
    }

    pub(crate) fn stage(&self) -> QuestStage {
        self.stage
    }

    pub(crate) fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub(crate) fn npcs(&self) -> &[NpcObject] {
        &self.npcs
    }

    pub(crate) fn delivered_kinds(&self) -> impl Iterator<Item = EmotionKind> + '_ {
        self.delivered.iter().copied()
    }

    pub(crate) fn all_delivered(&self) -> bool {
        self.all_delivered
    }

    /// Recomputes which objects are live from the current stage alone. A
    /// collected star stays marked used from then on.
    pub(crate) fn derive_visibility(&mut self) {
        let stage = self.stage;
        for (active, object) in self.object_active.iter_mut().zip(&mut self.objects) {
            *active = match object.kind {
                ObjectKind::Prop(_) => true,
                ObjectKind::Collectible(kind) => {
                    if kind.is_collected_at(stage) {
                        object.has_been_used = true;
                    }
                    kind.is_collectible_at(stage)
                }
            };
        }
    }

    pub(crate) fn is_object_active(&self, index: usize) -> bool {
        self.object_active.get(index).copied().unwrap_or(false)
    }

    /// NPCs leave the world for good once the terminal latch trips.
    pub(crate) fn is_npc_present(&self) -> bool {
        !self.all_delivered
    }

    pub(crate) fn delivery_state(&self, kind: EmotionKind) -> DeliveryState {
        if self.delivered.contains(&kind) {
            DeliveryState::Delivered
        } else if kind.is_collected_at(self.stage) {
            DeliveryState::CollectedUndelivered
        } else {
            DeliveryState::NotCollected
        }
    }

    /// Closest live object or present NPC whose interaction radius reaches
    /// `actor`. Distances run top-left to top-left.
    pub(crate) fn nearest_eligible(&self, actor: Vec2) -> Option<Target> {
        let objects = self
            .objects
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_object_active(*index))
            .filter(|(_, object)| is_near(actor, object.position, object.interaction_radius))
            .map(|(index, object)| (Target::Object(index), actor.distance(object.position)));
        let npcs = self
            .npcs
            .iter()
            .enumerate()
            .filter(|_| self.is_npc_present())
            .filter(|(_, npc)| is_near(actor, npc.position, npc.interaction_radius))
            .map(|(index, npc)| (Target::Npc(index), actor.distance(npc.position)));

        objects
            .chain(npcs)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(target, _)| target)
    }

    /// Decides what interacting with `target` does. Requests are marked in
    /// flight until their completion is applied, so a second press before
    /// the reply cannot send a duplicate.
    pub(crate) fn interact(&mut self, target: Target) -> Option<Interaction> {
        match target {
            Target::Object(index) => {
                let active = self.is_object_active(index);
                let object = self.objects.get_mut(index)?;
                match object.kind {
                    ObjectKind::Prop(prop) => {
                        object.has_been_used = true;
                        Some(Interaction::Companion(prop))
                    }
                    ObjectKind::Collectible(kind) => {
                        if self.pending_collect.contains(&kind) {
                            return Some(Interaction::Guidance(Guidance::RequestPending));
                        }
                        if !active {
                            let guidance = if kind.is_collected_at(self.stage) {
                                Guidance::AlreadyCollected(kind)
                            } else {
                                Guidance::NotYetAvailable(kind)
                            };
                            info!(object = object.id, "interaction_ignored_inactive");
                            return Some(Interaction::Guidance(guidance));
                        }
                        self.pending_collect.insert(kind);
                        Some(Interaction::Request(QuestCall::Collect(kind)))
                    }
                }
            }
            Target::Npc(index) => {
                if !self.is_npc_present() {
                    return None;
                }
                let kind = self.npcs.get(index)?.accepts;
                if self.pending_deliver.contains(&kind) {
                    return Some(Interaction::Guidance(Guidance::RequestPending));
                }
                match self.delivery_state(kind) {
                    DeliveryState::NotCollected => {
                        Some(Interaction::Guidance(Guidance::BringStarFirst(kind)))
                    }
                    DeliveryState::Delivered => {
                        Some(Interaction::Guidance(Guidance::AlreadyDelivered(kind)))
                    }
                    DeliveryState::CollectedUndelivered => {
                        self.pending_deliver.insert(kind);
                        Some(Interaction::Request(QuestCall::Deliver(kind)))
                    }
                }
            }
        }
    }

    /// The only writer of the quest stage. Server replies and synthesized
    /// fallbacks both land here. A reply stage older than the local one is
    /// never committed.
    pub(crate) fn apply_transition(
        &mut self,
        call: &QuestCall,
        reply_stage: QuestStage,
    ) -> TransitionOutcome {
        let previous = self.stage;
        let stale = reply_stage < previous;
        if stale {
            debug!(
                call = call.name(),
                current = previous.as_token(),
                reply = reply_stage.as_token(),
                "stale_stage_discarded"
            );
        }
        let next = previous.max(reply_stage);

        match call {
            QuestCall::Collect(kind) => {
                self.pending_collect.remove(kind);
            }
            QuestCall::Deliver(kind) => {
                self.pending_deliver.remove(kind);
            }
            _ => {}
        }

        if next != previous {
            self.stage = next;
            self.events.push_back(RegistryEvent::StageChanged {
                from: previous,
                to: next,
            });
            for kind in EmotionKind::CHAIN {
                if !kind.is_collected_at(previous) && kind.is_collected_at(next) {
                    self.events.push_back(RegistryEvent::Collected(kind));
                }
            }
            self.derive_visibility();
        }

        // Delivery is confirmed by the reply itself, not by the stage it
        // carries, since the stage may already be further along.
        if let QuestCall::Deliver(kind) = call {
            if kind.is_collected_at(self.stage) && self.delivered.insert(*kind) {
                self.events.push_back(RegistryEvent::Delivered(*kind));
            }
        }
        if self.stage >= QuestStage::RequestInput {
            self.delivered.extend(EmotionKind::CHAIN);
        }

        TransitionOutcome {
            stage: self.stage,
            stage_changed: next != previous,
            stale,
        }
    }

    /// Trips the terminal latch once every kind is delivered and the
    /// caller's dialogue has fully finished. Returns true exactly once.
    pub(crate) fn poll_terminal(&mut self, dialogue_idle: bool) -> bool {
        if self.all_delivered || !dialogue_idle {
            return false;
        }
        if !EmotionKind::CHAIN
            .iter()
            .all(|kind| self.delivered.contains(kind))
        {
            return false;
        }
        self.all_delivered = true;
        self.events.push_back(RegistryEvent::AllDelivered);
        info!(stage = self.stage.as_token(), "all_delivered");
        true
    }

    pub(crate) fn drain_events(&mut self, out: &mut Vec<RegistryEvent>) {
        out.extend(self.events.drain(..));
    }
}

pub(crate) fn is_near(actor: Vec2, object_position: Vec2, interaction_radius: f32) -> bool {
    actor.distance(object_position) <= interaction_radius
}
