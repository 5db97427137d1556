//! Quest progression model shared by the registry, the session and the
//! quest service.

use serde::{Deserialize, Serialize};

/// Stages in the order the story moves through them. The derived `Ord`
/// follows declaration order, so "later than" is a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuestStage {
    Intro,
    GameStart,
    CollectPride,
    DeliverPride,
    CollectEnvy,
    DeliverEnvy,
    CollectLoneliness,
    DeliverLoneliness,
    CollectSadness,
    DeliverSadness,
    RequestInput,
    NpcSelection,
    Complete,
}

impl QuestStage {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::GameStart => "game_start",
            Self::CollectPride => "collect_pride",
            Self::DeliverPride => "deliver_pride",
            Self::CollectEnvy => "collect_envy",
            Self::DeliverEnvy => "deliver_envy",
            Self::CollectLoneliness => "collect_loneliness",
            Self::DeliverLoneliness => "deliver_loneliness",
            Self::CollectSadness => "collect_sadness",
            Self::DeliverSadness => "deliver_sadness",
            Self::RequestInput => "request_input",
            Self::NpcSelection => "npc_selection",
            Self::Complete => "complete",
        }
    }

    /// Short objective shown in the HUD.
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Intro => "Waking up",
            Self::GameStart => "Find the first star",
            Self::CollectPride => "Pride found",
            Self::DeliverPride => "Pride returned",
            Self::CollectEnvy => "Envy found",
            Self::DeliverEnvy => "Envy returned",
            Self::CollectLoneliness => "Loneliness found",
            Self::DeliverLoneliness => "Loneliness returned",
            Self::CollectSadness => "Sadness found",
            Self::DeliverSadness => "Sadness returned",
            Self::RequestInput => "Share your thoughts",
            Self::NpcSelection => "Choose a friend",
            Self::Complete => "Thank you for playing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum EmotionKind {
    Pride,
    Envy,
    Loneliness,
    Sadness,
}

impl EmotionKind {
    /// Collection order.
    pub(crate) const CHAIN: [EmotionKind; 4] =
        [Self::Pride, Self::Envy, Self::Loneliness, Self::Sadness];

    pub(crate) fn predecessor(self) -> Option<EmotionKind> {
        match self {
            Self::Pride => None,
            Self::Envy => Some(Self::Pride),
            Self::Loneliness => Some(Self::Envy),
            Self::Sadness => Some(Self::Loneliness),
        }
    }

    pub(crate) fn collected_stage(self) -> QuestStage {
        match self {
            Self::Pride => QuestStage::CollectPride,
            Self::Envy => QuestStage::CollectEnvy,
            Self::Loneliness => QuestStage::CollectLoneliness,
            Self::Sadness => QuestStage::CollectSadness,
        }
    }

    pub(crate) fn delivered_stage(self) -> QuestStage {
        match self {
            Self::Pride => QuestStage::DeliverPride,
            Self::Envy => QuestStage::DeliverEnvy,
            Self::Loneliness => QuestStage::DeliverLoneliness,
            Self::Sadness => QuestStage::DeliverSadness,
        }
    }

    /// First stage at which this kind's star may appear.
    pub(crate) fn unlock_stage(self) -> QuestStage {
        match self.predecessor() {
            None => QuestStage::GameStart,
            Some(previous) => previous.collected_stage(),
        }
    }

    pub(crate) fn is_collected_at(self, stage: QuestStage) -> bool {
        stage >= self.collected_stage()
    }

    /// The star is out in the world: unlocked and not yet picked up.
    pub(crate) fn is_collectible_at(self, stage: QuestStage) -> bool {
        stage >= self.unlock_stage() && !self.is_collected_at(stage)
    }

    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Pride => "pride",
            Self::Envy => "envy",
            Self::Loneliness => "loneliness",
            Self::Sadness => "sadness",
        }
    }

    pub(crate) fn display_name(self) -> &'static str {
        match self {
            Self::Pride => "Pride",
            Self::Envy => "Envy",
            Self::Loneliness => "Loneliness",
            Self::Sadness => "Sadness",
        }
    }
}

/// Remote operations gameplay can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QuestCall {
    CreateSession {
        display_name: String,
    },
    StartSession,
    AdvanceStage {
        target: QuestStage,
        selected_npc: Option<String>,
    },
    Collect(EmotionKind),
    Deliver(EmotionKind),
    Complete {
        contact_info: String,
        message: String,
    },
}

impl QuestCall {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::CreateSession { .. } => "create_session",
            Self::StartSession => "start_session",
            Self::AdvanceStage { .. } => "advance_stage",
            Self::Collect(_) => "collect",
            Self::Deliver(_) => "deliver",
            Self::Complete { .. } => "complete",
        }
    }

    /// Reply synthesized when the service cannot be reached. Depends only on
    /// the call, so repeating a failed call always lands on the same stage.
    pub(crate) fn fallback_reply(&self) -> QuestReply {
        match self {
            Self::CreateSession { display_name } => QuestReply::SessionCreated {
                session_id: offline_session_id(display_name),
            },
            Self::StartSession => QuestReply::progress(
                QuestStage::GameStart,
                ["Welcome. Four stars have scattered across the garden. Find them."],
            ),
            Self::AdvanceStage { target, .. } => {
                let line = match target {
                    QuestStage::RequestInput => "Everyone has their feelings back. Thank you.",
                    QuestStage::NpcSelection => "A good choice. They will be glad to hear it.",
                    _ => "The story moves on.",
                };
                QuestReply::progress(*target, [line])
            }
            Self::Collect(kind) => QuestReply::progress(
                kind.collected_stage(),
                [format!("You picked up the star of {}.", kind.display_name())],
            ),
            Self::Deliver(kind) => QuestReply::progress(
                kind.delivered_stage(),
                [format!("The star of {} is home again.", kind.display_name())],
            ),
            Self::Complete { .. } => {
                QuestReply::progress(QuestStage::Complete, ["Your message has been kept safe."])
            }
        }
    }
}

fn offline_session_id(display_name: &str) -> String {
    let slug: String = display_name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() {
        "offline-guest".to_string()
    } else {
        format!("offline-{slug}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QuestReply {
    SessionCreated {
        session_id: String,
    },
    Progress {
        stage: QuestStage,
        dialogue_lines: Vec<String>,
    },
}

impl QuestReply {
    pub(crate) fn progress<I, S>(stage: QuestStage, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Progress {
            stage,
            dialogue_lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionOrigin {
    Server,
    Fallback,
}

impl TransitionOrigin {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Fallback => "fallback",
        }
    }
}

/// A finished remote call, either answered by the service or synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestCompletion {
    pub(crate) request_id: u64,
    pub(crate) call: QuestCall,
    pub(crate) reply: QuestReply,
    pub(crate) origin: TransitionOrigin,
}
