//! Static world content: where every star, prop and NPC sits, and which
//! sprites each asset category needs.

use engine::{AssetCategory, Vec2};

use super::quest::EmotionKind;

pub(crate) const BACKGROUND_SPRITE_KEY: &str = "world/background";
pub(crate) const COLLISION_SPRITE_KEY: &str = "world/collision";

pub(crate) const PLAYER_SPAWN: Vec2 = Vec2::new(96.0, 300.0);
pub(crate) const PLAYER_SIZE: Vec2 = Vec2::new(16.0, 24.0);

const STAR_SIZE: Vec2 = Vec2::new(16.0, 16.0);
const PROP_SIZE: Vec2 = Vec2::new(16.0, 16.0);
const NPC_SIZE: Vec2 = Vec2::new(20.0, 28.0);
const STAR_RADIUS: f32 = 28.0;
const PROP_RADIUS: f32 = 28.0;
const NPC_RADIUS: f32 = 36.0;

/// Speaker name for quest narration and the closing exchange.
pub(crate) const QUEST_GIVER_NAME: &str = "Rose";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PropKind {
    Book,
    Write,
    Pen,
}

impl PropKind {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Write => "write",
            Self::Pen => "pen",
        }
    }

    /// Line shown when the prop's companion screen opens.
    pub(crate) fn companion_hint(self) -> &'static str {
        match self {
            Self::Book => "The book falls open to a page about the team.",
            Self::Write => "A notepad waits for your thoughts.",
            Self::Pen => "The pen is still warm. Someone was drawing.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectKind {
    Collectible(EmotionKind),
    Prop(PropKind),
}

/// A star or a prop. Never removed from the world, only hidden.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WorldObject {
    pub(crate) id: &'static str,
    pub(crate) position: Vec2,
    pub(crate) size: Vec2,
    pub(crate) interaction_radius: f32,
    pub(crate) sprite_key: &'static str,
    pub(crate) kind: ObjectKind,
    pub(crate) has_been_used: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NpcObject {
    pub(crate) id: &'static str,
    pub(crate) display_name: &'static str,
    pub(crate) position: Vec2,
    pub(crate) size: Vec2,
    pub(crate) interaction_radius: f32,
    pub(crate) sprite_key: &'static str,
    pub(crate) accepts: EmotionKind,
    /// Spoken after the star comes home.
    pub(crate) thanks_line: &'static str,
}

fn star(id: &'static str, kind: EmotionKind, x: f32, y: f32, sprite_key: &'static str) -> WorldObject {
    WorldObject {
        id,
        position: Vec2::new(x, y),
        size: STAR_SIZE,
        interaction_radius: STAR_RADIUS,
        sprite_key,
        kind: ObjectKind::Collectible(kind),
        has_been_used: false,
    }
}

fn prop(kind: PropKind, x: f32, y: f32, sprite_key: &'static str) -> WorldObject {
    WorldObject {
        id: kind.as_token(),
        position: Vec2::new(x, y),
        size: PROP_SIZE,
        interaction_radius: PROP_RADIUS,
        sprite_key,
        kind: ObjectKind::Prop(kind),
        has_been_used: false,
    }
}

pub(crate) fn default_objects() -> Vec<WorldObject> {
    vec![
        star("star_pride", EmotionKind::Pride, 260.0, 180.0, "items/pride"),
        star("star_envy", EmotionKind::Envy, 620.0, 140.0, "items/envy"),
        star("star_loneliness", EmotionKind::Loneliness, 800.0, 460.0, "items/loneliness"),
        star("star_sadness", EmotionKind::Sadness, 300.0, 540.0, "items/sadness"),
        prop(PropKind::Book, 150.0, 120.0, "props/book"),
        prop(PropKind::Write, 480.0, 320.0, "props/write"),
        prop(PropKind::Pen, 700.0, 330.0, "props/pen"),
    ]
}

pub(crate) fn default_npcs() -> Vec<NpcObject> {
    vec![
        NpcObject {
            id: "npc_ines",
            display_name: "Ines",
            position: Vec2::new(420.0, 200.0),
            size: NPC_SIZE,
            interaction_radius: NPC_RADIUS,
            sprite_key: "npcs/ines",
            accepts: EmotionKind::Pride,
            thanks_line: "I can stand a little taller now.",
        },
        NpcObject {
            id: "npc_bram",
            display_name: "Bram",
            position: Vec2::new(720.0, 240.0),
            size: NPC_SIZE,
            interaction_radius: NPC_RADIUS,
            sprite_key: "npcs/bram",
            accepts: EmotionKind::Envy,
            thanks_line: "Funny, I don't mind what the others have anymore.",
        },
        NpcObject {
            id: "npc_wren",
            display_name: "Wren",
            position: Vec2::new(560.0, 500.0),
            size: NPC_SIZE,
            interaction_radius: NPC_RADIUS,
            sprite_key: "npcs/wren",
            accepts: EmotionKind::Loneliness,
            thanks_line: "You came all this way for me?",
        },
        NpcObject {
            id: "npc_sol",
            display_name: "Sol",
            position: Vec2::new(160.0, 460.0),
            size: NPC_SIZE,
            interaction_radius: NPC_RADIUS,
            sprite_key: "npcs/sol",
            accepts: EmotionKind::Sadness,
            thanks_line: "It is okay to feel this. I'm glad it's back.",
        },
    ]
}

/// Lines Rose says after the final delivery, before the ending.
pub(crate) const CLOSING_LINES: [&str; 2] = [
    "That was the last one. Everyone is whole again.",
    "Before you go, would you tell us what you felt?",
];

pub(crate) const PLAYER_SPRITE_KEYS: [&str; 8] = [
    "player/up_1",
    "player/up_2",
    "player/down_1",
    "player/down_2",
    "player/left_1",
    "player/left_2",
    "player/right_1",
    "player/right_2",
];

/// Sprite keys per category in load order. Collision is loaded as a mask,
/// not as a sprite, and is handled separately.
pub(crate) fn sprite_keys_by_category(
    objects: &[WorldObject],
    npcs: &[NpcObject],
) -> Vec<(AssetCategory, Vec<&'static str>)> {
    let keys_of = |want_prop: bool| -> Vec<&'static str> {
        objects
            .iter()
            .filter(|object| matches!(object.kind, ObjectKind::Prop(_)) == want_prop)
            .map(|object| object.sprite_key)
            .collect()
    };
    vec![
        (AssetCategory::World, vec![BACKGROUND_SPRITE_KEY]),
        (AssetCategory::Player, PLAYER_SPRITE_KEYS.to_vec()),
        (
            AssetCategory::Npc,
            npcs.iter().map(|npc| npc.sprite_key).collect(),
        ),
        (AssetCategory::Item, keys_of(false)),
        (AssetCategory::Prop, keys_of(true)),
    ]
}
