use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must not start with '/'")]
    LeadingSlash,
    #[error("sprite key must not contain '\\\\'")]
    Backslash,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Keys are lowercase relative paths under the sprite root, without extension.
pub fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(SpriteKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    match key
        .chars()
        .find(|&ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        Some(character) => Err(SpriteKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}

pub fn sprite_path(sprites_root: &Path, key: &str) -> Result<PathBuf, SpriteKeyError> {
    validate_sprite_key(key)?;
    Ok(sprites_root.join(format!("{key}.png")))
}

/// Groups of images the game cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetCategory {
    World,
    Player,
    Npc,
    Item,
    Prop,
    Collision,
}

impl AssetCategory {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Player => "player",
            Self::Npc => "npc",
            Self::Item => "item",
            Self::Prop => "prop",
            Self::Collision => "collision",
        }
    }
}

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("invalid sprite key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: SpriteKeyError,
    },
    #[error("failed to open sprite '{key}' at {path}: {source}")]
    Open {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode sprite '{key}' at {path}: {source}")]
    Decode {
        key: String,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("collision mask failed to load: {reason}")]
    Collision { reason: String },
    #[error(
        "collision mask is {mask_width}x{mask_height} but world art is {world_width}x{world_height}"
    )]
    DimensionMismatch {
        mask_width: u32,
        mask_height: u32,
        world_width: u32,
        world_height: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryState {
    Pending,
    Loaded,
    Failed(String),
}

/// Per-category load bookkeeping. Gameplay may start only once every
/// expected category reports loaded.
#[derive(Debug, Clone, Default)]
pub struct AssetReadiness {
    states: BTreeMap<AssetCategory, CategoryState>,
}

impl AssetReadiness {
    pub fn expecting(categories: &[AssetCategory]) -> Self {
        Self {
            states: categories
                .iter()
                .map(|category| (*category, CategoryState::Pending))
                .collect(),
        }
    }

    pub fn mark_loaded(&mut self, category: AssetCategory) {
        self.states.insert(category, CategoryState::Loaded);
    }

    pub fn mark_failed(&mut self, category: AssetCategory, reason: impl Into<String>) {
        self.states
            .insert(category, CategoryState::Failed(reason.into()));
    }

    pub fn state(&self, category: AssetCategory) -> Option<&CategoryState> {
        self.states.get(&category)
    }

    pub fn is_ready(&self) -> bool {
        !self.states.is_empty()
            && self
                .states
                .values()
                .all(|state| *state == CategoryState::Loaded)
    }

    pub fn first_failure(&self) -> Option<(AssetCategory, &str)> {
        self.states.iter().find_map(|(category, state)| match state {
            CategoryState::Failed(reason) => Some((*category, reason.as_str())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decoded sprites keyed by sprite key. Filled up front so drawing never
/// touches the filesystem.
#[derive(Debug, Default)]
pub struct SpriteStore {
    sprites_root: PathBuf,
    sprites: HashMap<String, LoadedSprite>,
}

impl SpriteStore {
    pub fn new(sprites_root: PathBuf) -> Self {
        Self {
            sprites_root,
            sprites: HashMap::new(),
        }
    }

    pub fn sprites_root(&self) -> &Path {
        &self.sprites_root
    }

    pub fn get(&self, key: &str) -> Option<&LoadedSprite> {
        self.sprites.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, sprite: LoadedSprite) {
        self.sprites.insert(key.into(), sprite);
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn load(&mut self, key: &str) -> Result<&LoadedSprite, AssetLoadError> {
        if !self.sprites.contains_key(key) {
            let sprite = load_sprite_rgba(&self.sprites_root, key)?;
            self.sprites.insert(key.to_string(), sprite);
        }
        Ok(&self.sprites[key])
    }

    /// Loads every key of one category and records the outcome. The first
    /// failing key fails the whole category.
    pub fn preload_category<'a>(
        &mut self,
        category: AssetCategory,
        keys: impl IntoIterator<Item = &'a str>,
        readiness: &mut AssetReadiness,
    ) -> Result<(), AssetLoadError> {
        let mut loaded = 0usize;
        for key in keys {
            if let Err(error) = self.load(key) {
                warn!(
                    category = category.as_token(),
                    sprite_key = key,
                    error = %error,
                    "asset_load_failed"
                );
                readiness.mark_failed(category, error.to_string());
                return Err(error);
            }
            loaded += 1;
        }
        readiness.mark_loaded(category);
        info!(category = category.as_token(), loaded, "asset_category_loaded");
        Ok(())
    }
}

fn load_sprite_rgba(sprites_root: &Path, key: &str) -> Result<LoadedSprite, AssetLoadError> {
    let path = sprite_path(sprites_root, key).map_err(|source| AssetLoadError::InvalidKey {
        key: key.to_string(),
        source,
    })?;
    let reader = ImageReader::open(&path).map_err(|source| AssetLoadError::Open {
        key: key.to_string(),
        path: path.clone(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetLoadError::Decode {
        key: key.to_string(),
        path: path.clone(),
        source,
    })?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
