// src/template.rs
//! Неизменяемые записи каталога: шаблоны комнат, шаблоны существ и тиры редкости.
//! Загружаются один раз при старте и больше не меняются.

use crate::biome::Biome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Архетип комнаты
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Corridor,
    Chamber,
    Junction,
    DeadEnd,
    Stairwell,
    BossArena,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomTemplate {
    pub id: String,
    pub name: String,
    /// Описание с плейсхолдерами `{ADJ_SIZE}`, `{ADJ_ATMOSPHERE}`, `{ADJ_CONDITION}`
    pub description: String,
    pub room_type: RoomType,
    pub biomes: Vec<Biome>,
    #[serde(default = "default_min_depth")]
    pub min_depth: u32,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default = "default_min_exits")]
    pub min_exits: usize,
    #[serde(default = "default_max_exits")]
    pub max_exits: usize,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Места, которые могут занять существа; их число ограничивает заселение
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Необязательные детали обстановки; каждая бросается отдельно
    #[serde(default)]
    pub features: Vec<RoomFeature>,
}

/// Вид детали обстановки комнаты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Interactable,
    Decoration,
    Hazard,
    LightSource,
}

/// Деталь обстановки: появляется в комнате с вероятностью `spawn_chance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomFeature {
    pub kind: FeatureKind,
    pub id: String,
    pub spawn_chance: f64,
}

fn default_min_depth() -> u32 {
    1
}
fn default_min_exits() -> usize {
    1
}
fn default_max_exits() -> usize {
    4
}
fn default_weight() -> u32 {
    1
}

impl RoomTemplate {
    #[must_use]
    pub fn allows_biome(&self, biome: Biome) -> bool {
        self.biomes.contains(&biome)
    }

    #[must_use]
    pub fn allows_depth(&self, depth: u32) -> bool {
        depth >= self.min_depth && self.max_depth.is_none_or(|max| depth <= max)
    }

    #[must_use]
    pub fn allows_exits(&self, exits: usize) -> bool {
        (self.min_exits..=self.max_exits).contains(&exits)
    }

    /// Синтетический шаблон на случай, когда каталог не дал ни одного кандидата
    #[must_use]
    pub fn fallback(biome: Biome) -> Self {
        Self {
            id: format!("fallback_{}_chamber", format!("{biome:?}").to_lowercase()),
            name: biome.fallback_name().to_string(),
            description: biome.fallback_description().to_string(),
            room_type: RoomType::Chamber,
            biomes: vec![biome],
            min_depth: 0,
            max_depth: None,
            min_exits: 0,
            max_exits: usize::MAX,
            weight: 1,
            slots: vec!["center".to_string(), "corner".to_string()],
            tags: BTreeSet::from(["fallback".to_string()]),
            features: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EntityKind {
    #[default]
    Monster,
    Hazard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: EntityKind,
    /// Идентификатор тира; регистр не важен
    pub tier: String,
    pub threat_cost: u32,
    pub biomes: Vec<Biome>,
    /// Комната должна нести все эти теги; пустой список — любая комната
    #[serde(default)]
    pub required_tags: Vec<String>,
}

impl EntityTemplate {
    #[must_use]
    pub fn fits_room(&self, biome: Biome, room_tags: &BTreeSet<String>) -> bool {
        self.biomes.contains(&biome) && self.required_tags.iter().all(|t| room_tags.contains(t))
    }
}

/// Тир редкости: вес появления и множитель стоимости угрозы
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierDefinition {
    pub id: String,
    pub spawn_weight: u32,
    #[serde(default = "default_cost_multiplier")]
    pub cost_multiplier: f64,
}

fn default_cost_multiplier() -> f64 {
    1.0
}

pub const COMMON_TIER: &str = "common";

impl TierDefinition {
    /// Запасной тир, если в каталоге нет даже `common`
    #[must_use]
    pub fn builtin_common() -> Self {
        Self {
            id: COMMON_TIER.to_string(),
            spawn_weight: 1,
            cost_multiplier: 1.0,
        }
    }

    /// Итоговая стоимость существа этого тира: `ceil(cost * multiplier)`, не меньше 1
    #[must_use]
    pub fn effective_cost(&self, threat_cost: u32) -> u32 {
        let scaled = (f64::from(threat_cost) * self.cost_multiplier.max(0.0)).ceil();
        (scaled as u32).max(1)
    }
}
