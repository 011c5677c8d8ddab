// src/room/instantiate.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::RoomTemplateProvider;
use crate::config::TagFilter;
use crate::rng::RandomSource;
use crate::room::{Room, RoomId};
use crate::sector::{NodeId, Sector, SectorNode};
use crate::template::{RoomTemplate, RoomType};

pub const ENTRANCE_TAG: &str = "entrance";
pub const BOSS_TAG: &str = "boss";

const ADJECTIVES: [(&str, &[&str]); 3] = [
    (
        "{ADJ_SIZE}",
        &["cramped", "narrow", "modest", "wide", "vast", "cavernous"],
    ),
    (
        "{ADJ_ATMOSPHERE}",
        &["flickering", "oppressive", "still", "hazy", "eerie", "cold"],
    ),
    (
        "{ADJ_CONDITION}",
        &["crumbling", "weathered", "intact", "ruined", "scarred", "cracked"],
    ),
];

/// Стадия 3: по одной комнате на каждый узел сектора, без пропусков
pub trait RoomInstantiator: Send + Sync {
    fn instantiate_sector(
        &self,
        sector: &Sector,
        rng: &mut dyn RandomSource,
    ) -> BTreeMap<NodeId, Room>;
}

/// Взвешенный выбор шаблона из каталога с откатом на синтетическую комнату
pub struct WeightedRoomInstantiator {
    catalog: Arc<dyn RoomTemplateProvider>,
    filter: TagFilter,
}

impl WeightedRoomInstantiator {
    pub fn new(catalog: Arc<dyn RoomTemplateProvider>, filter: TagFilter) -> Self {
        Self { catalog, filter }
    }

    fn candidates(&self, sector: &Sector, node: &SectorNode, is_boss: bool) -> Vec<&RoomTemplate> {
        self.catalog
            .room_templates(sector.biome, node.depth, &self.filter)
            .into_iter()
            .filter(|t| t.allows_exits(node.degree))
            .filter(|t| (t.room_type == RoomType::BossArena) == is_boss)
            .collect()
    }
}

/// Подставляет прилагательные вместо плейсхолдеров, по одному броску на вхождение
pub fn resolve_placeholders(pattern: &str, rng: &mut dyn RandomSource) -> String {
    let mut text = pattern.to_string();
    for (token, words) in ADJECTIVES {
        while let Some(pos) = text.find(token) {
            let word = words[rng.next_below(words.len() as u32) as usize];
            text.replace_range(pos..pos + token.len(), word);
        }
    }
    text
}

fn materialize(
    template: &RoomTemplate,
    sector: &Sector,
    node: &SectorNode,
    is_boss: bool,
    rng: &mut dyn RandomSource,
) -> Room {
    let mut tags = template.tags.clone();
    tags.extend(sector.biome.ambient_tags().iter().map(|t| (*t).to_string()));
    if node.id == sector.start {
        tags.insert(ENTRANCE_TAG.to_string());
    }
    if is_boss {
        tags.insert(BOSS_TAG.to_string());
    }

    let description = resolve_placeholders(&template.description, rng);
    // По одному броску на деталь, в порядке шаблона
    let features = template
        .features
        .iter()
        .filter(|feature| rng.chance(feature.spawn_chance))
        .cloned()
        .collect();

    Room {
        id: RoomId::new(),
        node_id: node.id,
        template_id: template.id.clone(),
        name: template.name.clone(),
        description,
        room_type: template.room_type,
        depth: node.depth,
        tags,
        slots: template.slots.clone(),
        threat_budget: sector.budget.share(node.id),
        entities: Vec::new(),
        features,
        exits: Vec::new(),
    }
}

impl RoomInstantiator for WeightedRoomInstantiator {
    fn instantiate_sector(
        &self,
        sector: &Sector,
        rng: &mut dyn RandomSource,
    ) -> BTreeMap<NodeId, Room> {
        let boss = sector.boss_node();
        let mut rooms = BTreeMap::new();

        // Узлы лежат по возрастанию id — порядок бросков фиксирован
        for node in &sector.nodes {
            let is_boss = boss == Some(node.id);
            let candidates = self.candidates(sector, node, is_boss);
            let weights: Vec<u32> = candidates.iter().map(|t| t.weight).collect();

            let room = match rng.pick_weighted(&weights) {
                Some(i) => materialize(candidates[i], sector, node, is_boss, rng),
                None => {
                    tracing::warn!(
                        node = node.id,
                        biome = %sector.biome,
                        depth = node.depth,
                        exits = node.degree,
                        "нет подходящего шаблона, используем запасную комнату"
                    );
                    let fallback = RoomTemplate::fallback(sector.biome);
                    materialize(&fallback, sector, node, is_boss, rng)
                }
            };
            rooms.insert(node.id, room);
        }
        rooms
    }
}
