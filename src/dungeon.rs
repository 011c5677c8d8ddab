// src/dungeon.rs
//! Итоговое подземелье и сборка его из комнат сектора

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::biome::Biome;
use crate::error::{GenerationError, GenerationResult};
use crate::room::{Exit, PlacedEntity, Room, RoomId};
use crate::sector::{NodeId, Sector};
use crate::template::{RoomFeature, RoomType};

/// Готовое подземелье. Единственный владелец своих комнат.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dungeon {
    pub name: String,
    pub biome: Biome,
    /// Сид, по которому подземелье можно воспроизвести
    pub seed: u64,
    /// Бюджет угрозы всего сектора
    pub threat_budget: u32,
    pub rooms: BTreeMap<RoomId, Room>,
    pub start_room: Option<RoomId>,
}

impl Dungeon {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    #[must_use]
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    #[must_use]
    pub fn start(&self) -> Option<&Room> {
        self.start_room.and_then(|id| self.room(id))
    }

    #[must_use]
    pub fn room_for_node(&self, node: NodeId) -> Option<&Room> {
        self.rooms.values().find(|r| r.node_id == node)
    }

    /// Суммарная стоимость всех размещённых существ
    #[must_use]
    pub fn total_threat(&self) -> u32 {
        self.rooms.values().map(Room::placed_threat).sum()
    }

    /// Структурный вид без случайных идентификаторов комнат: два прогона
    /// с одним сидом дают равные раскладки.
    #[must_use]
    pub fn layout(&self) -> DungeonLayout {
        let node_of: BTreeMap<RoomId, NodeId> =
            self.rooms.values().map(|r| (r.id, r.node_id)).collect();

        let mut rooms: Vec<RoomLayout> = self
            .rooms
            .values()
            .map(|r| RoomLayout {
                node_id: r.node_id,
                template_id: r.template_id.clone(),
                name: r.name.clone(),
                description: r.description.clone(),
                room_type: r.room_type,
                depth: r.depth,
                tags: r.tags.clone(),
                threat_budget: r.threat_budget,
                entities: r.entities.clone(),
                features: r.features.clone(),
                exits: r
                    .exits
                    .iter()
                    .filter_map(|e| node_of.get(&e.to).map(|&to| (to, e.one_way)))
                    .collect(),
            })
            .collect();
        rooms.sort_by_key(|r| r.node_id);

        DungeonLayout {
            name: self.name.clone(),
            biome: self.biome,
            seed: self.seed,
            start_node: self.start().map(|r| r.node_id),
            rooms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomLayout {
    pub node_id: NodeId,
    pub template_id: String,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub depth: u32,
    pub tags: BTreeSet<String>,
    pub threat_budget: u32,
    pub entities: Vec<PlacedEntity>,
    pub features: Vec<RoomFeature>,
    /// (узел назначения, односторонний)
    pub exits: Vec<(NodeId, bool)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DungeonLayout {
    pub name: String,
    pub biome: Biome,
    pub seed: u64,
    pub start_node: Option<NodeId>,
    pub rooms: Vec<RoomLayout>,
}

/// Стадия 6: перекладывает комнаты в подземелье и расставляет выходы
pub trait DungeonAssembler: Send + Sync {
    fn build(
        &self,
        name: &str,
        seed: u64,
        sector: &Sector,
        rooms: BTreeMap<NodeId, Room>,
    ) -> GenerationResult<Dungeon>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAssembler;

/// Выходы по рёбрам сектора; одностороннее ребро даёт один выход
fn wire_exits(sector: &Sector, rooms: &mut BTreeMap<NodeId, Room>) {
    for edge in &sector.edges {
        let (Some(from), Some(to)) = (
            rooms.get(&edge.from).map(|r| r.id),
            rooms.get(&edge.to).map(|r| r.id),
        ) else {
            tracing::warn!(from = edge.from, to = edge.to, "ребро без комнаты пропущено");
            continue;
        };

        if let Some(room) = rooms.get_mut(&edge.from) {
            room.exits.push(Exit {
                to,
                one_way: edge.one_way,
            });
        }
        if !edge.one_way {
            if let Some(room) = rooms.get_mut(&edge.to) {
                room.exits.push(Exit {
                    to: from,
                    one_way: false,
                });
            }
        }
    }
}

impl DungeonAssembler for DefaultAssembler {
    fn build(
        &self,
        name: &str,
        seed: u64,
        sector: &Sector,
        mut rooms: BTreeMap<NodeId, Room>,
    ) -> GenerationResult<Dungeon> {
        if name.trim().is_empty() {
            return Err(GenerationError::validation("имя подземелья не может быть пустым"));
        }

        wire_exits(sector, &mut rooms);
        let start_room = rooms.get(&sector.start).map(|r| r.id);
        if start_room.is_none() {
            tracing::warn!(start = sector.start, "у стартового узла нет комнаты");
        }

        Ok(Dungeon {
            name: name.to_string(),
            biome: sector.biome,
            seed,
            threat_budget: sector.budget.total,
            rooms: rooms.into_values().map(|r| (r.id, r)).collect(),
            start_room,
        })
    }
}
