pub mod instantiate;

use std::collections::BTreeSet;

use crate::sector::NodeId;
use crate::template::{EntityKind, RoomFeature, RoomType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Существо или ловушка, размещённые в комнате
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedEntity {
    pub template_id: String,
    pub name: String,
    pub kind: EntityKind,
    pub tier: String,
    /// Стоимость с учётом множителя тира
    pub threat_cost: u32,
    pub slot: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub to: RoomId,
    pub one_way: bool,
}

/// Конкретная комната, привязанная к узлу сектора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub node_id: NodeId,
    pub template_id: String,
    pub name: String,
    pub description: String,
    pub room_type: RoomType,
    pub depth: u32,
    pub tags: BTreeSet<String>,
    pub slots: Vec<String>,
    /// Доля бюджета угрозы, выделенная узлу
    pub threat_budget: u32,
    pub entities: Vec<PlacedEntity>,
    /// Детали обстановки, выпавшие при создании комнаты
    pub features: Vec<RoomFeature>,
    /// Заполняются при сборке подземелья
    pub exits: Vec<Exit>,
}

impl Room {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn placed_threat(&self) -> u32 {
        self.entities.iter().map(|e| e.threat_cost).sum()
    }

    #[must_use]
    pub fn remaining_budget(&self) -> u32 {
        self.threat_budget.saturating_sub(self.placed_threat())
    }

    /// Первый слот, ещё не занятый существом
    #[must_use]
    pub fn free_slot(&self) -> Option<&str> {
        self.slots
            .iter()
            .find(|slot| !self.entities.iter().any(|e| &e.slot == *slot))
            .map(String::as_str)
    }
}
