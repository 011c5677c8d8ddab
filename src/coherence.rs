// src/coherence.rs
//! Проверка согласованности заселённого сектора и починка на месте

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::EntityTemplateProvider;
use crate::config::CoherenceSettings;
use crate::rng::RandomSource;
use crate::room::Room;
use crate::sector::{NodeId, Sector};

/// Что стадия согласованности нашла и исправила
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceReport {
    /// Снятые теги: (узел, тег)
    pub stripped_tags: Vec<(NodeId, String)>,
    /// Существа, потерявшие нужный тег: (узел, id шаблона)
    pub removed_entities: Vec<(NodeId, String)>,
    /// Тупики отмечаются, но не меняются
    pub dead_ends: Vec<NodeId>,
    pub unreachable: Vec<NodeId>,
}

impl CoherenceReport {
    #[must_use]
    pub fn repairs(&self) -> usize {
        self.stripped_tags.len() + self.removed_entities.len()
    }

    /// Нечего было чинить и все узлы достижимы
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.repairs() == 0 && self.unreachable.is_empty()
    }
}

/// Стадия 5: последнее место, где меняются теги и существа комнат.
///
/// Повторный запуск на собственном результате ничего не меняет.
pub trait CoherenceValidator: Send + Sync {
    fn validate_and_fix(
        &self,
        sector: &Sector,
        rooms: &mut BTreeMap<NodeId, Room>,
        rng: &mut dyn RandomSource,
    ) -> CoherenceReport;
}

pub struct TagCoherenceValidator {
    entities: Arc<dyn EntityTemplateProvider>,
    settings: CoherenceSettings,
}

impl TagCoherenceValidator {
    pub fn new(entities: Arc<dyn EntityTemplateProvider>, settings: CoherenceSettings) -> Self {
        Self { entities, settings }
    }

    /// Снимает по одному тегу из каждой конфликтующей пары.
    /// Теги только убираются, поэтому одного прохода по списку пар достаточно.
    fn resolve_conflicts(
        &self,
        room: &mut Room,
        rng: &mut dyn RandomSource,
        report: &mut CoherenceReport,
    ) {
        for conflict in &self.settings.conflicts {
            let first = conflict.first.to_lowercase();
            let second = conflict.second.to_lowercase();
            if !(room.has_tag(&first) && room.has_tag(&second)) {
                continue;
            }

            let loser = match self.settings.priority(&first).cmp(&self.settings.priority(&second)) {
                std::cmp::Ordering::Greater => second,
                std::cmp::Ordering::Less => first,
                // Бросок только при реальном конфликте, иначе повторный проход сдвинул бы поток
                std::cmp::Ordering::Equal => {
                    if rng.next_below(2) == 0 {
                        second
                    } else {
                        first
                    }
                }
            };

            tracing::debug!(node = room.node_id, tag = %loser, "снят конфликтующий тег");
            room.tags.remove(&loser);
            report.stripped_tags.push((room.node_id, loser));
        }
    }

    /// Убирает существ, которым больше не подходят теги комнаты
    fn evict_misplaced(&self, sector: &Sector, room: &mut Room, report: &mut CoherenceReport) {
        let templates = self.entities.entity_templates(sector.biome);
        let Room {
            node_id: node,
            tags,
            entities,
            ..
        } = room;

        entities.retain(|placed| {
            let fits = templates
                .iter()
                .find(|t| t.id == placed.template_id)
                .is_none_or(|t| t.required_tags.iter().all(|tag| tags.contains(tag)));
            if !fits {
                report.removed_entities.push((*node, placed.template_id.clone()));
            }
            fits
        });
    }
}

impl CoherenceValidator for TagCoherenceValidator {
    fn validate_and_fix(
        &self,
        sector: &Sector,
        rooms: &mut BTreeMap<NodeId, Room>,
        rng: &mut dyn RandomSource,
    ) -> CoherenceReport {
        let mut report = CoherenceReport::default();

        for room in rooms.values_mut() {
            self.resolve_conflicts(room, rng, &mut report);
            self.evict_misplaced(sector, room, &mut report);
        }

        // Починка меняет только содержимое комнат, рёбра не трогаем
        report.unreachable = sector.unreachable_from_start();
        if !report.unreachable.is_empty() {
            tracing::warn!(
                unreachable = ?report.unreachable,
                "часть узлов недостижима от входа, сектор возвращается как есть"
            );
        }
        report.dead_ends = sector.dead_ends();

        tracing::debug!(
            stripped = report.stripped_tags.len(),
            removed = report.removed_entities.len(),
            dead_ends = report.dead_ends.len(),
            "согласованность проверена"
        );
        report
    }
}
