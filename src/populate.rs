// src/populate.rs
//! Заселение комнат существами в пределах бюджета угрозы

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{EntityTemplateProvider, TierProvider};
use crate::config::PopulationSettings;
use crate::rng::RandomSource;
use crate::room::{PlacedEntity, Room};
use crate::sector::{NodeId, Sector};
use crate::template::{EntityTemplate, TierDefinition};

/// Стадия 4: тратит долю бюджета каждой комнаты на шаблоны существ.
///
/// Использует общий источник случайности (а не новый), чтобы вся генерация
/// оставалась одной линейной последовательностью бросков.
pub trait EntityPopulator: Send + Sync {
    fn populate_sector(
        &self,
        sector: &Sector,
        rooms: &mut BTreeMap<NodeId, Room>,
        rng: &mut dyn RandomSource,
    );
}

pub struct BudgetedEntityPopulator {
    entities: Arc<dyn EntityTemplateProvider>,
    tiers: Arc<dyn TierProvider>,
    settings: PopulationSettings,
}

impl BudgetedEntityPopulator {
    pub fn new(
        entities: Arc<dyn EntityTemplateProvider>,
        tiers: Arc<dyn TierProvider>,
        settings: PopulationSettings,
    ) -> Self {
        Self {
            entities,
            tiers,
            settings,
        }
    }

    fn is_non_combat(&self, room: &Room) -> bool {
        self.settings
            .non_combat_tags
            .iter()
            .any(|tag| room.has_tag(&tag.to_lowercase()))
    }

    fn populate_room(&self, sector: &Sector, room: &mut Room, rng: &mut dyn RandomSource) {
        let capacity = room.slots.len().min(self.settings.max_entities_per_room);

        // Тиры ищутся один раз на комнату: набор шаблонов внутри комнаты не меняется
        let pool: Vec<(&EntityTemplate, TierDefinition)> = self
            .entities
            .entity_templates(sector.biome)
            .into_iter()
            .filter(|e| e.fits_room(sector.biome, &room.tags))
            .map(|e| (e, self.tiers.tier(&e.tier)))
            .filter(|(_, tier)| tier.spawn_weight > 0)
            .collect();

        while room.entities.len() < capacity {
            let remaining = room.remaining_budget();
            let affordable: Vec<&(&EntityTemplate, TierDefinition)> = pool
                .iter()
                .filter(|(e, tier)| tier.effective_cost(e.threat_cost) <= remaining)
                .collect();
            let weights: Vec<u32> = affordable.iter().map(|(_, tier)| tier.spawn_weight).collect();

            let Some(pick) = rng.pick_weighted(&weights) else {
                break;
            };
            let Some(slot) = room.free_slot().map(str::to_string) else {
                break;
            };

            let (template, tier) = affordable[pick];
            room.entities.push(PlacedEntity {
                template_id: template.id.clone(),
                name: template.name.clone(),
                kind: template.kind,
                tier: tier.id.clone(),
                threat_cost: tier.effective_cost(template.threat_cost),
                slot,
            });
        }
    }
}

impl EntityPopulator for BudgetedEntityPopulator {
    fn populate_sector(
        &self,
        sector: &Sector,
        rooms: &mut BTreeMap<NodeId, Room>,
        rng: &mut dyn RandomSource,
    ) {
        for room in rooms.values_mut() {
            if self.is_non_combat(room) {
                tracing::trace!(node = room.node_id, "мирная комната, не заселяем");
                continue;
            }
            self.populate_room(sector, room, rng);
            tracing::trace!(
                node = room.node_id,
                placed = room.entities.len(),
                spent = room.placed_threat(),
                budget = room.threat_budget,
                "комната заселена"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;
    use crate::catalog::Catalog;
    use crate::rng::{ScriptedRandom, SeededRandom};
    use crate::room::RoomId;
    use crate::template::RoomType;
    use std::collections::BTreeSet;

    const CATALOG: &str = r#"
        [[tiers]]
        id = "common"
        spawn_weight = 3

        [[tiers]]
        id = "rare"
        spawn_weight = 1
        cost_multiplier = 2.0

        [[tiers]]
        id = "never"
        spawn_weight = 0

        [[entities]]
        id = "rat"
        name = "Rat"
        tier = "common"
        threat_cost = 2
        biomes = ["Citadel"]

        [[entities]]
        id = "knight"
        name = "Knight"
        tier = "RARE"
        threat_cost = 4
        biomes = ["Citadel"]

        [[entities]]
        id = "ghost"
        name = "Ghost"
        tier = "never"
        threat_cost = 1
        biomes = ["Citadel"]

        [[entities]]
        id = "eel"
        name = "Eel"
        tier = "common"
        threat_cost = 1
        biomes = ["Citadel"]
        required_tags = ["wet"]
    "#;

    fn populator(max: usize) -> BudgetedEntityPopulator {
        let catalog = Arc::new(Catalog::from_toml_str(CATALOG).unwrap());
        BudgetedEntityPopulator::new(
            catalog.clone(),
            catalog,
            PopulationSettings {
                max_entities_per_room: max,
                ..PopulationSettings::default()
            },
        )
    }

    fn room(node_id: NodeId, budget: u32, slots: usize, tags: &[&str]) -> Room {
        Room {
            id: RoomId::new(),
            node_id,
            template_id: "t".into(),
            name: "Room".into(),
            description: String::new(),
            room_type: RoomType::Chamber,
            depth: 1,
            tags: tags.iter().map(|t| (*t).to_string()).collect::<BTreeSet<_>>(),
            slots: (0..slots).map(|i| format!("slot_{i}")).collect(),
            threat_budget: budget,
            entities: Vec::new(),
            features: Vec::new(),
            exits: Vec::new(),
        }
    }

    fn rooms_of(list: Vec<Room>) -> BTreeMap<NodeId, Room> {
        list.into_iter().map(|r| (r.node_id, r)).collect()
    }

    #[test]
    fn never_exceeds_room_budget() {
        let sector = Sector::new(Biome::Citadel, 1);
        for seed in 0..30 {
            let mut rooms = rooms_of(vec![room(1, 13, 6, &[])]);
            populator(6).populate_sector(&sector, &mut rooms, &mut SeededRandom::new(seed));
            let r = &rooms[&1];
            assert!(r.placed_threat() <= r.threat_budget, "seed {seed}");
            assert!(!r.entities.is_empty());
        }
    }

    #[test]
    fn stops_when_nothing_fits() {
        let sector = Sector::new(Biome::Citadel, 1);
        // бюджет 5: крыса (2) + крыса (2) = 4, остаток 1 — никто не влезает
        let mut rooms = rooms_of(vec![room(1, 5, 6, &[])]);
        let mut rng = ScriptedRandom::new([0, 0]);
        populator(6).populate_sector(&sector, &mut rooms, &mut rng);
        let ids: Vec<&str> = rooms[&1].entities.iter().map(|e| e.template_id.as_str()).collect();
        assert_eq!(ids, vec!["rat", "rat"]);
        assert_eq!(rooms[&1].remaining_budget(), 1);
        assert_eq!(rng.draws, 2);
    }

    #[test]
    fn tier_multiplier_and_case_insensitive_lookup() {
        let sector = Sector::new(Biome::Citadel, 1);
        // веса: rat 3, knight 1 → бросок 3 выбирает рыцаря, стоимость 4 * 2.0
        let mut rooms = rooms_of(vec![room(1, 8, 1, &[])]);
        let mut rng = ScriptedRandom::new([3]);
        populator(4).populate_sector(&sector, &mut rooms, &mut rng);
        let knight = &rooms[&1].entities[0];
        assert_eq!(knight.template_id, "knight");
        assert_eq!(knight.tier, "rare");
        assert_eq!(knight.threat_cost, 8);
        assert_eq!(knight.slot, "slot_0");
    }

    #[test]
    fn zero_weight_tier_never_spawns_and_tags_gate_entities() {
        let sector = Sector::new(Biome::Citadel, 1);
        for seed in 0..20 {
            let mut rooms = rooms_of(vec![room(1, 30, 8, &[]), room(2, 30, 8, &["wet"])]);
            populator(8).populate_sector(&sector, &mut rooms, &mut SeededRandom::new(seed));
            assert!(rooms.values().flat_map(|r| &r.entities).all(|e| e.template_id != "ghost"));
            assert!(rooms[&1].entities.iter().all(|e| e.template_id != "eel"));
        }
    }

    #[test]
    fn capacity_is_min_of_slots_and_limit() {
        let sector = Sector::new(Biome::Citadel, 1);
        let mut rooms = rooms_of(vec![room(1, 100, 5, &[]), room(2, 100, 2, &[])]);
        populator(3).populate_sector(&sector, &mut rooms, &mut SeededRandom::new(1));
        assert_eq!(rooms[&1].entities.len(), 3);
        assert_eq!(rooms[&2].entities.len(), 2);
        let slots: BTreeSet<&str> = rooms[&1].entities.iter().map(|e| e.slot.as_str()).collect();
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn non_combat_rooms_are_skipped_without_draws() {
        let sector = Sector::new(Biome::Citadel, 1);
        let mut rooms = rooms_of(vec![room(1, 50, 4, &["entrance"]), room(2, 50, 4, &["rest"])]);
        let mut rng = ScriptedRandom::new([]);
        populator(4).populate_sector(&sector, &mut rooms, &mut rng);
        assert!(rooms.values().all(|r| r.entities.is_empty()));
        assert_eq!(rng.draws, 0);
    }

    #[test]
    fn unknown_tier_falls_back_to_common() {
        let catalog = Arc::new(
            Catalog::from_toml_str(
                r#"
                [[tiers]]
                id = "common"
                spawn_weight = 1

                [[entities]]
                id = "odd"
                name = "Odd"
                tier = "mythic"
                threat_cost = 3
                biomes = ["Forest"]
            "#,
            )
            .unwrap(),
        );
        let populator =
            BudgetedEntityPopulator::new(catalog.clone(), catalog, PopulationSettings::default());
        let sector = Sector::new(Biome::Forest, 1);
        let mut rooms = rooms_of(vec![room(1, 3, 2, &[])]);
        populator.populate_sector(&sector, &mut rooms, &mut SeededRandom::new(0));
        assert_eq!(rooms[&1].entities.len(), 1);
        assert_eq!(rooms[&1].entities[0].tier, "common");
    }
}
