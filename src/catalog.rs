// src/catalog.rs
//! Каталоги шаблонов, которые потребляет конвейер
//!
//! Конвейер видит каталог только через три узких трейта: поиск шаблонов комнат,
//! поиск шаблонов существ и поиск тиров. `Catalog` реализует все три и
//! загружается из TOML (встроенный каталог или пользовательский файл).

use crate::biome::Biome;
use crate::config::TagFilter;
use crate::error::{GenerationError, GenerationResult};
use crate::template::{COMMON_TIER, EntityTemplate, RoomTemplate, TierDefinition};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.toml");

/// Поиск шаблонов комнат. Порядок результата должен быть стабильным:
/// от него зависит детерминированность взвешенного выбора.
pub trait RoomTemplateProvider: Send + Sync {
    fn room_templates(&self, biome: Biome, depth: u32, filter: &TagFilter) -> Vec<&RoomTemplate>;
}

pub trait EntityTemplateProvider: Send + Sync {
    fn entity_templates(&self, biome: Biome) -> Vec<&EntityTemplate>;
}

/// Поиск тира по идентификатору без учёта регистра с откатом на `common`
pub trait TierProvider: Send + Sync {
    fn tier(&self, id: &str) -> TierDefinition;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "rooms")]
    pub room_templates: Vec<RoomTemplate>,
    #[serde(default, rename = "entities")]
    pub entity_templates: Vec<EntityTemplate>,
    #[serde(default)]
    pub tiers: Vec<TierDefinition>,
}

impl Catalog {
    /// Встроенный каталог (данные из `data/catalog.toml`)
    pub fn builtin() -> GenerationResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> GenerationResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> GenerationResult<Self> {
        let mut catalog: Self = toml::from_str(contents)?;
        catalog.normalize();
        catalog.validate()?;
        Ok(catalog)
    }

    /// Приводит теги к нижнему регистру: все сравнения тегов дальше регистрозависимы
    fn normalize(&mut self) {
        for template in &mut self.room_templates {
            template.tags = template.tags.iter().map(|t| t.to_lowercase()).collect();
        }
        for entity in &mut self.entity_templates {
            for tag in &mut entity.required_tags {
                *tag = tag.to_lowercase();
            }
        }
    }

    fn validate(&self) -> GenerationResult<()> {
        for t in &self.room_templates {
            if t.weight == 0 {
                return Err(GenerationError::validation(format!(
                    "шаблон комнаты {} имеет нулевой вес",
                    t.id
                )));
            }
            if t.max_depth.is_some_and(|max| max < t.min_depth) {
                return Err(GenerationError::validation(format!(
                    "шаблон комнаты {}: max_depth меньше min_depth",
                    t.id
                )));
            }
            if let Some(f) = t
                .features
                .iter()
                .find(|f| !(0.0..=1.0).contains(&f.spawn_chance))
            {
                return Err(GenerationError::validation(format!(
                    "шаблон комнаты {}: вероятность детали {} вне [0, 1]",
                    t.id, f.id
                )));
            }
            if t.min_exits > t.max_exits {
                return Err(GenerationError::validation(format!(
                    "шаблон комнаты {}: min_exits больше max_exits",
                    t.id
                )));
            }
        }
        for e in &self.entity_templates {
            if e.threat_cost == 0 {
                return Err(GenerationError::validation(format!(
                    "шаблон существа {} имеет нулевую стоимость угрозы",
                    e.id
                )));
            }
        }
        Ok(())
    }
}

impl RoomTemplateProvider for Catalog {
    fn room_templates(&self, biome: Biome, depth: u32, filter: &TagFilter) -> Vec<&RoomTemplate> {
        self.room_templates
            .iter()
            .filter(|t| t.allows_biome(biome) && t.allows_depth(depth) && filter.accepts(&t.tags))
            .collect()
    }
}

impl EntityTemplateProvider for Catalog {
    fn entity_templates(&self, biome: Biome) -> Vec<&EntityTemplate> {
        self.entity_templates
            .iter()
            .filter(|e| e.biomes.contains(&biome))
            .collect()
    }
}

impl TierProvider for Catalog {
    fn tier(&self, id: &str) -> TierDefinition {
        let find = |wanted: &str| {
            self.tiers
                .iter()
                .find(|t| t.id.eq_ignore_ascii_case(wanted))
                .cloned()
        };
        if let Some(tier) = find(id) {
            return tier;
        }
        tracing::warn!(tier = id, "неизвестный тир, используем common");
        find(COMMON_TIER).unwrap_or_else(TierDefinition::builtin_common)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FeatureKind;

    #[test]
    fn builtin_catalog_parses_and_covers_every_biome() {
        let catalog = Catalog::builtin().unwrap();
        let any = TagFilter::default();
        for biome in Biome::ALL {
            assert!(
                !catalog.room_templates(biome, 1, &any).is_empty(),
                "нет шаблонов комнат для {biome}"
            );
            assert!(
                !catalog.entity_templates(biome).is_empty(),
                "нет существ для {biome}"
            );
        }
    }

    #[test]
    fn builtin_tags_are_lowercase() {
        let catalog = Catalog::builtin().unwrap();
        for t in &catalog.room_templates {
            assert!(t.tags.iter().all(|tag| *tag == tag.to_lowercase()), "{}", t.id);
        }
    }

    #[test]
    fn tier_lookup_is_case_insensitive_with_common_fallback() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.tier("RARE").id, "rare");
        assert_eq!(catalog.tier("Elite").id, "elite");
        assert_eq!(catalog.tier("mythic").id, COMMON_TIER);
    }

    #[test]
    fn empty_catalog_falls_back_to_builtin_common() {
        let catalog = Catalog::default();
        let tier = catalog.tier("anything");
        assert_eq!(tier, TierDefinition::builtin_common());
    }

    #[test]
    fn tags_are_normalized_on_load() {
        let src = r#"
            [[rooms]]
            id = "hall"
            name = "Hall"
            description = "A hall."
            room_type = "Chamber"
            biomes = ["Citadel"]
            tags = ["Wet", "DARK"]

            [[entities]]
            id = "rat"
            name = "Rat"
            tier = "Common"
            threat_cost = 2
            biomes = ["Citadel"]
            required_tags = ["Wet"]
        "#;
        let catalog = Catalog::from_toml_str(src).unwrap();
        let tags: Vec<&str> = catalog.room_templates[0].tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["dark", "wet"]);
        assert_eq!(catalog.entity_templates[0].required_tags, vec!["wet"]);
    }

    #[test]
    fn zero_weight_template_is_rejected() {
        let src = r#"
            [[rooms]]
            id = "hall"
            name = "Hall"
            description = "A hall."
            room_type = "Chamber"
            biomes = ["Citadel"]
            weight = 0
        "#;
        assert!(matches!(
            Catalog::from_toml_str(src),
            Err(GenerationError::Validation(_))
        ));
    }

    #[test]
    fn builtin_features_are_loaded() {
        let catalog = Catalog::builtin().unwrap();
        let library = catalog
            .room_templates
            .iter()
            .find(|t| t.id == "citadel_chamber_02")
            .unwrap();
        let ids: Vec<&str> = library.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["bookshelf", "reading_lamp"]);
        assert_eq!(library.features[1].kind, FeatureKind::LightSource);
        assert!((library.features[1].spawn_chance - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn feature_chance_out_of_range_is_rejected() {
        let src = r#"
            [[rooms]]
            id = "hall"
            name = "Hall"
            description = "A hall."
            room_type = "Chamber"
            biomes = ["Citadel"]

            [[rooms.features]]
            kind = "Hazard"
            id = "pit"
            spawn_chance = 1.5
        "#;
        assert!(matches!(
            Catalog::from_toml_str(src),
            Err(GenerationError::Validation(_))
        ));
    }

    #[test]
    fn room_lookup_respects_depth_and_tag_filter() {
        let catalog = Catalog::builtin().unwrap();
        let no_wet = TagFilter {
            required: vec![],
            excluded: vec!["wet".into()],
        };
        let found = catalog.room_templates(Biome::Citadel, 1, &no_wet);
        assert!(found.iter().all(|t| !t.tags.contains("wet")));
        assert!(found.iter().all(|t| t.allows_depth(1)));
    }
}
